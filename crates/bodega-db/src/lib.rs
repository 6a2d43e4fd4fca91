//! # bodega-db: Database Layer for Bodega
//!
//! This crate provides database access for the Bodega back office.
//! It uses SQLite for local storage with sqlx for async operations, and
//! owns every transaction boundary: a document transition either commits
//! as a whole or leaves no trace.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Data Flow                                 │
//! │                                                                         │
//! │  POS checkout / back-office action                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    bodega-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ Catalog       │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Stock         │    │ 001_initial_ │  │   │
//! │  │   │ LedgerSettings│    │ Purchase/Sale │    │ schema.sql   │  │   │
//! │  │   │               │    │ Invoice / AR  │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ rules                         │   │
//! │  │                                ▼                               │   │
//! │  │                          bodega-core                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (bodega.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - Environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`api`] - Serializable error and reply envelope for the transport edge
//! - [`repository`] - Repository implementations (catalog, stock, documents)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bodega_db::{AppConfig, Database};
//!
//! let config = AppConfig::from_env()?;
//! let db = Database::new(config.to_db_config()).await?;
//!
//! let sale = db.sales().create_draft(Some("cashier-1"), SaleChannel::Pos, None).await?;
//! db.sales().add_line(&sale.id, &product_id, 2, 0).await?;
//! let receipt = db.sales().complete(&sale.id, &PaymentInput::cash(amount), Some("cashier-1")).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{ApiError, ErrorCode, Reply};
pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::CatalogRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::purchase::{PurchaseConfirmation, PurchaseRepository};
pub use repository::receivable::ReceivableRepository;
pub use repository::sale::SaleRepository;
pub use repository::stock::StockRepository;
