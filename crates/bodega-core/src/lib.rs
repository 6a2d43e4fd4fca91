//! # bodega-core: Pure Business Rules for Bodega
//!
//! This crate is the **heart** of the Bodega back office. It contains the
//! rules that keep stock, documents, invoices and receivables consistent,
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bodega Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              POS widgets / back-office screens                  │   │
//! │  │    Cart ──► Checkout ──► Invoice view ──► Receivables           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON (dto, ApiError)                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                bodega-db (repositories)                         │   │
//! │  │    one SQLite transaction per document transition               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ calls                                  │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bodega-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │  money   │ │  ledger  │ │ lifecycle │ │  receivable  │     │   │
//! │  │   │  Money   │ │  signs   │ │  guards   │ │  payments    │     │   │
//! │  │   │  TaxRate │ │  refs    │ │  payment  │ │  aging       │     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘     │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐     │   │
//! │  │   │  totals  │ │ invoice  │ │permissions│ │  validation  │     │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records and status enums
//! - [`catalog`] - Validated create/update payloads for reference data
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`ledger`] - Stock movement signs, balances, reference tags
//! - [`totals`] - Purchase and sale totals
//! - [`lifecycle`] - Status guards and payment rules
//! - [`invoice`] - Invoice builders and number keys
//! - [`receivable`] - Payment application and aging
//! - [`permissions`] - Module access flags
//! - [`validation`] - Field validation
//! - [`dto`] - POS wire shapes
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bodega_core::money::Money;
//! use bodega_core::types::TaxRate;
//!
//! let subtotal = Money::from_cents(11000); // 110.00
//! let tax = subtotal.calculate_tax(TaxRate::from_bps(1500)).unwrap(); // 15%
//! assert_eq!(tax.cents(), 1650);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod dto;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod lifecycle;
pub mod money;
pub mod permissions;
pub mod receivable;
pub mod settings;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use bodega_core::Money` instead of
// `use bodega_core::money::Money`

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use lifecycle::{PaymentInput, VoidOutcome};
pub use money::Money;
pub use settings::LedgerSettings;
pub use totals::DocumentTotals;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Highest tax rate a product may carry (15%).
pub const MAX_PRODUCT_TAX_BPS: u32 = 1500;

/// Maximum units on a single purchase or sale line.
///
/// ## Business Reason
/// Catches typing 10000 instead of 100 at the counter, and keeps
/// `quantity × price` well inside the range of an i64.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum unit price or cost, in cents (10,000,000.00).
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000;

/// Generates a new entity id (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
