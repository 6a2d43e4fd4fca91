//! # Repository Module
//!
//! Database repository implementations for Bodega.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.sales().complete(&sale_id, &payment, Some(cashier))        │
//! │       ▼                                                                 │
//! │  SaleRepository (owns the transaction)                                 │
//! │       │  BEGIN                                                          │
//! │       │  claim sale row ──► stock::balance_on ──► stock::append        │
//! │       │                 ──► invoice::ensure_invoice                    │
//! │       │                 ──► receivable::open_receivable                │
//! │       │  COMMIT (or drop = ROLLBACK on any error)                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Repositories expose pool-level methods that each run one              │
//! │  transaction. The `pub(crate)` connection helpers take                 │
//! │  `&mut SqliteConnection` so other repositories can compose them        │
//! │  inside their own transaction.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Suppliers, categories, customers, products
//! - [`StockRepository`](stock::StockRepository) - Movements, balances, adjustments
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchase lifecycle
//! - [`SaleRepository`](sale::SaleRepository) - Sale lifecycle and POS checkout
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoice materialization
//! - [`ReceivableRepository`](receivable::ReceivableRepository) - Credit and payments

pub mod catalog;
pub mod invoice;
pub mod purchase;
pub mod receivable;
pub mod sale;
pub mod stock;

#[cfg(test)]
pub(crate) mod test_support {
    use bodega_core::catalog::{NewCustomer, NewProduct};
    use bodega_core::ledger::NewMovement;
    use bodega_core::{Customer, Money, MovementKind, Product};

    use crate::pool::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn product(db: &Database, name: &str, price_cents: i64, tax_bps: u32) -> Product {
        let mut input = NewProduct::new(name, price_cents);
        input.tax_rate_bps = tax_bps;
        db.catalog().create_product(&input).await.unwrap()
    }

    /// Product with `on_hand` units received through a plain ENTRADA.
    pub async fn stocked_product(db: &Database, name: &str, price_cents: i64, on_hand: i64) -> Product {
        let product = product(db, name, price_cents, 1500).await;
        if on_hand > 0 {
            let entry = NewMovement::new(
                &product.id,
                MovementKind::Inbound,
                on_hand,
                Money::zero(),
                "OPENING",
                "Inventario inicial",
            )
            .unwrap();
            db.stock().record_movement(&entry).await.unwrap();
        }
        product
    }

    pub async fn customer(db: &Database, name: &str) -> Customer {
        db.catalog()
            .create_customer(&NewCustomer::named(name))
            .await
            .unwrap()
    }
}
