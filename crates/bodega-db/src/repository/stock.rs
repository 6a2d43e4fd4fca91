//! # Stock Repository
//!
//! Append-only stock ledger and the cached balance derived from it.
//!
//! ## Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stock_balances.quantity == Σ signed(stock_movements.quantity)          │
//! │                                                                         │
//! │  append_movement ──► INSERT movement ──► recompute_balance             │
//! │  delete_movement ──► DELETE movement ──► recompute_balance             │
//! │                                                                         │
//! │  recompute_balance never increments: it re-sums every movement of the  │
//! │  product and upserts the row, so a missed update heals on the next     │
//! │  write. ENTRADA / AJUSTE_POS add, SALIDA / AJUSTE_NEG subtract.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The connection helpers run inside whatever transaction the caller holds;
//! purchase confirmation and sale completion append their movements through
//! them.

use bodega_core::ledger::{plan_adjustment, AdjustmentKind, NewMovement};
use bodega_core::{new_id, BalanceDrift, StockLevel, StockMovement, ValidationError};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::fetch_product;

const MOVEMENT_SELECT: &str = r#"
    SELECT id, product_id, kind, quantity, unit_cost_cents, reference, reason, user_id, created_at
    FROM stock_movements
"#;

const STOCK_LEVEL_SELECT: &str = r#"
    SELECT p.id AS product_id, p.name, p.barcode,
           COALESCE(b.quantity, 0) AS quantity, p.min_stock
    FROM products p
    LEFT JOIN stock_balances b ON b.product_id = p.id
    WHERE p.is_active = 1
"#;

// =============================================================================
// Connection Helpers
// =============================================================================

/// Inserts a movement and recomputes the product's balance.
pub(crate) async fn append_movement(
    conn: &mut SqliteConnection,
    movement: &NewMovement,
) -> DbResult<StockMovement> {
    if movement.quantity < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "quantity".to_string(),
        }
        .into());
    }

    let row = StockMovement {
        id: new_id(),
        product_id: movement.product_id.clone(),
        kind: movement.kind,
        quantity: movement.quantity,
        unit_cost_cents: movement.unit_cost.cents(),
        reference: movement.reference.clone(),
        reason: movement.reason.clone(),
        user_id: movement.user_id.clone(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, product_id, kind, quantity, unit_cost_cents,
            reference, reason, user_id, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.id)
    .bind(&row.product_id)
    .bind(row.kind)
    .bind(row.quantity)
    .bind(row.unit_cost_cents)
    .bind(&row.reference)
    .bind(&row.reason)
    .bind(&row.user_id)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    let balance = recompute_balance(conn, &row.product_id).await?;

    debug!(
        product_id = %row.product_id,
        kind = %row.kind,
        quantity = row.quantity,
        reference = %row.reference,
        balance,
        "Movement recorded"
    );

    Ok(row)
}

/// Re-sums every movement of the product and upserts its balance row.
pub(crate) async fn recompute_balance(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let quantity: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(CASE WHEN kind IN ('ENTRADA', 'AJUSTE_POS')
                                 THEN quantity ELSE -quantity END), 0)
        FROM stock_movements
        WHERE product_id = ?
        "#,
    )
    .bind(product_id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO stock_balances (product_id, quantity, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(product_id) DO UPDATE SET
            quantity = excluded.quantity,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(product_id)
    .bind(quantity)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(quantity)
}

/// Current balance; creates the row from the ledger when missing.
pub(crate) async fn balance_on(conn: &mut SqliteConnection, product_id: &str) -> DbResult<i64> {
    let cached: Option<i64> =
        sqlx::query_scalar("SELECT quantity FROM stock_balances WHERE product_id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;

    match cached {
        Some(quantity) => Ok(quantity),
        None => recompute_balance(conn, product_id).await,
    }
}

/// Whether any movement carries `reference`.
pub(crate) async fn movement_exists(conn: &mut SqliteConnection, reference: &str) -> DbResult<bool> {
    let found: Option<String> =
        sqlx::query_scalar("SELECT id FROM stock_movements WHERE reference = ? LIMIT 1")
            .bind(reference)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(found.is_some())
}

/// Takes the write lock on the product's balance row.
async fn claim_balance(conn: &mut SqliteConnection, product_id: &str) -> DbResult<()> {
    sqlx::query("UPDATE stock_balances SET updated_at = ? WHERE product_id = ?")
        .bind(Utc::now())
        .bind(product_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Appends a movement and recomputes the balance, in one transaction.
    pub async fn record_movement(&self, movement: &NewMovement) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        claim_balance(&mut tx, &movement.product_id).await?;
        fetch_product(&mut tx, &movement.product_id).await?;
        let row = append_movement(&mut tx, movement).await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Deletes a movement and recomputes the balance. Returns the new balance.
    pub async fn delete_movement(&self, movement_id: &str) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        let product_id: Option<String> =
            sqlx::query_scalar("DELETE FROM stock_movements WHERE id = ? RETURNING product_id")
                .bind(movement_id)
                .fetch_optional(&mut *tx)
                .await?;
        let product_id = product_id.ok_or_else(|| DbError::not_found("StockMovement", movement_id))?;

        let balance = recompute_balance(&mut tx, &product_id).await?;
        tx.commit().await?;

        info!(movement_id = %movement_id, product_id = %product_id, balance, "Movement deleted");
        Ok(balance)
    }

    /// Recomputes one product's balance from its movements.
    pub async fn recompute_balance(&self, product_id: &str) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;

        claim_balance(&mut tx, product_id).await?;
        fetch_product(&mut tx, product_id).await?;
        let balance = recompute_balance(&mut tx, product_id).await?;

        tx.commit().await?;
        Ok(balance)
    }

    /// Recomputes every product and reports the rows that had drifted.
    pub async fn reconcile_all(&self) -> DbResult<Vec<BalanceDrift>> {
        let mut tx = self.pool.begin().await?;

        // Lock first, then read the cached values.
        sqlx::query("UPDATE stock_balances SET updated_at = updated_at")
            .execute(&mut *tx)
            .await?;

        let cached: Vec<(String, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT p.id, b.quantity
            FROM products p
            LEFT JOIN stock_balances b ON b.product_id = p.id
            ORDER BY p.id
            "#,
        )
        .fetch_all(&mut *tx)
        .await?;

        let mut drifted = Vec::new();
        for (product_id, before) in cached {
            let recomputed = recompute_balance(&mut tx, &product_id).await?;
            if before != Some(recomputed) {
                drifted.push(BalanceDrift {
                    product_id,
                    cached: before.unwrap_or(0),
                    recomputed,
                });
            }
        }

        tx.commit().await?;

        if drifted.is_empty() {
            info!("Stock balances reconciled, no drift");
        } else {
            warn!(count = drifted.len(), "Stock balances had drifted and were rebuilt");
        }
        Ok(drifted)
    }

    /// Manual correction. Negative adjustments may not exceed the balance.
    pub async fn adjust(
        &self,
        product_id: &str,
        kind: AdjustmentKind,
        quantity: i64,
        reason: &str,
        user_id: Option<&str>,
    ) -> DbResult<StockMovement> {
        let mut tx = self.pool.begin().await?;

        claim_balance(&mut tx, product_id).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        let on_hand = balance_on(&mut tx, product_id).await?;

        let movement = match plan_adjustment(product_id, &product.name, kind, quantity, reason, on_hand) {
            Ok(movement) => movement.by(user_id),
            Err(err) => {
                warn!(product_id = %product_id, on_hand, quantity, error = %err, "Adjustment rejected");
                return Err(err.into());
            }
        };

        let row = append_movement(&mut tx, &movement).await?;
        tx.commit().await?;

        info!(product_id = %product_id, kind = %row.kind, quantity, "Stock adjusted");
        Ok(row)
    }

    /// Current balance of a product.
    pub async fn balance(&self, product_id: &str) -> DbResult<i64> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, product_id).await?;
        balance_on(&mut conn, product_id).await
    }

    /// Movements of a product, newest first.
    pub async fn movements(&self, product_id: &str, limit: u32) -> DbResult<Vec<StockMovement>> {
        let sql = format!(
            "{} WHERE product_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
            MOVEMENT_SELECT
        );
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements carrying a document reference, oldest first.
    pub async fn movements_by_reference(&self, reference: &str) -> DbResult<Vec<StockMovement>> {
        let sql = format!("{} WHERE reference = ? ORDER BY rowid", MOVEMENT_SELECT);
        let movements = sqlx::query_as::<_, StockMovement>(&sql)
            .bind(reference)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Active products with balance and reorder point, by name.
    pub async fn stock_report(&self) -> DbResult<Vec<StockLevel>> {
        let sql = format!("{} ORDER BY p.name", STOCK_LEVEL_SELECT);
        let levels = sqlx::query_as::<_, StockLevel>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(levels)
    }

    /// Active products whose balance is below their minimum.
    pub async fn low_stock(&self) -> DbResult<Vec<StockLevel>> {
        let sql = format!(
            "{} AND COALESCE(b.quantity, 0) < p.min_stock ORDER BY p.name",
            STOCK_LEVEL_SELECT
        );
        let levels = sqlx::query_as::<_, StockLevel>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(levels)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{product, test_db};
    use bodega_core::catalog::ProductUpdate;
    use bodega_core::ledger::balance_of;
    use bodega_core::{CoreError, Money, MovementKind};

    fn movement(product_id: &str, kind: MovementKind, quantity: i64) -> NewMovement {
        NewMovement::new(product_id, kind, quantity, Money::zero(), "TEST", "prueba").unwrap()
    }

    #[tokio::test]
    async fn test_balance_follows_signed_movements() {
        let db = test_db().await;
        let p = product(&db, "Arroz", 2500, 1500).await;

        for (kind, qty) in [
            (MovementKind::Inbound, 10),
            (MovementKind::Outbound, 3),
            (MovementKind::AdjustUp, 2),
            (MovementKind::AdjustDown, 1),
        ] {
            db.stock().record_movement(&movement(&p.id, kind, qty)).await.unwrap();
        }

        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 8);

        let history = db.stock().movements(&p.id, 50).await.unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(balance_of(&history), 8);
        assert!(history.iter().all(|m| m.quantity >= 0));
        assert_eq!(history[0].kind, MovementKind::AdjustDown);
    }

    #[tokio::test]
    async fn test_negative_quantity_never_stored() {
        let db = test_db().await;
        let p = product(&db, "Arroz", 2500, 1500).await;

        let mut bad = movement(&p.id, MovementKind::Outbound, 1);
        bad.quantity = -5;
        let err = db.stock().record_movement(&bad).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert!(db.stock().movements(&p.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = test_db().await;
        let err = db
            .stock()
            .record_movement(&movement("nope", MovementKind::Inbound, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_movement_recomputes() {
        let db = test_db().await;
        let p = product(&db, "Frijol", 3000, 1500).await;

        db.stock().record_movement(&movement(&p.id, MovementKind::Inbound, 10)).await.unwrap();
        let exit = db
            .stock()
            .record_movement(&movement(&p.id, MovementKind::Outbound, 4))
            .await
            .unwrap();
        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 6);

        assert_eq!(db.stock().delete_movement(&exit.id).await.unwrap(), 10);
        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 10);

        let err = db.stock().delete_movement(&exit.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_negative_adjustment_limited_by_balance() {
        let db = test_db().await;
        let p = product(&db, "Aceite", 9000, 1500).await;
        db.stock().record_movement(&movement(&p.id, MovementKind::Inbound, 3)).await.unwrap();

        let err = db
            .stock()
            .adjust(&p.id, AdjustmentKind::Negative, 5, "Merma", Some("admin"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { available: 3, requested: 5, .. })
        ));

        let err = db
            .stock()
            .adjust(&p.id, AdjustmentKind::Positive, 5, "   ", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let row = db
            .stock()
            .adjust(&p.id, AdjustmentKind::Negative, 2, "Producto dañado", Some("admin"))
            .await
            .unwrap();
        assert_eq!(row.kind, MovementKind::AdjustDown);
        assert_eq!(row.reference, "ADJUST");
        assert_eq!(row.user_id.as_deref(), Some("admin"));
        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_reconcile_rebuilds_drifted_rows() {
        let db = test_db().await;
        let p = product(&db, "Leche", 3200, 0).await;
        db.stock().record_movement(&movement(&p.id, MovementKind::Inbound, 7)).await.unwrap();

        assert!(db.stock().reconcile_all().await.unwrap().is_empty());

        sqlx::query("UPDATE stock_balances SET quantity = 99 WHERE product_id = ?")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        let drift = db.stock().reconcile_all().await.unwrap();
        assert_eq!(
            drift,
            vec![BalanceDrift {
                product_id: p.id.clone(),
                cached: 99,
                recomputed: 7,
            }]
        );
        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_missing_balance_row_is_created() {
        let db = test_db().await;
        let p = product(&db, "Sal", 800, 0).await;
        db.stock().record_movement(&movement(&p.id, MovementKind::Inbound, 4)).await.unwrap();

        sqlx::query("DELETE FROM stock_balances WHERE product_id = ?")
            .bind(&p.id)
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(db.stock().balance(&p.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_stock_report_and_low_stock() {
        let db = test_db().await;
        let low = product(&db, "Azúcar", 2000, 1500).await;
        let ok = product(&db, "Café", 8000, 1500).await;
        for (p, min, on_hand) in [(&low, 5, 2), (&ok, 5, 12)] {
            let changes = ProductUpdate {
                min_stock: Some(min),
                ..Default::default()
            };
            db.catalog().update_product(&p.id, &changes).await.unwrap();
            db.stock()
                .record_movement(&movement(&p.id, MovementKind::Inbound, on_hand))
                .await
                .unwrap();
        }

        let report = db.stock().stock_report().await.unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report[0].name, "Azúcar");
        assert!(report[0].is_low());

        let low_stock = db.stock().low_stock().await.unwrap();
        assert_eq!(low_stock.len(), 1);
        assert_eq!(low_stock[0].product_id, low.id);
        assert_eq!(low_stock[0].quantity, 2);
    }
}
