//! # Purchase Repository
//!
//! Purchases from suppliers: draft editing, confirmation into stock and void.
//!
//! ## Purchase Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Purchase Lifecycle                                  │
//! │                                                                         │
//! │  1. DRAFT (BORRADOR)                                                   │
//! │     └── create_draft() → tax rate from LedgerSettings if not given     │
//! │     └── add_line() / update_line() / remove_line()                     │
//! │         every edit recomputes and returns the header totals            │
//! │                                                                         │
//! │  2. CONFIRM (CONFIRMADA), idempotent                                   │
//! │     └── per line: ENTRADA "PURCHASE:{id}:{lineId}" unless present      │
//! │     └── invoice "FC-{id}" unless present                               │
//! │                                                                         │
//! │  3. VOID (ANULADA), one-way                                            │
//! │     └── from BORRADOR: status only                                     │
//! │     └── from CONFIRMADA: SALIDA "PURCHASE-VOID:{id}:{lineId}" per      │
//! │         line, invoice voided                                           │
//! │     └── again: VoidOutcome::AlreadyVoided                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::invoice::{invoice_from_purchase, purchase_invoice_number};
use bodega_core::ledger::{
    ensure_available, purchase_entry_reference, purchase_void_reference, NewMovement,
};
use bodega_core::lifecycle::{
    check_purchase_confirm, ensure_purchase_editable, plan_purchase_void, PurchaseVoidPlan,
};
use bodega_core::totals::purchase_totals;
use bodega_core::validation::{validate_non_negative_cents, validate_quantity, validate_rate_bps};
use bodega_core::{
    new_id, DocumentTotals, Invoice, LedgerSettings, Money, MovementKind, Purchase, PurchaseLine,
    PurchaseStatus, TaxRate, VoidOutcome,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::fetch_product;
use crate::repository::invoice::{ensure_invoice, void_invoice};
use crate::repository::stock::{append_movement, balance_on, movement_exists};

const PURCHASE_SELECT: &str = r#"
    SELECT id, supplier_id, purchase_date, status, tax_rate_bps,
           subtotal_cents, tax_cents, total_cents, created_by, created_at, updated_at
    FROM purchases
"#;

/// What a confirmation produced.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseConfirmation {
    pub purchase: Purchase,
    pub invoice: Invoice,
    /// Stock entries created by this call (0 on a repeated confirm).
    pub entries_created: usize,
}

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_purchase(conn: &mut SqliteConnection, id: &str) -> DbResult<Purchase> {
    let sql = format!("{} WHERE id = ?", PURCHASE_SELECT);
    sqlx::query_as::<_, Purchase>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Purchase", id))
}

pub(crate) async fn purchase_lines(
    conn: &mut SqliteConnection,
    purchase_id: &str,
) -> DbResult<Vec<PurchaseLine>> {
    let lines = sqlx::query_as::<_, PurchaseLine>(
        r#"
        SELECT id, purchase_id, product_id, quantity, unit_cost_cents
        FROM purchase_lines
        WHERE purchase_id = ?
        ORDER BY created_at, rowid
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(lines)
}

/// Re-sums the purchase from all of its lines and stores the header totals.
pub(crate) async fn recalc_totals(
    conn: &mut SqliteConnection,
    purchase_id: &str,
) -> DbResult<DocumentTotals> {
    let purchase = fetch_purchase(conn, purchase_id).await?;
    let lines = purchase_lines(conn, purchase_id).await?;
    let totals = purchase_totals(&lines, purchase.tax_rate())?;

    sqlx::query(
        r#"
        UPDATE purchases
        SET subtotal_cents = ?, tax_cents = ?, total_cents = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(totals.subtotal_cents)
    .bind(totals.tax_cents)
    .bind(totals.total_cents)
    .bind(Utc::now())
    .bind(purchase_id)
    .execute(&mut *conn)
    .await?;

    debug!(purchase_id = %purchase_id, total_cents = totals.total_cents, "Purchase totals recomputed");
    Ok(totals)
}

/// Takes the write lock on the purchase row, then reads it.
async fn claim_purchase(conn: &mut SqliteConnection, id: &str) -> DbResult<Purchase> {
    let claimed = sqlx::query("UPDATE purchases SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    if claimed.rows_affected() == 0 {
        return Err(DbError::not_found("Purchase", id));
    }
    fetch_purchase(conn, id).await
}

/// Claims the purchase that owns `line_id` and returns it.
async fn claim_purchase_of_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<Purchase> {
    let purchase_id: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE purchases SET updated_at = ?
        WHERE id = (SELECT purchase_id FROM purchase_lines WHERE id = ?)
        RETURNING id
        "#,
    )
    .bind(Utc::now())
    .bind(line_id)
    .fetch_optional(&mut *conn)
    .await?;

    let purchase_id = purchase_id.ok_or_else(|| DbError::not_found("PurchaseLine", line_id))?;
    fetch_purchase(conn, &purchase_id).await
}

async fn set_status(conn: &mut SqliteConnection, id: &str, status: PurchaseStatus) -> DbResult<()> {
    sqlx::query("UPDATE purchases SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for purchases and their lines.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        PurchaseRepository { pool, settings }
    }

    /// Starts an empty draft dated today.
    pub async fn create_draft(
        &self,
        supplier_id: Option<&str>,
        tax_rate: Option<TaxRate>,
        created_by: Option<&str>,
    ) -> DbResult<Purchase> {
        let rate = tax_rate.unwrap_or(self.settings.purchase_tax_rate);
        validate_rate_bps("tax_rate", rate.bps())?;

        let now = Utc::now();
        let purchase = Purchase {
            id: new_id(),
            supplier_id: supplier_id.map(str::to_string),
            purchase_date: now.date_naive(),
            status: PurchaseStatus::Draft,
            tax_rate_bps: rate.bps(),
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            created_by: created_by.map(str::to_string),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, supplier_id, purchase_date, status, tax_rate_bps,
                subtotal_cents, tax_cents, total_cents, created_by, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
            "#,
        )
        .bind(&purchase.id)
        .bind(&purchase.supplier_id)
        .bind(purchase.purchase_date)
        .bind(purchase.status)
        .bind(purchase.tax_rate_bps)
        .bind(&purchase.created_by)
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Supplier", supplier_id.unwrap_or_default())
            }
            other => other,
        })?;

        info!(purchase_id = %purchase.id, tax_rate_bps = purchase.tax_rate_bps, "Purchase draft created");
        Ok(purchase)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Purchase>> {
        let mut conn = self.pool.acquire().await?;
        match fetch_purchase(&mut conn, id).await {
            Ok(purchase) => Ok(Some(purchase)),
            Err(DbError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn lines(&self, purchase_id: &str) -> DbResult<Vec<PurchaseLine>> {
        let mut conn = self.pool.acquire().await?;
        purchase_lines(&mut conn, purchase_id).await
    }

    /// Purchases, newest first, optionally in one status.
    pub async fn list(&self, status: Option<PurchaseStatus>) -> DbResult<Vec<Purchase>> {
        let sql = format!(
            "{} WHERE (? IS NULL OR status = ?) ORDER BY created_at DESC, rowid DESC",
            PURCHASE_SELECT
        );
        let purchases = sqlx::query_as::<_, Purchase>(&sql)
            .bind(status)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(purchases)
    }

    /// Adds a product to a draft. A product already on the purchase has its
    /// quantity increased instead; a given cost replaces the line's cost.
    /// Without a cost the product's average cost is used.
    pub async fn add_line(
        &self,
        purchase_id: &str,
        product_id: &str,
        quantity: i64,
        unit_cost: Option<Money>,
    ) -> DbResult<DocumentTotals> {
        validate_quantity(quantity)?;
        if let Some(cost) = unit_cost {
            validate_non_negative_cents("unit_cost", cost.cents())?;
        }

        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase(&mut tx, purchase_id).await?;
        ensure_purchase_editable(&purchase)?;
        let product = fetch_product(&mut tx, product_id).await?;

        let existing: Option<(String, i64)> = sqlx::query_as(
            "SELECT id, quantity FROM purchase_lines WHERE purchase_id = ? AND product_id = ?",
        )
        .bind(purchase_id)
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?;

        match existing {
            Some((line_id, current)) => {
                validate_quantity(current + quantity)?;
                sqlx::query(
                    r#"
                    UPDATE purchase_lines
                    SET quantity = quantity + ?, unit_cost_cents = COALESCE(?, unit_cost_cents)
                    WHERE id = ?
                    "#,
                )
                .bind(quantity)
                .bind(unit_cost.map(|c| c.cents()))
                .bind(&line_id)
                .execute(&mut *tx)
                .await?;
                debug!(purchase_id = %purchase_id, line_id = %line_id, quantity, "Purchase line merged");
            }
            None => {
                let cost = unit_cost.unwrap_or_else(|| product.average_cost());
                sqlx::query(
                    r#"
                    INSERT INTO purchase_lines (id, purchase_id, product_id, quantity, unit_cost_cents, created_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(new_id())
                .bind(purchase_id)
                .bind(product_id)
                .bind(quantity)
                .bind(cost.cents())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;
                debug!(purchase_id = %purchase_id, product_id = %product_id, quantity, "Purchase line added");
            }
        }

        let totals = recalc_totals(&mut tx, purchase_id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub async fn update_line(&self, line_id: &str, quantity: i64) -> DbResult<DocumentTotals> {
        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase_of_line(&mut tx, line_id).await?;
        ensure_purchase_editable(&purchase)?;

        if quantity <= 0 {
            sqlx::query("DELETE FROM purchase_lines WHERE id = ?")
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
            debug!(line_id = %line_id, "Purchase line removed by zero quantity");
        } else {
            validate_quantity(quantity)?;
            sqlx::query("UPDATE purchase_lines SET quantity = ? WHERE id = ?")
                .bind(quantity)
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
        }

        let totals = recalc_totals(&mut tx, &purchase.id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    pub async fn remove_line(&self, line_id: &str) -> DbResult<DocumentTotals> {
        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase_of_line(&mut tx, line_id).await?;
        ensure_purchase_editable(&purchase)?;

        sqlx::query("DELETE FROM purchase_lines WHERE id = ?")
            .bind(line_id)
            .execute(&mut *tx)
            .await?;

        let totals = recalc_totals(&mut tx, &purchase.id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Header save: supplier and tax rate of a draft.
    pub async fn update_header(
        &self,
        purchase_id: &str,
        supplier_id: Option<&str>,
        tax_rate: TaxRate,
    ) -> DbResult<DocumentTotals> {
        validate_rate_bps("tax_rate", tax_rate.bps())?;

        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase(&mut tx, purchase_id).await?;
        ensure_purchase_editable(&purchase)?;

        sqlx::query("UPDATE purchases SET supplier_id = ?, tax_rate_bps = ? WHERE id = ?")
            .bind(supplier_id)
            .bind(tax_rate.bps())
            .bind(purchase_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::not_found("Supplier", supplier_id.unwrap_or_default())
                }
                other => other,
            })?;

        let totals = recalc_totals(&mut tx, purchase_id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Confirms a purchase into stock. Safe to call again: only missing
    /// entries and a missing invoice are created.
    pub async fn confirm(&self, purchase_id: &str) -> DbResult<PurchaseConfirmation> {
        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase(&mut tx, purchase_id).await?;
        let lines = purchase_lines(&mut tx, purchase_id).await?;

        let first_confirm = match check_purchase_confirm(&purchase, lines.len()) {
            Ok(first) => first,
            Err(err) => {
                warn!(purchase_id = %purchase_id, status = %purchase.status, error = %err, "Purchase confirm rejected");
                return Err(err.into());
            }
        };

        if first_confirm {
            recalc_totals(&mut tx, purchase_id).await?;
            set_status(&mut tx, purchase_id, PurchaseStatus::Confirmed).await?;
        }

        let mut entries_created = 0;
        for line in &lines {
            let reference = purchase_entry_reference(purchase_id, &line.id);
            if movement_exists(&mut tx, &reference).await? {
                continue;
            }

            let entry = NewMovement::new(
                &line.product_id,
                MovementKind::Inbound,
                line.quantity,
                line.unit_cost(),
                reference,
                "Compra confirmada",
            )?
            .by(purchase.created_by.as_deref());
            append_movement(&mut tx, &entry).await?;
            entries_created += 1;
        }

        let purchase = fetch_purchase(&mut tx, purchase_id).await?;
        let (header, invoice_lines) = invoice_from_purchase(&purchase, &lines)?;
        let (invoice, _) = ensure_invoice(&mut tx, &header, &invoice_lines).await?;

        tx.commit().await?;

        info!(
            purchase_id = %purchase_id,
            entries_created,
            invoice = %invoice.number,
            total_cents = purchase.total_cents,
            "Purchase confirmed"
        );

        Ok(PurchaseConfirmation {
            purchase,
            invoice,
            entries_created,
        })
    }

    /// Voids a purchase. A confirmed one has its stock entries reversed and
    /// its invoice voided; that fails if the goods are no longer on hand.
    pub async fn void(&self, purchase_id: &str, user_id: Option<&str>) -> DbResult<VoidOutcome> {
        let mut tx = self.pool.begin().await?;

        let purchase = claim_purchase(&mut tx, purchase_id).await?;

        match plan_purchase_void(purchase.status) {
            PurchaseVoidPlan::AlreadyVoided => {
                warn!(purchase_id = %purchase_id, "Purchase already voided");
                return Ok(VoidOutcome::AlreadyVoided);
            }
            PurchaseVoidPlan::StatusOnly => {}
            PurchaseVoidPlan::Reverse => {
                for line in purchase_lines(&mut tx, purchase_id).await? {
                    let entry_ref = purchase_entry_reference(purchase_id, &line.id);
                    let void_ref = purchase_void_reference(purchase_id, &line.id);
                    if !movement_exists(&mut tx, &entry_ref).await?
                        || movement_exists(&mut tx, &void_ref).await?
                    {
                        continue;
                    }

                    let product = fetch_product(&mut tx, &line.product_id).await?;
                    let on_hand = balance_on(&mut tx, &line.product_id).await?;
                    if let Err(err) = ensure_available(&product.name, on_hand, line.quantity) {
                        warn!(purchase_id = %purchase_id, product_id = %product.id, on_hand, error = %err, "Purchase void rejected");
                        return Err(err.into());
                    }

                    let exit = NewMovement::new(
                        &line.product_id,
                        MovementKind::Outbound,
                        line.quantity,
                        line.unit_cost(),
                        void_ref,
                        "Compra anulada",
                    )?
                    .by(user_id);
                    append_movement(&mut tx, &exit).await?;
                }

                void_invoice(&mut tx, &purchase_invoice_number(purchase_id)).await?;
            }
        }

        set_status(&mut tx, purchase_id, PurchaseStatus::Voided).await?;
        tx.commit().await?;

        info!(purchase_id = %purchase_id, from = %purchase.status, "Purchase voided");
        Ok(VoidOutcome::Voided)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
