//! # Sale Repository
//!
//! Database operations for sales and sale lines.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE DRAFT                                                       │
//! │     └── create_draft() → Sale { status: BORRADOR, number: 000042 }     │
//! │                                                                         │
//! │  2. EDIT LINES                                                         │
//! │     └── add_line() / update_line() / remove_line()                     │
//! │     └── every edit re-sums the header and returns the totals           │
//! │                                                                         │
//! │  3. COMPLETE (one transaction)                                         │
//! │     └── claim row ──► payment rules ──► stock check per line           │
//! │     └── PAGADA ──► SALIDA "SALE-000042" per line                       │
//! │     └── invoice "FV-000042" ──► receivable (CREDITO only)              │
//! │                                                                         │
//! │  4a. CANCEL (draft only)  → CANCELADA, lines deleted, totals zeroed    │
//! │  4b. VOID   (paid only)   → ANULADA, ENTRADA "SALE-VOID-000042" per    │
//! │                              line, invoice voided, receivable closed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Claiming the Row
//! Every mutating call starts with
//! `UPDATE sales SET updated_at = ? WHERE id = ? AND status = ?`.
//! That first write takes SQLite's write lock, so the stock check and the
//! SALIDA inserts of one completion can never interleave with another.

use bodega_core::dto::{CheckoutRequest, SaleReceipt};
use bodega_core::invoice::{invoice_from_sale, sale_invoice_number};
use bodega_core::ledger::{ensure_available, sale_exit_reference, sale_void_reference, NewMovement};
use bodega_core::lifecycle::{ensure_sale_editable, ensure_sale_status, next_sale_number, settle_payment};
use bodega_core::receivable::due_date;
use bodega_core::totals::{sale_line_amounts, sale_totals};
use bodega_core::validation::{validate_quantity, validate_rate_bps};
use bodega_core::{
    new_id, CoreError, DocumentTotals, LedgerSettings, MovementKind, PaymentInput, PaymentMethod,
    Product, Sale, SaleChannel, SaleLine, SaleStatus,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::catalog::{customer_exists, fetch_product};
use crate::repository::invoice::{ensure_invoice, void_invoice};
use crate::repository::receivable::{open_receivable, write_off};
use crate::repository::stock::{append_movement, balance_on, movement_exists};

const SALE_SELECT: &str = r#"
    SELECT id, number, customer_id, cashier_id, created_by, channel, status, payment_method,
           subtotal_cents, tax_cents, discount_cents, total_cents,
           cash_received_cents, change_cents, payment_reference,
           created_at, updated_at, completed_at
    FROM sales
"#;

const SALE_LINE_SELECT: &str = r#"
    SELECT id, sale_id, product_id, quantity, unit_price_cents, discount_bps,
           subtotal_cents, tax_cents, total_cents
    FROM sale_lines
"#;

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Sale> {
    let sql = format!("{} WHERE id = ?", SALE_SELECT);
    sqlx::query_as::<_, Sale>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", id))
}

pub(crate) async fn sale_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
    let sql = format!("{} WHERE sale_id = ? ORDER BY created_at, rowid", SALE_LINE_SELECT);
    let lines = sqlx::query_as::<_, SaleLine>(&sql)
        .bind(sale_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lines)
}

/// Re-sums the sale from its stored lines.
async fn recalc_totals(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<DocumentTotals> {
    let lines = sale_lines(conn, sale_id).await?;
    let totals = sale_totals(&lines)?;

    sqlx::query(
        r#"
        UPDATE sales
        SET subtotal_cents = ?, tax_cents = ?, discount_cents = ?, total_cents = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(totals.subtotal_cents)
    .bind(totals.tax_cents)
    .bind(totals.discount_cents)
    .bind(totals.total_cents)
    .bind(Utc::now())
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    debug!(sale_id = %sale_id, total_cents = totals.total_cents, "Sale totals recomputed");
    Ok(totals)
}

/// Claims the sale row if it is in `expected` status.
async fn claim_sale(
    conn: &mut SqliteConnection,
    id: &str,
    expected: SaleStatus,
    operation: &str,
) -> DbResult<Sale> {
    let claimed = sqlx::query("UPDATE sales SET updated_at = ? WHERE id = ? AND status = ?")
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

    if claimed.rows_affected() == 0 {
        let sale = fetch_sale(conn, id).await?;
        ensure_sale_status(&sale, expected, operation)?;
    }
    fetch_sale(conn, id).await
}

/// Claims the draft sale that owns `line_id`.
async fn claim_draft_of_line(conn: &mut SqliteConnection, line_id: &str) -> DbResult<Sale> {
    let claimed: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE sales SET updated_at = ?
        WHERE id = (SELECT sale_id FROM sale_lines WHERE id = ?) AND status = ?
        RETURNING id
        "#,
    )
    .bind(Utc::now())
    .bind(line_id)
    .bind(SaleStatus::Draft)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(sale_id) = claimed {
        return fetch_sale(conn, &sale_id).await;
    }

    // Unknown line, or its sale has left BORRADOR.
    let sale_id: Option<String> =
        sqlx::query_scalar("SELECT sale_id FROM sale_lines WHERE id = ?")
            .bind(line_id)
            .fetch_optional(&mut *conn)
            .await?;
    let sale_id = sale_id.ok_or_else(|| DbError::not_found("SaleLine", line_id))?;
    let sale = fetch_sale(conn, &sale_id).await?;
    ensure_sale_editable(&sale)?;
    Err(DbError::Internal(format!("sale {} could not be claimed", sale_id)))
}

/// Adds `quantity` of `product` to the sale, merging into its existing line.
/// The existing line keeps its unit price; a given discount replaces it.
async fn upsert_line(
    conn: &mut SqliteConnection,
    sale_id: &str,
    product: &Product,
    quantity: i64,
    discount_bps: Option<u32>,
) -> DbResult<()> {
    validate_quantity(quantity)?;

    let sql = format!("{} WHERE sale_id = ? AND product_id = ?", SALE_LINE_SELECT);
    let existing = sqlx::query_as::<_, SaleLine>(&sql)
        .bind(sale_id)
        .bind(&product.id)
        .fetch_optional(&mut *conn)
        .await?;

    match existing {
        Some(line) => {
            let discount = discount_bps.unwrap_or(line.discount_bps);
            write_line_amounts(conn, &line, line.quantity + quantity, discount, product).await
        }
        None => {
            let discount = discount_bps.unwrap_or(0);
            validate_rate_bps("discount", discount)?;
            let amounts = sale_line_amounts(quantity, product.sale_price(), discount, product.tax_rate())?;

            sqlx::query(
                r#"
                INSERT INTO sale_lines (
                    id, sale_id, product_id, quantity, unit_price_cents, discount_bps,
                    subtotal_cents, tax_cents, total_cents, created_at
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(new_id())
            .bind(sale_id)
            .bind(&product.id)
            .bind(quantity)
            .bind(product.sale_price_cents)
            .bind(discount)
            .bind(amounts.subtotal.cents())
            .bind(amounts.tax.cents())
            .bind(amounts.total.cents())
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

            debug!(sale_id = %sale_id, product_id = %product.id, quantity, "Sale line added");
            Ok(())
        }
    }
}

/// Recomputes and stores one line at a new quantity and discount.
async fn write_line_amounts(
    conn: &mut SqliteConnection,
    line: &SaleLine,
    quantity: i64,
    discount_bps: u32,
    product: &Product,
) -> DbResult<()> {
    validate_quantity(quantity)?;
    validate_rate_bps("discount", discount_bps)?;
    let amounts = sale_line_amounts(quantity, line.unit_price(), discount_bps, product.tax_rate())?;

    sqlx::query(
        r#"
        UPDATE sale_lines
        SET quantity = ?, discount_bps = ?, subtotal_cents = ?, tax_cents = ?, total_cents = ?
        WHERE id = ?
        "#,
    )
    .bind(quantity)
    .bind(discount_bps)
    .bind(amounts.subtotal.cents())
    .bind(amounts.tax.cents())
    .bind(amounts.total.cents())
    .bind(&line.id)
    .execute(&mut *conn)
    .await?;

    debug!(line_id = %line.id, quantity, discount_bps, "Sale line updated");
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    settings: LedgerSettings,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool, settings: LedgerSettings) -> Self {
        SaleRepository { pool, settings }
    }

    /// Opens a draft with the next sale number.
    ///
    /// The draft is inserted under a temporary number and renumbered inside
    /// the same transaction, after the insert holds the write lock.
    pub async fn create_draft(
        &self,
        created_by: Option<&str>,
        channel: SaleChannel,
        customer_id: Option<&str>,
    ) -> DbResult<Sale> {
        let id = new_id();
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (id, number, customer_id, created_by, channel, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 'BORRADOR', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&id)
        .bind(customer_id)
        .bind(created_by)
        .bind(channel)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => {
                DbError::not_found("Customer", customer_id.unwrap_or_default())
            }
            other => other,
        })?;

        let last: Option<String> = sqlx::query_scalar(
            r#"
            SELECT number FROM sales
            WHERE id <> ? AND number NOT GLOB '*[^0-9]*'
            ORDER BY LENGTH(number) DESC, number DESC
            LIMIT 1
            "#,
        )
        .bind(&id)
        .fetch_optional(&mut *tx)
        .await?;
        let number = next_sale_number(last.as_deref());

        sqlx::query("UPDATE sales SET number = ? WHERE id = ?")
            .bind(&number)
            .bind(&id)
            .execute(&mut *tx)
            .await?;

        let sale = fetch_sale(&mut tx, &id).await?;
        tx.commit().await?;

        info!(sale_id = %sale.id, number = %sale.number, channel = %sale.channel, "Sale draft created");
        Ok(sale)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("{} WHERE id = ?", SALE_SELECT);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Sale>> {
        let sql = format!("{} WHERE number = ?", SALE_SELECT);
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    pub async fn lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let mut conn = self.pool.acquire().await?;
        sale_lines(&mut conn, sale_id).await
    }

    /// Sales, newest first, optionally in one status.
    pub async fn list(&self, status: Option<SaleStatus>, limit: u32) -> DbResult<Vec<Sale>> {
        let sql = format!(
            "{} WHERE (? IS NULL OR status = ?) ORDER BY created_at DESC, rowid DESC LIMIT ?",
            SALE_SELECT
        );
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(status)
            .bind(status)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(sales)
    }

    /// Adds a product at its current sale price. A product already on the
    /// sale has its quantity increased and takes the new discount.
    pub async fn add_line(
        &self,
        sale_id: &str,
        product_id: &str,
        quantity: i64,
        discount_bps: u32,
    ) -> DbResult<DocumentTotals> {
        let mut tx = self.pool.begin().await?;

        claim_sale(&mut tx, sale_id, SaleStatus::Draft, "edit lines").await?;
        let product = fetch_product(&mut tx, product_id).await?;
        upsert_line(&mut tx, sale_id, &product, quantity, Some(discount_bps)).await?;

        let totals = recalc_totals(&mut tx, sale_id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Sets a line's quantity and optionally its discount. Zero or less
    /// removes the line.
    pub async fn update_line(
        &self,
        line_id: &str,
        quantity: i64,
        discount_bps: Option<u32>,
    ) -> DbResult<DocumentTotals> {
        let mut tx = self.pool.begin().await?;

        let sale = claim_draft_of_line(&mut tx, line_id).await?;

        if quantity <= 0 {
            sqlx::query("DELETE FROM sale_lines WHERE id = ?")
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
            debug!(line_id = %line_id, "Sale line removed by zero quantity");
        } else {
            let sql = format!("{} WHERE id = ?", SALE_LINE_SELECT);
            let line = sqlx::query_as::<_, SaleLine>(&sql)
                .bind(line_id)
                .fetch_one(&mut *tx)
                .await?;
            let product = fetch_product(&mut tx, &line.product_id).await?;
            let discount = discount_bps.unwrap_or(line.discount_bps);
            write_line_amounts(&mut tx, &line, quantity, discount, &product).await?;
        }

        let totals = recalc_totals(&mut tx, &sale.id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    pub async fn remove_line(&self, line_id: &str) -> DbResult<DocumentTotals> {
        let mut tx = self.pool.begin().await?;

        let sale = claim_draft_of_line(&mut tx, line_id).await?;
        sqlx::query("DELETE FROM sale_lines WHERE id = ?")
            .bind(line_id)
            .execute(&mut *tx)
            .await?;

        let totals = recalc_totals(&mut tx, &sale.id).await?;
        tx.commit().await?;
        Ok(totals)
    }

    /// Completes a draft: payment, stock exits, invoice and, for credit,
    /// the receivable. Nothing is written unless every check passes.
    pub async fn complete(
        &self,
        sale_id: &str,
        payment: &PaymentInput,
        cashier_id: Option<&str>,
    ) -> DbResult<SaleReceipt> {
        let mut tx = self.pool.begin().await?;
        let receipt = self.complete_in(&mut tx, sale_id, payment, cashier_id).await?;
        tx.commit().await?;

        info!(
            sale_id = %receipt.sale.id,
            number = %receipt.sale.number,
            method = %receipt.sale.payment_method,
            total_cents = receipt.sale.total_cents,
            invoice = %receipt.invoice.number,
            "Sale completed"
        );
        Ok(receipt)
    }

    /// POS checkout: replaces the draft's lines with the request's lines
    /// and completes the sale, all in one transaction.
    pub async fn checkout(
        &self,
        sale_id: &str,
        request: &CheckoutRequest,
        cashier_id: Option<&str>,
    ) -> DbResult<SaleReceipt> {
        let mut tx = self.pool.begin().await?;

        claim_sale(&mut tx, sale_id, SaleStatus::Draft, "checkout").await?;
        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        for line in &request.lines {
            let product = fetch_product(&mut tx, &line.product_id).await?;
            upsert_line(&mut tx, sale_id, &product, line.quantity, None).await?;
        }

        let receipt = self
            .complete_in(&mut tx, sale_id, &request.payment(), cashier_id)
            .await?;
        tx.commit().await?;

        info!(
            sale_id = %receipt.sale.id,
            number = %receipt.sale.number,
            lines = request.lines.len(),
            total_cents = receipt.sale.total_cents,
            "Checkout completed"
        );
        Ok(receipt)
    }

    async fn complete_in(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        payment: &PaymentInput,
        cashier_id: Option<&str>,
    ) -> DbResult<SaleReceipt> {
        let sale = claim_sale(conn, sale_id, SaleStatus::Draft, "complete").await?;

        let lines = sale_lines(conn, sale_id).await?;
        if lines.is_empty() {
            return Err(CoreError::EmptyDocument {
                document: "Sale".to_string(),
                id: sale_id.to_string(),
            }
            .into());
        }
        let totals = recalc_totals(conn, sale_id).await?;

        // Payment customer first, then the one on the draft.
        let candidate = payment
            .customer_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(sale.customer_id.as_deref());
        let customer_id = match candidate {
            None => None,
            Some(id) => {
                if customer_exists(conn, id).await? {
                    Some(id.to_string())
                } else if payment.method == PaymentMethod::Credit {
                    warn!(sale_id = %sale_id, customer_id = %id, "Credit sale for unknown customer");
                    return Err(CoreError::MissingCustomer.into());
                } else {
                    return Err(DbError::not_found("Customer", id));
                }
            }
        };

        let settled = match settle_payment(totals.total(), payment, customer_id.as_deref()) {
            Ok(settled) => settled,
            Err(err) => {
                warn!(sale_id = %sale_id, method = %payment.method, error = %err, "Payment rejected");
                return Err(err.into());
            }
        };

        for line in &lines {
            let product = fetch_product(conn, &line.product_id).await?;
            let on_hand = balance_on(conn, &line.product_id).await?;
            if let Err(err) = ensure_available(&product.name, on_hand, line.quantity) {
                warn!(sale_id = %sale_id, product_id = %product.id, on_hand, requested = line.quantity, "Sale rejected for stock");
                return Err(err.into());
            }
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE sales
            SET status = 'PAGADA', payment_method = ?, cash_received_cents = ?, change_cents = ?,
                payment_reference = ?, customer_id = ?, cashier_id = ?,
                completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(settled.method)
        .bind(settled.cash_received.cents())
        .bind(settled.change.cents())
        .bind(&settled.reference)
        .bind(&settled.customer_id)
        .bind(cashier_id)
        .bind(now)
        .bind(now)
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

        let sale = fetch_sale(conn, sale_id).await?;

        let reference = sale_exit_reference(&sale.number);
        for line in &lines {
            let exit = NewMovement::new(
                &line.product_id,
                MovementKind::Outbound,
                line.quantity,
                line.unit_price(),
                reference.as_str(),
                "Venta",
            )?
            .by(cashier_id);
            append_movement(conn, &exit).await?;
        }

        let (header, invoice_lines) = invoice_from_sale(&sale, &lines);
        let (invoice, _) = ensure_invoice(conn, &header, &invoice_lines).await?;

        let receivable = match (settled.method, settled.customer_id.as_deref()) {
            (PaymentMethod::Credit, Some(customer)) => {
                let due = due_date(now.date_naive(), self.settings.credit_term_days);
                Some(open_receivable(conn, &sale, customer, due).await?)
            }
            _ => None,
        };

        Ok(SaleReceipt {
            sale,
            invoice,
            receivable,
        })
    }

    /// Cancels a draft: lines deleted, totals zeroed.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        claim_sale(&mut tx, sale_id, SaleStatus::Draft, "cancel").await?;
        sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?")
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE sales
            SET status = 'CANCELADA', subtotal_cents = 0, tax_cents = 0, discount_cents = 0,
                total_cents = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(sale_id)
        .execute(&mut *tx)
        .await?;

        let sale = fetch_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, number = %sale.number, "Sale cancelled");
        Ok(sale)
    }

    /// Voids a paid sale: stock comes back, the invoice is voided and any
    /// receivable is written off.
    pub async fn void(&self, sale_id: &str, user_id: Option<&str>) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;

        let sale = claim_sale(&mut tx, sale_id, SaleStatus::Paid, "void").await?;
        let reference = sale_void_reference(&sale.number);

        if !movement_exists(&mut tx, &reference).await? {
            for line in sale_lines(&mut tx, sale_id).await? {
                let entry = NewMovement::new(
                    &line.product_id,
                    MovementKind::Inbound,
                    line.quantity,
                    line.unit_price(),
                    reference.as_str(),
                    "Venta anulada",
                )?
                .by(user_id);
                append_movement(&mut tx, &entry).await?;
            }
        }

        void_invoice(&mut tx, &sale_invoice_number(&sale.number)).await?;
        write_off(&mut tx, sale_id).await?;

        sqlx::query("UPDATE sales SET status = 'ANULADA', updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;

        let sale = fetch_sale(&mut tx, sale_id).await?;
        tx.commit().await?;

        info!(sale_id = %sale_id, number = %sale.number, "Sale voided");
        Ok(sale)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{customer, product, stocked_product, test_db};
    use bodega_core::dto::{CheckoutLine, CheckoutReply};
    use bodega_core::{AgingStatus, Money, ValidationError, MAX_ITEM_QUANTITY};
    use chrono::Days;

    async fn movement_count(db: &crate::pool::Database, reference: &str) -> usize {
        db.stock().movements_by_reference(reference).await.unwrap().len()
    }

    #[tokio::test]
    async fn test_numbers_increase_from_000001() {
        let db = test_db().await;
        let first = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        let second = db.sales().create_draft(None, SaleChannel::Web, None).await.unwrap();
        db.sales().cancel(&second.id).await.unwrap();
        let third = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();

        assert_eq!(first.number, "000001");
        assert_eq!(second.number, "000002");
        assert_eq!(third.number, "000003");
        assert_eq!(first.status, SaleStatus::Draft);

        let found = db.sales().get_by_number("000003").await.unwrap().unwrap();
        assert_eq!(found.id, third.id);

        let err = db
            .sales()
            .create_draft(None, SaleChannel::Pos, Some("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_line_amounts_and_merge() {
        let db = test_db().await;
        let cafe = product(&db, "Café", 10000, 1500).await;
        let pan = product(&db, "Pan", 2000, 0).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();

        // 2 × 100.00, 10% off → 180.00 + 27.00 tax
        let totals = db.sales().add_line(&sale.id, &cafe.id, 2, 1000).await.unwrap();
        assert_eq!(totals.subtotal_cents, 18000);
        assert_eq!(totals.discount_cents, 2000);
        assert_eq!(totals.tax_cents, 2700);
        assert_eq!(totals.total_cents, 20700);

        let totals = db.sales().add_line(&sale.id, &pan.id, 3, 0).await.unwrap();
        assert_eq!(totals.total_cents, 26700);

        let totals = db.sales().add_line(&sale.id, &cafe.id, 1, 0).await.unwrap();
        let lines = db.sales().lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].discount_bps, 0);
        assert_eq!(totals.total_cents, 34500 + 6000);

        let totals = db.sales().update_line(&lines[1].id, 1, None).await.unwrap();
        assert_eq!(totals.total_cents, 34500 + 2000);

        let totals = db.sales().update_line(&lines[1].id, 0, None).await.unwrap();
        assert_eq!(totals.total_cents, 34500);
        let totals = db.sales().remove_line(&lines[0].id).await.unwrap();
        assert_eq!(totals, DocumentTotals::default());

        let err = db.sales().remove_line("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_cash_sale_materializes_everything() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(Some("ana"), SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 4, 0).await.unwrap();

        let receipt = db
            .sales()
            .complete(&sale.id, &PaymentInput::cash(Money::from_cents(20000)), Some("ana"))
            .await
            .unwrap();

        assert_eq!(receipt.sale.status, SaleStatus::Paid);
        assert_eq!(receipt.sale.total_cents, 11500);
        assert_eq!(receipt.sale.change_cents, 8500);
        assert_eq!(receipt.sale.cashier_id.as_deref(), Some("ana"));
        assert!(receipt.sale.completed_at.is_some());
        assert!(receipt.receivable.is_none());
        assert_eq!(receipt.invoice.number, "FV-000001");
        assert_eq!(receipt.invoice.cash_received_cents, Some(20000));
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 6);
        assert_eq!(movement_count(&db, "SALE-000001").await, 1);
    }

    #[tokio::test]
    async fn test_completing_paid_sale_is_rejected() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 2, 0).await.unwrap();
        db.sales()
            .complete(&sale.id, &PaymentInput::card("AUTH-1"), None)
            .await
            .unwrap();

        let err = db
            .sales()
            .complete(&sale.id, &PaymentInput::card("AUTH-2"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));

        let invoices: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(invoices, 1);
        assert_eq!(movement_count(&db, "SALE-000001").await, 1);
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 8);

        let err = db.sales().add_line(&sale.id, &arroz.id, 1, 0).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_draft() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 12, 0).await.unwrap();

        let err = db
            .sales()
            .complete(&sale.id, &PaymentInput::cash(Money::from_cents(100000)), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock {
                available: 10,
                requested: 12,
                ..
            })
        ));

        let stored = db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Draft);
        assert_eq!(movement_count(&db, "SALE-000001").await, 0);
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 10);
        assert!(db.invoices().get_for_sale(&sale.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_payment_rules() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 1, 0).await.unwrap();

        let err = db
            .sales()
            .complete(&sale.id, &PaymentInput::cash(Money::from_cents(2874)), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientPayment { .. })));

        let err = db
            .sales()
            .complete(&sale.id, &PaymentInput::transfer("   "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MissingReference { .. })));

        let mut credit = PaymentInput::credit("x");
        credit.customer_id = None;
        let err = db.sales().complete(&sale.id, &credit, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MissingCustomer)));

        let err = db
            .sales()
            .complete(&sale.id, &PaymentInput::credit("missing"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MissingCustomer)));

        let empty = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        let err = db
            .sales()
            .complete(&empty.id, &PaymentInput::card("AUTH-1"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyDocument { .. })));

        // Exact cash is enough.
        let receipt = db
            .sales()
            .complete(&sale.id, &PaymentInput::cash(Money::from_cents(2875)), None)
            .await
            .unwrap();
        assert_eq!(receipt.sale.change_cents, 0);
    }

    #[tokio::test]
    async fn test_credit_sale_opens_receivable() {
        let db = test_db().await;
        let c = customer(&db, "Ferretería Lopez").await;
        let tv = product(&db, "Televisor", 50000, 0).await;
        db.stock()
            .adjust(&tv.id, bodega_core::ledger::AdjustmentKind::Positive, 3, "Conteo", None)
            .await
            .unwrap();
        let sale = db.sales().create_draft(None, SaleChannel::Pos, Some(&c.id)).await.unwrap();
        db.sales().add_line(&sale.id, &tv.id, 1, 0).await.unwrap();

        // The customer on the draft is used when the payment names none.
        let mut payment = PaymentInput::credit("x");
        payment.customer_id = None;
        let receipt = db.sales().complete(&sale.id, &payment, None).await.unwrap();

        let receivable = receipt.receivable.unwrap();
        assert_eq!(receivable.total_cents, 50000);
        assert_eq!(receivable.outstanding_cents, 50000);
        let completed_on = receipt.sale.completed_at.unwrap().date_naive();
        assert_eq!(receivable.due_date, completed_on.checked_add_days(Days::new(30)).unwrap());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receivables WHERE sale_id = ?")
            .bind(&sale.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);

        let paid = db
            .receivables()
            .apply_payment(&receivable.id, Money::from_cents(50000), completed_on)
            .await
            .unwrap();
        assert_eq!(paid.outstanding_cents, 0);
        assert_eq!(
            db.receivables().status(&receivable.id, completed_on).await.unwrap(),
            AgingStatus::Settled
        );
    }

    #[tokio::test]
    async fn test_void_restores_stock() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let frijol = stocked_product(&db, "Frijol", 3000, 5).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 4, 0).await.unwrap();
        db.sales().add_line(&sale.id, &frijol.id, 2, 0).await.unwrap();
        let receipt = db
            .sales()
            .complete(&sale.id, &PaymentInput::card("AUTH-9"), None)
            .await
            .unwrap();
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 6);

        let voided = db.sales().void(&sale.id, Some("admin")).await.unwrap();
        assert_eq!(voided.status, SaleStatus::Voided);
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 10);
        assert_eq!(db.stock().balance(&frijol.id).await.unwrap(), 5);
        assert_eq!(movement_count(&db, "SALE-VOID-000001").await, 2);

        let invoice = db.invoices().get(&receipt.invoice.id).await.unwrap().unwrap();
        assert!(invoice.is_voided());

        let err = db.sales().void(&sale.id, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
        assert_eq!(movement_count(&db, "SALE-VOID-000001").await, 2);
    }

    #[tokio::test]
    async fn test_cancel_only_drafts() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let draft = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&draft.id, &arroz.id, 2, 0).await.unwrap();

        let cancelled = db.sales().cancel(&draft.id).await.unwrap();
        assert_eq!(cancelled.status, SaleStatus::Cancelled);
        assert_eq!(cancelled.total_cents, 0);
        assert!(db.sales().lines(&draft.id).await.unwrap().is_empty());

        let paid = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&paid.id, &arroz.id, 1, 0).await.unwrap();
        db.sales()
            .complete(&paid.id, &PaymentInput::card("AUTH-3"), None)
            .await
            .unwrap();
        let err = db.sales().cancel(&paid.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));

        let err = db.sales().cancel("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        assert_eq!(db.sales().list(Some(SaleStatus::Paid), 10).await.unwrap().len(), 1);
        assert_eq!(db.sales().list(None, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkout_replaces_lines_and_completes() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let frijol = stocked_product(&db, "Frijol", 3000, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &frijol.id, 9, 0).await.unwrap();

        let request = CheckoutRequest {
            lines: vec![
                CheckoutLine {
                    product_id: arroz.id.clone(),
                    quantity: 1,
                },
                CheckoutLine {
                    product_id: arroz.id.clone(),
                    quantity: 1,
                },
            ],
            paid: Money::from_cents(10000),
            method: PaymentMethod::Cash,
            reference: None,
            customer_id: None,
        };
        let receipt = db.sales().checkout(&sale.id, &request, Some("caja-1")).await.unwrap();

        assert_eq!(receipt.sale.total_cents, 5750);
        assert_eq!(receipt.sale.change_cents, 4250);
        let lines = db.sales().lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(db.stock().balance(&arroz.id).await.unwrap(), 8);
        assert_eq!(db.stock().balance(&frijol.id).await.unwrap(), 10);

        let reply = serde_json::to_value(CheckoutReply::from(&receipt)).unwrap();
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["venta_id"], sale.id.as_str());
        assert_eq!(reply["venta_num"], "000001");
        assert_eq!(reply["factura"], "FV-000001");
        assert_eq!(reply["total"], "57.50");
        assert_eq!(reply["cambio"], "42.50");
    }

    #[tokio::test]
    async fn test_oversized_quantities_rejected() {
        let db = test_db().await;
        let arroz = product(&db, "Arroz", 2500, 1500).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();

        let err = db
            .sales()
            .add_line(&sale.id, &arroz.id, i64::MAX / 1000, 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(db.sales().lines(&sale.id).await.unwrap().is_empty());

        db.sales().add_line(&sale.id, &arroz.id, MAX_ITEM_QUANTITY, 0).await.unwrap();
        let err = db.sales().add_line(&sale.id, &arroz.id, 1, 0).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let lines = db.sales().lines(&sale.id).await.unwrap();
        let err = db
            .sales()
            .update_line(&lines[0].id, MAX_ITEM_QUANTITY + 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let stored = db.sales().get(&sale.id).await.unwrap().unwrap();
        assert_eq!(db.sales().lines(&sale.id).await.unwrap()[0].quantity, MAX_ITEM_QUANTITY);
        assert_eq!(stored.subtotal_cents, 2500 * MAX_ITEM_QUANTITY);
    }

    #[tokio::test]
    async fn test_line_edits_rejected_after_payment() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &arroz.id, 2, 0).await.unwrap();
        db.sales()
            .complete(&sale.id, &PaymentInput::card("AUTH-9"), None)
            .await
            .unwrap();
        let line_id = db.sales().lines(&sale.id).await.unwrap()[0].id.clone();

        let err = db.sales().update_line(&line_id, 5, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
        let err = db.sales().remove_line(&line_id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));

        let lines = db.sales().lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_failed_checkout_rolls_back_line_replacement() {
        let db = test_db().await;
        let arroz = stocked_product(&db, "Arroz", 2500, 1).await;
        let frijol = stocked_product(&db, "Frijol", 3000, 10).await;
        let sale = db.sales().create_draft(None, SaleChannel::Pos, None).await.unwrap();
        db.sales().add_line(&sale.id, &frijol.id, 2, 0).await.unwrap();

        let request = CheckoutRequest {
            lines: vec![CheckoutLine {
                product_id: arroz.id.clone(),
                quantity: 5,
            }],
            paid: Money::from_cents(100000),
            method: PaymentMethod::Cash,
            reference: None,
            customer_id: None,
        };
        let err = db.sales().checkout(&sale.id, &request, None).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

        let lines = db.sales().lines(&sale.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, frijol.id);
    }
}
