//! # Invoice Repository
//!
//! Invoices are materialized from confirmed purchases and paid sales.
//!
//! ## Get-or-Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ensure_invoice(header, lines)                                          │
//! │       │                                                                 │
//! │       ├── SELECT … WHERE number = 'FV-000042'                           │
//! │       │        found ──► return it (lines untouched)                   │
//! │       │                                                                 │
//! │       └── missing ──► INSERT header ──► INSERT mirrored lines          │
//! │                                                                         │
//! │  The number is UNIQUE, and so are sale_id / purchase_id: a source      │
//! │  document can never end up with two invoices.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::invoice::{invoice_from_purchase, invoice_from_sale, NewInvoice, NewInvoiceLine};
use bodega_core::lifecycle::ensure_sale_status;
use bodega_core::{
    new_id, CoreError, Invoice, InvoiceKind, InvoiceLine, PurchaseStatus, SaleStatus, VoidOutcome,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::purchase::{fetch_purchase, purchase_lines};
use crate::repository::sale::{fetch_sale, sale_lines};

const INVOICE_SELECT: &str = r#"
    SELECT id, kind, number, sale_id, purchase_id, customer_id, supplier_id,
           subtotal_cents, tax_cents, total_cents,
           payment_method, payment_reference, cash_received_cents, change_cents,
           created_by, issued_at, voided_at
    FROM invoices
"#;

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_invoice_by_number(
    conn: &mut SqliteConnection,
    number: &str,
) -> DbResult<Option<Invoice>> {
    let sql = format!("{} WHERE number = ?", INVOICE_SELECT);
    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(number)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(invoice)
}

/// Returns the invoice with `header.number`, creating it (and its lines)
/// only when absent. The flag is `true` when this call created it.
pub(crate) async fn ensure_invoice(
    conn: &mut SqliteConnection,
    header: &NewInvoice,
    lines: &[NewInvoiceLine],
) -> DbResult<(Invoice, bool)> {
    if let Some(existing) = fetch_invoice_by_number(conn, &header.number).await? {
        debug!(number = %existing.number, "Invoice already exists");
        return Ok((existing, false));
    }

    let invoice = Invoice {
        id: new_id(),
        kind: header.kind,
        number: header.number.clone(),
        sale_id: header.sale_id.clone(),
        purchase_id: header.purchase_id.clone(),
        customer_id: header.customer_id.clone(),
        supplier_id: header.supplier_id.clone(),
        subtotal_cents: header.subtotal.cents(),
        tax_cents: header.tax.cents(),
        total_cents: header.total.cents(),
        payment_method: header.payment_method,
        payment_reference: header.payment_reference.clone(),
        cash_received_cents: header.cash_received.map(|m| m.cents()),
        change_cents: header.change.map(|m| m.cents()),
        created_by: header.created_by.clone(),
        issued_at: Utc::now(),
        voided_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, kind, number, sale_id, purchase_id, customer_id, supplier_id,
            subtotal_cents, tax_cents, total_cents,
            payment_method, payment_reference, cash_received_cents, change_cents,
            created_by, issued_at, voided_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.kind)
    .bind(&invoice.number)
    .bind(&invoice.sale_id)
    .bind(&invoice.purchase_id)
    .bind(&invoice.customer_id)
    .bind(&invoice.supplier_id)
    .bind(invoice.subtotal_cents)
    .bind(invoice.tax_cents)
    .bind(invoice.total_cents)
    .bind(invoice.payment_method)
    .bind(&invoice.payment_reference)
    .bind(invoice.cash_received_cents)
    .bind(invoice.change_cents)
    .bind(&invoice.created_by)
    .bind(invoice.issued_at)
    .execute(&mut *conn)
    .await?;

    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                id, invoice_id, product_id, quantity, unit_price_cents,
                subtotal_cents, tax_cents, total_cents, position
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(&invoice.id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.subtotal.cents())
        .bind(line.tax.cents())
        .bind(line.total.cents())
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }

    info!(
        number = %invoice.number,
        kind = %invoice.kind,
        lines = lines.len(),
        total_cents = invoice.total_cents,
        "Invoice issued"
    );

    Ok((invoice, true))
}

/// Stamps `voided_at` on the invoice with `number`, if it exists and is live.
pub(crate) async fn void_invoice(conn: &mut SqliteConnection, number: &str) -> DbResult<bool> {
    let result = sqlx::query("UPDATE invoices SET voided_at = ? WHERE number = ? AND voided_at IS NULL")
        .bind(Utc::now())
        .bind(number)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() > 0 {
        info!(number = %number, "Invoice voided");
    }
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{} WHERE id = ?", INVOICE_SELECT);
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    pub async fn get_by_number(&self, number: &str) -> DbResult<Option<Invoice>> {
        let mut conn = self.pool.acquire().await?;
        fetch_invoice_by_number(&mut conn, number).await
    }

    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{} WHERE sale_id = ?", INVOICE_SELECT);
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(sale_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    pub async fn get_for_purchase(&self, purchase_id: &str) -> DbResult<Option<Invoice>> {
        let sql = format!("{} WHERE purchase_id = ?", INVOICE_SELECT);
        let invoice = sqlx::query_as::<_, Invoice>(&sql)
            .bind(purchase_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(invoice)
    }

    /// Lines in the order they were mirrored from the source document.
    pub async fn lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            r#"
            SELECT id, invoice_id, product_id, quantity, unit_price_cents,
                   subtotal_cents, tax_cents, total_cents
            FROM invoice_lines
            WHERE invoice_id = ?
            ORDER BY position
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lines)
    }

    /// Most recent invoices first, optionally of one kind.
    pub async fn list(&self, kind: Option<InvoiceKind>, limit: u32) -> DbResult<Vec<Invoice>> {
        let sql = format!(
            "{} WHERE (? IS NULL OR kind = ?) ORDER BY issued_at DESC, rowid DESC LIMIT ?",
            INVOICE_SELECT
        );
        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(kind)
            .bind(kind)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(invoices)
    }

    /// Get-or-create the PURCHASE invoice of a confirmed purchase.
    pub async fn ensure_for_purchase(&self, purchase_id: &str) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("UPDATE purchases SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(purchase_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(DbError::not_found("Purchase", purchase_id));
        }

        let purchase = fetch_purchase(&mut tx, purchase_id).await?;
        if purchase.status != PurchaseStatus::Confirmed {
            return Err(CoreError::invalid_status(
                "Purchase",
                &purchase.id,
                purchase.status.as_str(),
                "issue an invoice",
            )
            .into());
        }

        let lines = purchase_lines(&mut tx, purchase_id).await?;
        let (header, invoice_lines) = invoice_from_purchase(&purchase, &lines)?;
        let (invoice, _) = ensure_invoice(&mut tx, &header, &invoice_lines).await?;

        tx.commit().await?;
        Ok(invoice)
    }

    /// Get-or-create the SALE invoice of a paid sale.
    pub async fn ensure_for_sale(&self, sale_id: &str) -> DbResult<Invoice> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query("UPDATE sales SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(sale_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", sale_id));
        }

        let sale = fetch_sale(&mut tx, sale_id).await?;
        ensure_sale_status(&sale, SaleStatus::Paid, "issue an invoice")?;

        let lines = sale_lines(&mut tx, sale_id).await?;
        let (header, invoice_lines) = invoice_from_sale(&sale, &lines);
        let (invoice, _) = ensure_invoice(&mut tx, &header, &invoice_lines).await?;

        tx.commit().await?;
        Ok(invoice)
    }

    /// Voids an invoice. Voiding twice is reported, not failed.
    pub async fn void(&self, invoice_id: &str) -> DbResult<VoidOutcome> {
        let result = sqlx::query("UPDATE invoices SET voided_at = ? WHERE id = ? AND voided_at IS NULL")
            .bind(Utc::now())
            .bind(invoice_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            info!(invoice_id = %invoice_id, "Invoice voided");
            return Ok(VoidOutcome::Voided);
        }

        match self.get(invoice_id).await? {
            Some(_) => {
                warn!(invoice_id = %invoice_id, "Invoice already voided");
                Ok(VoidOutcome::AlreadyVoided)
            }
            None => Err(DbError::not_found("Invoice", invoice_id)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{stocked_product, test_db};
    use bodega_core::{Money, PaymentInput};

    #[tokio::test]
    async fn test_sale_invoice_is_idempotent() {
        let db = test_db().await;
        let p = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(Some("cajero"), Default::default(), None).await.unwrap();
        db.sales().add_line(&sale.id, &p.id, 2, 0).await.unwrap();
        let receipt = db
            .sales()
            .complete(&sale.id, &PaymentInput::cash(Money::from_cents(10000)), Some("cajero"))
            .await
            .unwrap();

        let again = db.invoices().ensure_for_sale(&sale.id).await.unwrap();
        assert_eq!(again.id, receipt.invoice.id);
        assert_eq!(again.number, format!("FV-{}", receipt.sale.number));

        let lines = db.invoices().lines(&again.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE sale_id = ?")
            .bind(&sale.id)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_draft_sale_cannot_be_invoiced() {
        let db = test_db().await;
        let sale = db.sales().create_draft(None, Default::default(), None).await.unwrap();

        let err = db.invoices().ensure_for_sale(&sale.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidStatus { .. })));
        assert!(db.invoices().get_for_sale(&sale.id).await.unwrap().is_none());

        let err = db.invoices().ensure_for_sale("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_void_invoice_twice() {
        let db = test_db().await;
        let p = stocked_product(&db, "Arroz", 2500, 10).await;
        let sale = db.sales().create_draft(None, Default::default(), None).await.unwrap();
        db.sales().add_line(&sale.id, &p.id, 1, 0).await.unwrap();
        let receipt = db
            .sales()
            .complete(&sale.id, &PaymentInput::card("AUTH-77"), None)
            .await
            .unwrap();

        assert_eq!(db.invoices().void(&receipt.invoice.id).await.unwrap(), VoidOutcome::Voided);
        assert_eq!(
            db.invoices().void(&receipt.invoice.id).await.unwrap(),
            VoidOutcome::AlreadyVoided
        );
        let stored = db.invoices().get(&receipt.invoice.id).await.unwrap().unwrap();
        assert!(stored.is_voided());

        assert_eq!(db.invoices().list(Some(InvoiceKind::Sale), 10).await.unwrap().len(), 1);
        assert!(db.invoices().list(Some(InvoiceKind::Purchase), 10).await.unwrap().is_empty());
    }
}
