//! # Receivable Repository
//!
//! Accounts receivable opened by credit sales.
//!
//! ## Payment Application
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  apply_payment(id, 40.00)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  UPDATE receivables                                                     │
//! │     SET outstanding_cents = outstanding_cents - 4000                    │
//! │   WHERE id = ? AND voided_at IS NULL AND outstanding_cents >= 4000      │
//! │       │                                                                 │
//! │       ├── 1 row  ──► INSERT receivable_payments ──► COMMIT             │
//! │       └── 0 rows ──► re-read the row and let bodega-core explain why   │
//! │                      (InvalidAmount, AlreadySettled, ExceedsBalance…)  │
//! │                                                                         │
//! │  Two cashiers paying the same debt can never take it below zero: the   │
//! │  check and the decrement are the same statement.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::receivable::{
    aging, aging_summary, apply_payment, customer_credit, AgingSummary, CustomerCredit,
    ReceivableFilter,
};
use bodega_core::{new_id, AgingStatus, Money, Receivable, ReceivablePayment, Sale};
use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};

const RECEIVABLE_SELECT: &str = r#"
    SELECT id, sale_id, customer_id, total_cents, outstanding_cents,
           due_date, created_at, voided_at
    FROM receivables
"#;

// =============================================================================
// Connection Helpers
// =============================================================================

pub(crate) async fn fetch_receivable_for_sale(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> DbResult<Option<Receivable>> {
    let sql = format!("{} WHERE sale_id = ?", RECEIVABLE_SELECT);
    let receivable = sqlx::query_as::<_, Receivable>(&sql)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(receivable)
}

/// Opens the receivable of a credit sale for its full total. A sale that
/// already has one gets it back unchanged.
pub(crate) async fn open_receivable(
    conn: &mut SqliteConnection,
    sale: &Sale,
    customer_id: &str,
    due_date: NaiveDate,
) -> DbResult<Receivable> {
    if let Some(existing) = fetch_receivable_for_sale(conn, &sale.id).await? {
        debug!(sale_id = %sale.id, "Receivable already open");
        return Ok(existing);
    }

    let receivable = Receivable {
        id: new_id(),
        sale_id: sale.id.clone(),
        customer_id: customer_id.to_string(),
        total_cents: sale.total_cents,
        outstanding_cents: sale.total_cents,
        due_date,
        created_at: Utc::now(),
        voided_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO receivables (
            id, sale_id, customer_id, total_cents, outstanding_cents,
            due_date, created_at, voided_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(&receivable.id)
    .bind(&receivable.sale_id)
    .bind(&receivable.customer_id)
    .bind(receivable.total_cents)
    .bind(receivable.outstanding_cents)
    .bind(receivable.due_date)
    .bind(receivable.created_at)
    .execute(&mut *conn)
    .await?;

    info!(
        sale_id = %sale.id,
        customer_id = %customer_id,
        total_cents = receivable.total_cents,
        due_date = %due_date,
        "Receivable opened"
    );
    Ok(receivable)
}

/// Closes the receivable of a voided sale: nothing more is owed.
pub(crate) async fn write_off(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<bool> {
    let result = sqlx::query(
        "UPDATE receivables SET outstanding_cents = 0, voided_at = ? WHERE sale_id = ? AND voided_at IS NULL",
    )
    .bind(Utc::now())
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() > 0 {
        info!(sale_id = %sale_id, "Receivable written off");
    }
    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for receivables and their payments.
#[derive(Debug, Clone)]
pub struct ReceivableRepository {
    pool: SqlitePool,
}

impl ReceivableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReceivableRepository { pool }
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Receivable>> {
        let sql = format!("{} WHERE id = ?", RECEIVABLE_SELECT);
        let receivable = sqlx::query_as::<_, Receivable>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(receivable)
    }

    pub async fn get_for_sale(&self, sale_id: &str) -> DbResult<Option<Receivable>> {
        let mut conn = self.pool.acquire().await?;
        fetch_receivable_for_sale(&mut conn, sale_id).await
    }

    /// Aging status of one receivable as of `today`.
    pub async fn status(&self, id: &str, today: NaiveDate) -> DbResult<AgingStatus> {
        let receivable = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Receivable", id))?;
        Ok(aging(&receivable, today))
    }

    /// Payments received against a receivable, oldest first.
    pub async fn payments(&self, receivable_id: &str) -> DbResult<Vec<ReceivablePayment>> {
        let payments = sqlx::query_as::<_, ReceivablePayment>(
            r#"
            SELECT id, receivable_id, amount_cents, paid_on, created_at
            FROM receivable_payments
            WHERE receivable_id = ?
            ORDER BY created_at, rowid
            "#,
        )
        .bind(receivable_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }

    /// Records a customer payment and returns the updated receivable.
    pub async fn apply_payment(
        &self,
        receivable_id: &str,
        amount: Money,
        paid_on: NaiveDate,
    ) -> DbResult<Receivable> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE receivables
            SET outstanding_cents = outstanding_cents - ?
            WHERE id = ?
              AND voided_at IS NULL
              AND ? > 0
              AND outstanding_cents >= ?
            "#,
        )
        .bind(amount.cents())
        .bind(receivable_id)
        .bind(amount.cents())
        .bind(amount.cents())
        .execute(&mut *tx)
        .await?;

        let sql = format!("{} WHERE id = ?", RECEIVABLE_SELECT);
        let current = sqlx::query_as::<_, Receivable>(&sql)
            .bind(receivable_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("Receivable", receivable_id))?;

        if updated.rows_affected() == 0 {
            let err = match apply_payment(&current, amount) {
                Err(err) => DbError::from(err),
                Ok(_) => DbError::Internal(format!(
                    "payment on receivable {} was not applied",
                    receivable_id
                )),
            };
            warn!(
                receivable_id = %receivable_id,
                amount_cents = amount.cents(),
                outstanding_cents = current.outstanding_cents,
                error = %err,
                "Receivable payment rejected"
            );
            return Err(err);
        }

        sqlx::query(
            r#"
            INSERT INTO receivable_payments (id, receivable_id, amount_cents, paid_on, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(receivable_id)
        .bind(amount.cents())
        .bind(paid_on)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            receivable_id = %receivable_id,
            amount_cents = amount.cents(),
            outstanding_cents = current.outstanding_cents,
            "Receivable payment applied"
        );
        Ok(current)
    }

    /// Receivables with a balance, earliest due first, narrowed by `filter`.
    pub async fn open_receivables(
        &self,
        today: NaiveDate,
        filter: ReceivableFilter,
    ) -> DbResult<Vec<Receivable>> {
        let outstanding = self.outstanding().await?;
        Ok(outstanding
            .into_iter()
            .filter(|r| filter.matches(r, today))
            .collect())
    }

    /// Current and overdue totals across all customers.
    pub async fn aging_summary(&self, today: NaiveDate) -> DbResult<AgingSummary> {
        let outstanding = self.outstanding().await?;
        Ok(aging_summary(&outstanding, today))
    }

    /// Receivables of one customer, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Receivable>> {
        let sql = format!(
            "{} WHERE customer_id = ? ORDER BY created_at DESC, rowid DESC",
            RECEIVABLE_SELECT
        );
        let receivables = sqlx::query_as::<_, Receivable>(&sql)
            .bind(customer_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(receivables)
    }

    /// Credit granted, paid and still owed by one customer.
    pub async fn customer_credit(&self, customer_id: &str) -> DbResult<CustomerCredit> {
        let receivables = self.list_for_customer(customer_id).await?;
        Ok(customer_credit(&receivables))
    }

    async fn outstanding(&self) -> DbResult<Vec<Receivable>> {
        let sql = format!(
            "{} WHERE voided_at IS NULL AND outstanding_cents > 0 ORDER BY due_date, created_at",
            RECEIVABLE_SELECT
        );
        let receivables = sqlx::query_as::<_, Receivable>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(receivables)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
