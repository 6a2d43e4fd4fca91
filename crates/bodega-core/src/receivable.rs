//! # Accounts Receivable
//!
//! Payment application and aging for credit sales.
//!
//! ## Payment Application
//! ```text
//! apply_payment(receivable, amount)
//!      │
//!      ├── amount <= 0            → InvalidAmount
//!      ├── receivable voided      → ReceivableVoided
//!      ├── outstanding == 0       → AlreadySettled
//!      ├── amount > outstanding   → ExceedsBalance
//!      └── outstanding' = max(0, outstanding − amount)
//! ```
//!
//! ## Aging
//! Computed on read, never stored:
//!
//! | Condition                         | Status  |
//! |-----------------------------------|---------|
//! | voided                            | ANULADA |
//! | outstanding == 0                  | PAGADA  |
//! | outstanding > 0, due <  today     | VENCIDA |
//! | outstanding > 0, due >= today     | VIGENTE |

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{AgingStatus, Receivable};

/// Validates a payment and returns the new outstanding balance.
pub fn apply_payment(receivable: &Receivable, amount: Money) -> CoreResult<Money> {
    if !amount.is_positive() {
        return Err(CoreError::InvalidAmount {
            cents: amount.cents(),
        });
    }

    if receivable.voided_at.is_some() {
        return Err(CoreError::ReceivableVoided {
            receivable_id: receivable.id.clone(),
        });
    }

    let outstanding = receivable.outstanding();
    if !outstanding.is_positive() {
        return Err(CoreError::AlreadySettled {
            receivable_id: receivable.id.clone(),
        });
    }

    if amount > outstanding {
        return Err(CoreError::ExceedsBalance {
            amount_cents: amount.cents(),
            outstanding_cents: outstanding.cents(),
        });
    }

    Ok((outstanding - amount).floor_zero())
}

/// Aging status of a receivable as of `today`.
pub fn aging(receivable: &Receivable, today: NaiveDate) -> AgingStatus {
    if receivable.voided_at.is_some() {
        return AgingStatus::Voided;
    }
    aging_of(receivable.outstanding(), receivable.due_date, today)
}

/// Aging status from the raw fields of a live receivable.
pub fn aging_of(outstanding: Money, due_date: NaiveDate, today: NaiveDate) -> AgingStatus {
    if !outstanding.is_positive() {
        AgingStatus::Settled
    } else if due_date < today {
        AgingStatus::Overdue
    } else {
        AgingStatus::Current
    }
}

/// Due date of a credit sale completed on `completed_on`.
pub fn due_date(completed_on: NaiveDate, term_days: u32) -> NaiveDate {
    completed_on
        .checked_add_days(Days::new(u64::from(term_days)))
        .unwrap_or(NaiveDate::MAX)
}

// =============================================================================
// Listings & Summaries
// =============================================================================

/// Which receivables a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReceivableFilter {
    /// Every receivable with an outstanding balance.
    #[default]
    Pending,
    /// Outstanding and past due.
    Overdue,
    /// Outstanding and not yet due.
    Current,
}

impl ReceivableFilter {
    pub fn matches(&self, receivable: &Receivable, today: NaiveDate) -> bool {
        let status = aging(receivable, today);
        match self {
            ReceivableFilter::Pending => {
                matches!(status, AgingStatus::Current | AgingStatus::Overdue)
            }
            ReceivableFilter::Overdue => status == AgingStatus::Overdue,
            ReceivableFilter::Current => status == AgingStatus::Current,
        }
    }
}

/// Portfolio-wide receivable totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgingSummary {
    pub current_cents: i64,
    pub overdue_cents: i64,
    pub customers_with_debt: i64,
}

pub fn aging_summary(receivables: &[Receivable], today: NaiveDate) -> AgingSummary {
    let mut summary = AgingSummary::default();
    let mut debtors = HashSet::new();

    for r in receivables {
        match aging(r, today) {
            AgingStatus::Current => summary.current_cents += r.outstanding_cents,
            AgingStatus::Overdue => summary.overdue_cents += r.outstanding_cents,
            AgingStatus::Settled | AgingStatus::Voided => continue,
        }
        debtors.insert(r.customer_id.as_str());
    }

    summary.customers_with_debt = debtors.len() as i64;
    summary
}

/// Credit position of one customer. Voided receivables are excluded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerCredit {
    pub total_credit_cents: i64,
    pub outstanding_cents: i64,
    pub paid_cents: i64,
}

pub fn customer_credit(receivables: &[Receivable]) -> CustomerCredit {
    receivables
        .iter()
        .filter(|r| r.voided_at.is_none())
        .fold(CustomerCredit::default(), |acc, r| CustomerCredit {
            total_credit_cents: acc.total_credit_cents + r.total_cents,
            outstanding_cents: acc.outstanding_cents + r.outstanding_cents,
            paid_cents: acc.paid_cents + r.paid().cents(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn receivable(customer: &str, total: i64, outstanding: i64, due: NaiveDate) -> Receivable {
        Receivable {
            id: "r1".to_string(),
            sale_id: "s1".to_string(),
            customer_id: customer.to_string(),
            total_cents: total,
            outstanding_cents: outstanding,
            due_date: due,
            created_at: Utc::now(),
            voided_at: None,
        }
    }

    #[test]
    fn test_apply_partial_then_full_payment() {
        let due = date(2025, 1, 31);
        let r = receivable("c1", 10000, 10000, due);

        let after = apply_payment(&r, Money::from_cents(4000)).unwrap();
        assert_eq!(after.cents(), 6000);

        let r = receivable("c1", 10000, 6000, due);
        let after = apply_payment(&r, Money::from_cents(6000)).unwrap();
        assert_eq!(after, Money::zero());
    }

    #[test]
    fn test_apply_payment_rejections() {
        let due = date(2025, 1, 31);

        let err = apply_payment(&receivable("c1", 10000, 6000, due), Money::from_cents(7000)).unwrap_err();
        assert!(matches!(err, CoreError::ExceedsBalance { amount_cents: 7000, outstanding_cents: 6000 }));

        let err = apply_payment(&receivable("c1", 10000, 6000, due), Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { cents: 0 }));

        let err = apply_payment(&receivable("c1", 10000, 6000, due), Money::from_cents(-5)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));

        let err = apply_payment(&receivable("c1", 10000, 0, due), Money::from_cents(1)).unwrap_err();
        assert!(matches!(err, CoreError::AlreadySettled { .. }));

        let mut voided = receivable("c1", 10000, 0, due);
        voided.voided_at = Some(Utc::now());
        let err = apply_payment(&voided, Money::from_cents(1)).unwrap_err();
        assert!(matches!(err, CoreError::ReceivableVoided { .. }));
    }

    #[test]
    fn test_aging() {
        let today = date(2025, 3, 10);

        assert_eq!(aging(&receivable("c", 100, 100, date(2025, 3, 9)), today), AgingStatus::Overdue);
        assert_eq!(aging(&receivable("c", 100, 100, date(2025, 3, 10)), today), AgingStatus::Current);
        assert_eq!(aging(&receivable("c", 100, 0, date(2025, 3, 9)), today), AgingStatus::Settled);

        let mut voided = receivable("c", 100, 0, date(2025, 3, 9));
        voided.voided_at = Some(Utc::now());
        assert_eq!(aging(&voided, today), AgingStatus::Voided);
    }

    #[test]
    fn test_due_date_adds_term() {
        assert_eq!(due_date(date(2025, 1, 15), 30), date(2025, 2, 14));
        assert_eq!(due_date(date(2025, 1, 15), 0), date(2025, 1, 15));
    }

    #[test]
    fn test_filters() {
        let today = date(2025, 3, 10);
        let overdue = receivable("c", 100, 50, date(2025, 3, 1));
        let current = receivable("c", 100, 50, date(2025, 4, 1));
        let settled = receivable("c", 100, 0, date(2025, 3, 1));

        assert!(ReceivableFilter::Pending.matches(&overdue, today));
        assert!(ReceivableFilter::Pending.matches(&current, today));
        assert!(!ReceivableFilter::Pending.matches(&settled, today));
        assert!(ReceivableFilter::Overdue.matches(&overdue, today));
        assert!(!ReceivableFilter::Overdue.matches(&current, today));
        assert!(ReceivableFilter::Current.matches(&current, today));
    }

    #[test]
    fn test_aging_summary() {
        let today = date(2025, 3, 10);
        let rows = vec![
            receivable("c1", 1000, 400, date(2025, 3, 1)),
            receivable("c1", 1000, 1000, date(2025, 4, 1)),
            receivable("c2", 500, 500, date(2025, 4, 1)),
            receivable("c3", 700, 0, date(2025, 3, 1)),
        ];

        let summary = aging_summary(&rows, today);
        assert_eq!(summary.overdue_cents, 400);
        assert_eq!(summary.current_cents, 1500);
        assert_eq!(summary.customers_with_debt, 2);
    }

    #[test]
    fn test_customer_credit_excludes_voided() {
        let due = date(2025, 4, 1);
        let mut voided = receivable("c1", 900, 0, due);
        voided.voided_at = Some(Utc::now());

        let credit = customer_credit(&[
            receivable("c1", 1000, 400, due),
            receivable("c1", 500, 500, due),
            voided,
        ]);
        assert_eq!(credit.total_credit_cents, 1500);
        assert_eq!(credit.outstanding_cents, 900);
        assert_eq!(credit.paid_cents, 600);
    }
}
