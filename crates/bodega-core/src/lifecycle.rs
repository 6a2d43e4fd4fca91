//! # Document Lifecycles
//!
//! Status guards for purchases and sales, and the payment rules checked
//! when a sale is completed.
//!
//! ## Sale Completion Checks (in order)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  complete(sale, payment)                                                │
//! │       │                                                                 │
//! │       ├── status != BORRADOR        → InvalidStatus                    │
//! │       ├── no lines                  → EmptyDocument                    │
//! │       ├── EFECTIVO, received < total → InsufficientPayment             │
//! │       ├── TARJETA/TRANSFERENCIA, no reference → MissingReference       │
//! │       ├── CREDITO, no customer      → MissingCustomer                  │
//! │       └── per line: qty > on hand   → InsufficientStock  (bodega-db)   │
//! │                                                                         │
//! │  Nothing is written until every check passes.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::totals::cash_change;
use crate::types::{PaymentMethod, Purchase, PurchaseStatus, Sale, SaleStatus};

/// Result of a void request. Re-voiding is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum VoidOutcome {
    Voided,
    AlreadyVoided,
}

// =============================================================================
// Purchase
// =============================================================================

/// Lines may only change while the purchase is a draft.
pub fn ensure_purchase_editable(purchase: &Purchase) -> CoreResult<()> {
    if purchase.status != PurchaseStatus::Draft {
        return Err(CoreError::invalid_status(
            "Purchase",
            &purchase.id,
            purchase.status.as_str(),
            "edit lines",
        ));
    }
    Ok(())
}

/// Checks a confirmation request.
///
/// Returns `true` when the status still has to move to CONFIRMADA and
/// `false` when it already is (confirm is idempotent and re-materializes
/// whatever is missing).
pub fn check_purchase_confirm(purchase: &Purchase, line_count: usize) -> CoreResult<bool> {
    match purchase.status {
        PurchaseStatus::Voided => Err(CoreError::invalid_status(
            "Purchase",
            &purchase.id,
            purchase.status.as_str(),
            "confirm",
        )),
        _ if line_count == 0 => Err(CoreError::EmptyDocument {
            document: "Purchase".to_string(),
            id: purchase.id.clone(),
        }),
        PurchaseStatus::Draft => Ok(true),
        PurchaseStatus::Confirmed => Ok(false),
    }
}

/// What a void request has to do for a purchase in a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseVoidPlan {
    /// Already ANULADA; nothing to do.
    AlreadyVoided,
    /// BORRADOR; only the status changes.
    StatusOnly,
    /// CONFIRMADA; stock entries and invoice are reversed too.
    Reverse,
}

pub fn plan_purchase_void(status: PurchaseStatus) -> PurchaseVoidPlan {
    match status {
        PurchaseStatus::Voided => PurchaseVoidPlan::AlreadyVoided,
        PurchaseStatus::Draft => PurchaseVoidPlan::StatusOnly,
        PurchaseStatus::Confirmed => PurchaseVoidPlan::Reverse,
    }
}

// =============================================================================
// Sale
// =============================================================================

/// Requires the sale to be in `expected` status before `operation`.
pub fn ensure_sale_status(sale: &Sale, expected: SaleStatus, operation: &str) -> CoreResult<()> {
    if sale.status != expected {
        return Err(CoreError::invalid_status(
            "Sale",
            &sale.id,
            sale.status.as_str(),
            operation,
        ));
    }
    Ok(())
}

/// Lines may only change while the sale is a draft.
#[inline]
pub fn ensure_sale_editable(sale: &Sale) -> CoreResult<()> {
    ensure_sale_status(sale, SaleStatus::Draft, "edit lines")
}

/// Payment details supplied when completing a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInput {
    pub method: PaymentMethod,
    pub cash_received: Money,
    pub reference: Option<String>,
    pub customer_id: Option<String>,
}

impl PaymentInput {
    pub fn cash(received: Money) -> Self {
        PaymentInput {
            method: PaymentMethod::Cash,
            cash_received: received,
            reference: None,
            customer_id: None,
        }
    }

    pub fn card(reference: impl Into<String>) -> Self {
        PaymentInput {
            method: PaymentMethod::Card,
            cash_received: Money::zero(),
            reference: Some(reference.into()),
            customer_id: None,
        }
    }

    pub fn transfer(reference: impl Into<String>) -> Self {
        PaymentInput {
            method: PaymentMethod::Transfer,
            ..PaymentInput::card(reference)
        }
    }

    pub fn credit(customer_id: impl Into<String>) -> Self {
        PaymentInput {
            method: PaymentMethod::Credit,
            cash_received: Money::zero(),
            reference: None,
            customer_id: Some(customer_id.into()),
        }
    }

    /// Reference with surrounding whitespace removed; blank counts as absent.
    pub fn trimmed_reference(&self) -> Option<String> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }
}

/// Payment fields as they will be persisted on the sale and invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledPayment {
    pub method: PaymentMethod,
    pub cash_received: Money,
    pub change: Money,
    pub reference: Option<String>,
    pub customer_id: Option<String>,
}

/// Applies the per-method payment rules against the sale total.
///
/// `customer_id` is the customer already resolved by the caller (payment
/// input first, then the one on the sale) and known to exist.
pub fn settle_payment(
    total: Money,
    input: &PaymentInput,
    customer_id: Option<&str>,
) -> CoreResult<SettledPayment> {
    let reference = input.trimmed_reference();

    let (cash_received, change) = match input.method {
        PaymentMethod::Cash => {
            if input.cash_received < total {
                return Err(CoreError::InsufficientPayment {
                    total_cents: total.cents(),
                    received_cents: input.cash_received.cents(),
                });
            }
            (input.cash_received, cash_change(total, input.cash_received))
        }
        PaymentMethod::Card | PaymentMethod::Transfer => {
            if reference.is_none() {
                return Err(CoreError::MissingReference {
                    method: input.method.as_str().to_string(),
                });
            }
            (Money::zero(), Money::zero())
        }
        PaymentMethod::Credit => {
            if customer_id.is_none() {
                return Err(CoreError::MissingCustomer);
            }
            (Money::zero(), Money::zero())
        }
    };

    Ok(SettledPayment {
        method: input.method,
        cash_received,
        change,
        reference,
        customer_id: customer_id.map(str::to_string),
    })
}

/// Next six-digit sale number after the highest one issued.
///
/// ## Example
/// ```rust
/// use bodega_core::lifecycle::next_sale_number;
///
/// assert_eq!(next_sale_number(None), "000001");
/// assert_eq!(next_sale_number(Some("000041")), "000042");
/// ```
pub fn next_sale_number(last: Option<&str>) -> String {
    let next = last
        .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        .and_then(|n| n.parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{:06}", next)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleChannel;
    use chrono::Utc;

    fn purchase(status: PurchaseStatus) -> Purchase {
        Purchase {
            id: "p1".to_string(),
            supplier_id: None,
            purchase_date: Utc::now().date_naive(),
            status,
            tax_rate_bps: 1500,
            subtotal_cents: 0,
            tax_cents: 0,
            total_cents: 0,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sale(status: SaleStatus) -> Sale {
        Sale {
            id: "s1".to_string(),
            number: "000001".to_string(),
            customer_id: None,
            cashier_id: None,
            created_by: None,
            channel: SaleChannel::Pos,
            status,
            payment_method: PaymentMethod::Cash,
            subtotal_cents: 0,
            tax_cents: 0,
            discount_cents: 0,
            total_cents: 0,
            cash_received_cents: 0,
            change_cents: 0,
            payment_reference: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_purchase_editable_only_as_draft() {
        assert!(ensure_purchase_editable(&purchase(PurchaseStatus::Draft)).is_ok());
        assert!(ensure_purchase_editable(&purchase(PurchaseStatus::Confirmed)).is_err());
        assert!(ensure_purchase_editable(&purchase(PurchaseStatus::Voided)).is_err());
    }

    #[test]
    fn test_check_purchase_confirm() {
        assert!(check_purchase_confirm(&purchase(PurchaseStatus::Draft), 2).unwrap());
        assert!(!check_purchase_confirm(&purchase(PurchaseStatus::Confirmed), 2).unwrap());

        let err = check_purchase_confirm(&purchase(PurchaseStatus::Voided), 2).unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatus { .. }));

        let err = check_purchase_confirm(&purchase(PurchaseStatus::Draft), 0).unwrap_err();
        assert!(matches!(err, CoreError::EmptyDocument { .. }));
    }

    #[test]
    fn test_plan_purchase_void() {
        assert_eq!(plan_purchase_void(PurchaseStatus::Voided), PurchaseVoidPlan::AlreadyVoided);
        assert_eq!(plan_purchase_void(PurchaseStatus::Draft), PurchaseVoidPlan::StatusOnly);
        assert_eq!(plan_purchase_void(PurchaseStatus::Confirmed), PurchaseVoidPlan::Reverse);
    }

    #[test]
    fn test_sale_status_guards() {
        assert!(ensure_sale_editable(&sale(SaleStatus::Draft)).is_ok());

        let err = ensure_sale_editable(&sale(SaleStatus::Paid)).unwrap_err();
        assert_eq!(err.to_string(), "Sale s1 is PAGADA, cannot edit lines");

        assert!(ensure_sale_status(&sale(SaleStatus::Paid), SaleStatus::Paid, "void").is_ok());
    }

    #[test]
    fn test_cash_payment() {
        let total = Money::from_cents(12650);

        let settled = settle_payment(total, &PaymentInput::cash(Money::from_cents(20000)), None).unwrap();
        assert_eq!(settled.change.cents(), 7350);
        assert_eq!(settled.cash_received.cents(), 20000);

        let err = settle_payment(total, &PaymentInput::cash(Money::from_cents(10000)), None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientPayment { total_cents: 12650, received_cents: 10000 }
        ));
    }

    #[test]
    fn test_reference_required_for_card_and_transfer() {
        let total = Money::from_cents(1000);

        let err = settle_payment(total, &PaymentInput::card("   "), None).unwrap_err();
        assert!(matches!(err, CoreError::MissingReference { .. }));

        let err = settle_payment(total, &PaymentInput::transfer(""), None).unwrap_err();
        assert!(matches!(err, CoreError::MissingReference { .. }));

        let ok = settle_payment(total, &PaymentInput::card(" AUTH-991 "), None).unwrap();
        assert_eq!(ok.reference.as_deref(), Some("AUTH-991"));
        assert_eq!(ok.change, Money::zero());
    }

    #[test]
    fn test_credit_requires_customer() {
        let total = Money::from_cents(1000);
        let input = PaymentInput::credit("c1");

        let err = settle_payment(total, &input, None).unwrap_err();
        assert!(matches!(err, CoreError::MissingCustomer));

        let ok = settle_payment(total, &input, Some("c1")).unwrap();
        assert_eq!(ok.customer_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_next_sale_number() {
        assert_eq!(next_sale_number(None), "000001");
        assert_eq!(next_sale_number(Some("000001")), "000002");
        assert_eq!(next_sale_number(Some("000999")), "001000");
        assert_eq!(next_sale_number(Some("999999")), "1000000");
        assert_eq!(next_sale_number(Some("WEB-12")), "000001");
    }
}
