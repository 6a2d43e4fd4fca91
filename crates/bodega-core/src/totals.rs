//! # Document Totals
//!
//! Full-recompute totals for purchases and sales.
//!
//! ```text
//! Purchase                               Sale line
//! ────────                               ─────────
//! subtotal = Σ qty × unit_cost           gross    = qty × unit_price
//! tax      = round(subtotal × rate)      discount = round(gross × discount%)
//! total    = subtotal + tax              subtotal = gross − discount
//!                                        tax      = round(subtotal × product tax)
//!                                        total    = subtotal + tax
//!
//!                                        Sale = Σ of every line field
//! ```
//!
//! Totals are never patched incrementally: every line edit re-reads all
//! lines and calls one of these functions. Arithmetic is checked, so an
//! absurd line fails with `ValidationError::TooLarge` instead of wrapping.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{PurchaseLine, SaleLine, TaxRate};
use crate::validation::ValidationResult;

/// Header totals of a purchase or sale, in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DocumentTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl DocumentTotals {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Recomputes purchase totals from all of its lines.
///
/// ## Example
/// ```rust
/// use bodega_core::totals::purchase_totals;
/// use bodega_core::types::{PurchaseLine, TaxRate};
///
/// let line = |qty, cost| PurchaseLine {
///     id: String::new(), purchase_id: String::new(), product_id: String::new(),
///     quantity: qty, unit_cost_cents: cost,
/// };
/// let totals = purchase_totals(&[line(5, 1000), line(3, 2000)], TaxRate::STANDARD).unwrap();
/// assert_eq!(totals.subtotal_cents, 11000);
/// assert_eq!(totals.tax_cents, 1650);
/// assert_eq!(totals.total_cents, 12650);
/// ```
pub fn purchase_totals(lines: &[PurchaseLine], rate: TaxRate) -> ValidationResult<DocumentTotals> {
    let subtotal = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| -> ValidationResult<Money> {
            acc.checked_add(line.line_subtotal()?)
        })?;
    let tax = subtotal.calculate_tax(rate)?;

    Ok(DocumentTotals {
        subtotal_cents: subtotal.cents(),
        tax_cents: tax.cents(),
        discount_cents: 0,
        total_cents: subtotal.checked_add(tax)?.cents(),
    })
}

/// Computed amounts of one sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmounts {
    pub gross: Money,
    pub discount: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Computes a sale line: discount on gross, tax on the discounted subtotal.
pub fn sale_line_amounts(
    quantity: i64,
    unit_price: Money,
    discount_bps: u32,
    tax_rate: TaxRate,
) -> ValidationResult<LineAmounts> {
    let gross = unit_price.multiply_quantity(quantity)?;
    let discount = gross.percentage(discount_bps)?;
    let subtotal = gross - discount;
    let tax = subtotal.calculate_tax(tax_rate)?;

    Ok(LineAmounts {
        gross,
        discount,
        subtotal,
        tax,
        total: subtotal.checked_add(tax)?,
    })
}

/// Re-sums a sale from its stored lines.
pub fn sale_totals(lines: &[SaleLine]) -> ValidationResult<DocumentTotals> {
    lines.iter().try_fold(DocumentTotals::default(), |acc, line| {
        let discount = line.gross()? - Money::from_cents(line.subtotal_cents);
        Ok(DocumentTotals {
            subtotal_cents: acc.subtotal().checked_add(Money::from_cents(line.subtotal_cents))?.cents(),
            tax_cents: Money::from_cents(acc.tax_cents).checked_add(Money::from_cents(line.tax_cents))?.cents(),
            discount_cents: Money::from_cents(acc.discount_cents).checked_add(discount)?.cents(),
            total_cents: acc.total().checked_add(Money::from_cents(line.total_cents))?.cents(),
        })
    })
}

/// Change handed back for a cash payment: `max(0, received − total)`.
#[inline]
pub fn cash_change(total: Money, received: Money) -> Money {
    (received - total).floor_zero()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;

    fn purchase_line(quantity: i64, unit_cost_cents: i64) -> PurchaseLine {
        PurchaseLine {
            id: String::new(),
            purchase_id: String::new(),
            product_id: String::new(),
            quantity,
            unit_cost_cents,
        }
    }

    fn sale_line(quantity: i64, price: i64, discount_bps: u32, tax: u32) -> SaleLine {
        let amounts = sale_line_amounts(
            quantity,
            Money::from_cents(price),
            discount_bps,
            TaxRate::from_bps(tax),
        )
        .unwrap();
        SaleLine {
            id: String::new(),
            sale_id: String::new(),
            product_id: String::new(),
            quantity,
            unit_price_cents: price,
            discount_bps,
            subtotal_cents: amounts.subtotal.cents(),
            tax_cents: amounts.tax.cents(),
            total_cents: amounts.total.cents(),
        }
    }

    #[test]
    fn test_purchase_totals_example() {
        let lines = vec![purchase_line(5, 1000), purchase_line(3, 2000)];
        let totals = purchase_totals(&lines, TaxRate::from_bps(1500)).unwrap();
        assert_eq!(totals.subtotal_cents, 11000);
        assert_eq!(totals.tax_cents, 1650);
        assert_eq!(totals.total_cents, 12650);
    }

    #[test]
    fn test_purchase_totals_empty_is_zero() {
        let totals = purchase_totals(&[], TaxRate::STANDARD).unwrap();
        assert_eq!(totals, DocumentTotals::default());
    }

    #[test]
    fn test_sale_line_with_discount_and_tax() {
        // 2 × 50.00 = 100.00, 10% off = 90.00, 15% tax = 13.50
        let amounts = sale_line_amounts(2, Money::from_cents(5000), 1000, TaxRate::STANDARD).unwrap();
        assert_eq!(amounts.gross.cents(), 10000);
        assert_eq!(amounts.discount.cents(), 1000);
        assert_eq!(amounts.subtotal.cents(), 9000);
        assert_eq!(amounts.tax.cents(), 1350);
        assert_eq!(amounts.total.cents(), 10350);
    }

    #[test]
    fn test_sale_line_exempt_product() {
        let amounts = sale_line_amounts(3, Money::from_cents(1999), 0, TaxRate::zero()).unwrap();
        assert_eq!(amounts.subtotal.cents(), 5997);
        assert_eq!(amounts.tax.cents(), 0);
        assert_eq!(amounts.total.cents(), 5997);
    }

    #[test]
    fn test_sale_totals_sum_lines() {
        let lines = vec![sale_line(2, 5000, 1000, 1500), sale_line(1, 2000, 0, 0)];
        let totals = sale_totals(&lines).unwrap();
        assert_eq!(totals.subtotal_cents, 11000);
        assert_eq!(totals.tax_cents, 1350);
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.total_cents, 12350);
    }

    #[test]
    fn test_oversized_lines_fail_instead_of_wrapping() {
        let result = sale_line_amounts(i64::MAX / 1000, Money::from_cents(2500), 0, TaxRate::STANDARD);
        assert!(matches!(result, Err(ValidationError::TooLarge { .. })));

        let lines = vec![purchase_line(i64::MAX / 2, 3)];
        assert!(purchase_totals(&lines, TaxRate::STANDARD).is_err());

        let huge = vec![purchase_line(1, i64::MAX), purchase_line(1, 1)];
        assert!(purchase_totals(&huge, TaxRate::zero()).is_err());
    }

    #[test]
    fn test_cash_change() {
        assert_eq!(cash_change(Money::from_cents(12650), Money::from_cents(20000)).cents(), 7350);
        assert_eq!(cash_change(Money::from_cents(500), Money::from_cents(500)), Money::zero());
        assert_eq!(cash_change(Money::from_cents(500), Money::zero()), Money::zero());
    }
}
