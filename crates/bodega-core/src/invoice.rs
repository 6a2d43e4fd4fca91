//! # Invoice Building
//!
//! Pure builders that mirror a purchase or sale into invoice form.
//!
//! ```text
//! Purchase p-123 (CONFIRMADA) ──► Invoice FC-p-123  kind PURCHASE, supplier
//! Sale 000042    (PAGADA)     ──► Invoice FV-000042 kind SALE, customer,
//!                                                   payment metadata
//! ```
//!
//! The invoice number is the idempotency key: bodega-db only inserts the
//! invoice (and its lines) when no invoice with that number exists.

use crate::money::Money;
use crate::types::{InvoiceKind, PaymentMethod, Purchase, PurchaseLine, Sale, SaleLine};
use crate::validation::ValidationResult;

/// `FC-{purchaseId}`
pub fn purchase_invoice_number(purchase_id: &str) -> String {
    format!("FC-{}", purchase_id)
}

/// `FV-{saleNumber}`
pub fn sale_invoice_number(sale_number: &str) -> String {
    format!("FV-{}", sale_number)
}

/// Invoice header ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub kind: InvoiceKind,
    pub number: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub cash_received: Option<Money>,
    pub change: Option<Money>,
    pub created_by: Option<String>,
}

/// Invoice line ready to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoiceLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
    pub tax: Money,
    pub total: Money,
}

/// Mirrors a confirmed purchase. Line tax uses the purchase rate; the
/// header copies the purchase totals as stored.
pub fn invoice_from_purchase(
    purchase: &Purchase,
    lines: &[PurchaseLine],
) -> ValidationResult<(NewInvoice, Vec<NewInvoiceLine>)> {
    let header = NewInvoice {
        kind: InvoiceKind::Purchase,
        number: purchase_invoice_number(&purchase.id),
        sale_id: None,
        purchase_id: Some(purchase.id.clone()),
        customer_id: None,
        supplier_id: purchase.supplier_id.clone(),
        subtotal: Money::from_cents(purchase.subtotal_cents),
        tax: Money::from_cents(purchase.tax_cents),
        total: Money::from_cents(purchase.total_cents),
        payment_method: None,
        payment_reference: None,
        cash_received: None,
        change: None,
        created_by: purchase.created_by.clone(),
    };

    let rate = purchase.tax_rate();
    let lines = lines
        .iter()
        .map(|line| {
            let subtotal = line.line_subtotal()?;
            let tax = subtotal.calculate_tax(rate)?;
            Ok(NewInvoiceLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price: line.unit_cost(),
                subtotal,
                tax,
                total: subtotal.checked_add(tax)?,
            })
        })
        .collect::<ValidationResult<Vec<_>>>()?;

    Ok((header, lines))
}

/// Mirrors a paid sale, including its payment metadata.
pub fn invoice_from_sale(sale: &Sale, lines: &[SaleLine]) -> (NewInvoice, Vec<NewInvoiceLine>) {
    let header = NewInvoice {
        kind: InvoiceKind::Sale,
        number: sale_invoice_number(&sale.number),
        sale_id: Some(sale.id.clone()),
        purchase_id: None,
        customer_id: sale.customer_id.clone(),
        supplier_id: None,
        subtotal: Money::from_cents(sale.subtotal_cents),
        tax: Money::from_cents(sale.tax_cents),
        total: Money::from_cents(sale.total_cents),
        payment_method: Some(sale.payment_method),
        payment_reference: sale.payment_reference.clone(),
        cash_received: Some(Money::from_cents(sale.cash_received_cents)),
        change: Some(Money::from_cents(sale.change_cents)),
        created_by: sale.cashier_id.clone().or_else(|| sale.created_by.clone()),
    };

    let lines = lines
        .iter()
        .map(|line| NewInvoiceLine {
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price(),
            subtotal: Money::from_cents(line.subtotal_cents),
            tax: Money::from_cents(line.tax_cents),
            total: Money::from_cents(line.total_cents),
        })
        .collect();

    (header, lines)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PurchaseStatus, SaleChannel, SaleStatus};
    use chrono::Utc;

    #[test]
    fn test_numbers() {
        assert_eq!(purchase_invoice_number("abc"), "FC-abc");
        assert_eq!(sale_invoice_number("000042"), "FV-000042");
    }

    #[test]
    fn test_invoice_from_purchase() {
        let purchase = Purchase {
            id: "p1".to_string(),
            supplier_id: Some("sup".to_string()),
            purchase_date: Utc::now().date_naive(),
            status: PurchaseStatus::Confirmed,
            tax_rate_bps: 1500,
            subtotal_cents: 11000,
            tax_cents: 1650,
            total_cents: 12650,
            created_by: Some("ana".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let lines = vec![PurchaseLine {
            id: "l1".to_string(),
            purchase_id: "p1".to_string(),
            product_id: "x".to_string(),
            quantity: 5,
            unit_cost_cents: 1000,
        }];

        let (header, lines) = invoice_from_purchase(&purchase, &lines).unwrap();
        assert_eq!(header.number, "FC-p1");
        assert_eq!(header.kind, InvoiceKind::Purchase);
        assert_eq!(header.supplier_id.as_deref(), Some("sup"));
        assert_eq!(header.total.cents(), 12650);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].subtotal.cents(), 5000);
        assert_eq!(lines[0].tax.cents(), 750);
        assert_eq!(lines[0].total.cents(), 5750);
    }

    #[test]
    fn test_invoice_from_sale_copies_payment_metadata() {
        let sale = Sale {
            id: "s1".to_string(),
            number: "000007".to_string(),
            customer_id: Some("c1".to_string()),
            cashier_id: Some("cajero".to_string()),
            created_by: Some("admin".to_string()),
            channel: SaleChannel::Pos,
            status: SaleStatus::Paid,
            payment_method: PaymentMethod::Cash,
            subtotal_cents: 1000,
            tax_cents: 150,
            discount_cents: 0,
            total_cents: 1150,
            cash_received_cents: 2000,
            change_cents: 850,
            payment_reference: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: Some(Utc::now()),
        };

        let (header, lines) = invoice_from_sale(&sale, &[]);
        assert_eq!(header.number, "FV-000007");
        assert_eq!(header.payment_method, Some(PaymentMethod::Cash));
        assert_eq!(header.change.map(|c| c.cents()), Some(850));
        assert_eq!(header.created_by.as_deref(), Some("cajero"));
        assert!(lines.is_empty());
    }
}
