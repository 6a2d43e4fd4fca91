//! # Wire DTOs
//!
//! Request and reply shapes exchanged with the POS widgets. Field names on
//! the wire are the Spanish keys the widgets already send.
//!
//! ## Checkout Body
//! ```text
//! {
//!   "lineas":  [{ "id": "<productId>", "cantidad": 2 }],   // or "2"
//!   "pago":    "200.00",          // or 200, or 200.5
//!   "metodo":  "EFECTIVO",
//!   "ref":     "",                // card / transfer reference
//!   "cliente": "<customerId>"     // required for CREDITO
//! }
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::lifecycle::PaymentInput;
use crate::money::Money;
use crate::types::{Invoice, PaymentMethod, Receivable, Sale};

/// One line of a checkout body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutLine {
    #[serde(rename = "id")]
    pub product_id: String,
    #[serde(rename = "cantidad", deserialize_with = "deserialize_quantity")]
    #[ts(type = "string | number")]
    pub quantity: i64,
}

/// Body of the POS checkout call: replace the draft's lines and pay.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(export)]
pub struct CheckoutRequest {
    #[serde(rename = "lineas")]
    pub lines: Vec<CheckoutLine>,

    #[serde(rename = "pago", default, deserialize_with = "deserialize_amount")]
    #[ts(type = "string | number")]
    pub paid: Money,

    #[serde(rename = "metodo")]
    pub method: PaymentMethod,

    #[serde(rename = "ref", default)]
    pub reference: Option<String>,

    #[serde(rename = "cliente", default)]
    pub customer_id: Option<String>,
}

impl CheckoutRequest {
    /// Payment half of the request.
    pub fn payment(&self) -> PaymentInput {
        PaymentInput {
            method: self.method,
            cash_received: self.paid,
            reference: self.reference.clone(),
            customer_id: self.customer_id.clone().filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Accepts amounts as JSON strings (`"126.50"`) or numbers (`126.5`).
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(serde_json::Number),
    }

    let text = match Amount::deserialize(deserializer)? {
        Amount::Text(s) => s,
        Amount::Number(n) => n.to_string(),
    };
    text.parse::<Money>().map_err(serde::de::Error::custom)
}

/// Accepts whole quantities as JSON numbers (`2`) or strings (`"2"`,
/// `"2.00"`). Fractional units are rejected.
fn deserialize_quantity<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Number(i64),
        Text(String),
    }

    let text = match Quantity::deserialize(deserializer)? {
        Quantity::Number(n) => return Ok(n),
        Quantity::Text(s) => s,
    };

    let invalid = || -> D::Error {
        serde::de::Error::custom(format!("cantidad must be a whole number, got {:?}", text))
    };
    let trimmed = text.trim();
    let whole = match trimmed.split_once('.') {
        Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
        Some(_) => return Err(invalid()),
        None => trimmed,
    };
    whole.parse::<i64>().map_err(|_| invalid())
}

/// Everything a completed sale produced.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub invoice: Invoice,
    pub receivable: Option<Receivable>,
}

/// Reply sent back to the POS widget after checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CheckoutReply {
    pub ok: bool,
    #[serde(rename = "venta_id")]
    pub sale_id: String,
    #[serde(rename = "venta_num")]
    pub sale_number: String,
    #[serde(rename = "factura")]
    pub invoice_number: String,
    pub total: String,
    #[serde(rename = "cambio")]
    pub change: String,
}

impl From<&SaleReceipt> for CheckoutReply {
    fn from(receipt: &SaleReceipt) -> Self {
        CheckoutReply {
            ok: true,
            sale_id: receipt.sale.id.clone(),
            sale_number: receipt.sale.number.clone(),
            invoice_number: receipt.invoice.number.clone(),
            total: Money::from_cents(receipt.sale.total_cents).to_string(),
            change: Money::from_cents(receipt.sale.change_cents).to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_request_parses_widget_body() {
        let body = r#"{
            "lineas": [{"id": "p1", "cantidad": 2}, {"id": "p2", "cantidad": 1}],
            "pago": "200.00",
            "metodo": "EFECTIVO",
            "ref": ""
        }"#;

        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.lines.len(), 2);
        assert_eq!(req.lines[0].product_id, "p1");
        assert_eq!(req.lines[0].quantity, 2);
        assert_eq!(req.paid.cents(), 20000);
        assert_eq!(req.method, PaymentMethod::Cash);
        assert!(req.customer_id.is_none());
    }

    #[test]
    fn test_checkout_amount_as_number() {
        let body = r#"{"lineas": [], "pago": 126.5, "metodo": "TARJETA", "ref": "AUTH-1"}"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.paid.cents(), 12650);

        let payment = req.payment();
        assert_eq!(payment.method, PaymentMethod::Card);
        assert_eq!(payment.trimmed_reference().as_deref(), Some("AUTH-1"));
    }

    #[test]
    fn test_checkout_missing_amount_defaults_to_zero() {
        let body = r#"{"lineas": [], "metodo": "CREDITO", "cliente": "c1"}"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.paid, Money::zero());
        assert_eq!(req.payment().customer_id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_checkout_quantity_as_string() {
        let body = r#"{
            "lineas": [{"id": "p1", "cantidad": "2"}, {"id": "p2", "cantidad": " 3.00 "}],
            "metodo": "EFECTIVO"
        }"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.lines[0].quantity, 2);
        assert_eq!(req.lines[1].quantity, 3);

        for bad in [r#""2.5""#, r#""dos""#, r#""""#, "2.5"] {
            let body = format!(
                r#"{{"lineas": [{{"id": "p1", "cantidad": {}}}], "metodo": "EFECTIVO"}}"#,
                bad
            );
            assert!(serde_json::from_str::<CheckoutRequest>(&body).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_checkout_rejects_unknown_method() {
        let body = r#"{"lineas": [], "pago": 1, "metodo": "CHEQUE"}"#;
        assert!(serde_json::from_str::<CheckoutRequest>(body).is_err());
    }

    #[test]
    fn test_checkout_blank_customer_is_absent() {
        let body = r#"{"lineas": [], "metodo": "CREDITO", "cliente": " "}"#;
        let req: CheckoutRequest = serde_json::from_str(body).unwrap();
        assert!(req.payment().customer_id.is_none());
    }
}
