//! # Domain Types
//!
//! Core domain types used throughout Bodega.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Reference data        Documents                 Derived / ledger       │
//! │  ──────────────        ─────────                 ────────────────       │
//! │  Supplier              Purchase ─┬─ PurchaseLine  StockMovement (append)│
//! │  Category              Sale ─────┼─ SaleLine      StockBalance (cache)  │
//! │  Customer              Invoice ──┴─ InvoiceLine   Receivable ─ Payment  │
//! │  Product                                                                │
//! │                                                                         │
//! │  Status enums (stored as their Spanish business codes)                  │
//! │  ─────────────────────────────────────────────────────                  │
//! │  MovementKind   ENTRADA │ SALIDA │ AJUSTE_POS │ AJUSTE_NEG              │
//! │  PurchaseStatus BORRADOR │ CONFIRMADA │ ANULADA                         │
//! │  SaleStatus     BORRADOR │ PAGADA │ CANCELADA │ ANULADA                 │
//! │  PaymentMethod  EFECTIVO │ TARJETA │ TRANSFERENCIA │ CREDITO            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists (sale `number`, invoice `number`, barcode)

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::ValidationResult;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 1500 bps = 15% (Honduran ISV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Standard sales tax, 15%.
    pub const STANDARD: TaxRate = TaxRate(1500);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    /// Checks if tax rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::zero()
    }
}

/// Parses a percentage string: `"15"` and `"15.00"` are both 1500 bps.
impl FromStr for TaxRate {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // A percentage with two decimals has the same digits as an amount in cents.
        let hundredths = s.parse::<Money>().map_err(|_| ValidationError::InvalidFormat {
            field: "tax_rate".to_string(),
            reason: format!("'{}' is not a percentage", s.trim()),
        })?;

        u32::try_from(hundredths.cents())
            .map(TaxRate)
            .map_err(|_| ValidationError::OutOfRange {
                field: "tax_rate".to_string(),
                min: 0,
                max: 10000,
            })
    }
}

// =============================================================================
// Status Enums
// =============================================================================

/// Generates `as_str`, `Display` and `FromStr` over the stored business codes.
macro_rules! business_code {
    ($ty:ident, $field:literal, { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            /// The code stored in the database and sent over the wire.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($code => Ok($ty::$variant),)+
                    _ => Err(ValidationError::NotAllowed {
                        field: $field.to_string(),
                        allowed: vec![$($code.to_string()),+],
                    }),
                }
            }
        }
    };
}

/// Kind of stock movement. The sign is derived from the kind, never from
/// the stored quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum MovementKind {
    /// Goods in (purchase confirmation, sale void).
    #[serde(rename = "ENTRADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ENTRADA"))]
    Inbound,
    /// Goods out (sale completion, purchase void).
    #[serde(rename = "SALIDA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SALIDA"))]
    Outbound,
    /// Manual upward correction.
    #[serde(rename = "AJUSTE_POS")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AJUSTE_POS"))]
    AdjustUp,
    /// Manual downward correction.
    #[serde(rename = "AJUSTE_NEG")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "AJUSTE_NEG"))]
    AdjustDown,
}

business_code!(MovementKind, "kind", {
    Inbound => "ENTRADA",
    Outbound => "SALIDA",
    AdjustUp => "AJUSTE_POS",
    AdjustDown => "AJUSTE_NEG",
});

/// Purchase lifecycle.
///
/// ```text
/// BORRADOR ──confirm──► CONFIRMADA
///    │                      │
///    └───────void───────────┴──void──► ANULADA (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PurchaseStatus {
    #[serde(rename = "BORRADOR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BORRADOR"))]
    Draft,
    #[serde(rename = "CONFIRMADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CONFIRMADA"))]
    Confirmed,
    #[serde(rename = "ANULADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ANULADA"))]
    Voided,
}

business_code!(PurchaseStatus, "status", {
    Draft => "BORRADOR",
    Confirmed => "CONFIRMADA",
    Voided => "ANULADA",
});

impl Default for PurchaseStatus {
    fn default() -> Self {
        PurchaseStatus::Draft
    }
}

/// Sale lifecycle.
///
/// ```text
/// BORRADOR ──complete──► PAGADA ──void──► ANULADA
///    │
///    └──cancel──► CANCELADA
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SaleStatus {
    #[serde(rename = "BORRADOR")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "BORRADOR"))]
    Draft,
    #[serde(rename = "PAGADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "PAGADA"))]
    Paid,
    #[serde(rename = "CANCELADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CANCELADA"))]
    Cancelled,
    #[serde(rename = "ANULADA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "ANULADA"))]
    Voided,
}

business_code!(SaleStatus, "status", {
    Draft => "BORRADOR",
    Paid => "PAGADA",
    Cancelled => "CANCELADA",
    Voided => "ANULADA",
});

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Draft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMethod {
    /// Cash; requires `cash_received >= total`.
    #[serde(rename = "EFECTIVO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "EFECTIVO"))]
    Cash,
    /// Card on an external terminal; requires a reference.
    #[serde(rename = "TARJETA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TARJETA"))]
    Card,
    /// Bank transfer; requires a reference.
    #[serde(rename = "TRANSFERENCIA")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "TRANSFERENCIA"))]
    Transfer,
    /// Store credit; requires a customer and opens a receivable.
    #[serde(rename = "CREDITO")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "CREDITO"))]
    Credit,
}

business_code!(PaymentMethod, "payment_method", {
    Cash => "EFECTIVO",
    Card => "TARJETA",
    Transfer => "TRANSFERENCIA",
    Credit => "CREDITO",
});

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum SaleChannel {
    #[serde(rename = "POS")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "POS"))]
    Pos,
    #[serde(rename = "WEB")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "WEB"))]
    Web,
}

business_code!(SaleChannel, "channel", {
    Pos => "POS",
    Web => "WEB",
});

impl Default for SaleChannel {
    fn default() -> Self {
        SaleChannel::Pos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum InvoiceKind {
    #[serde(rename = "SALE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "SALE"))]
    Sale,
    #[serde(rename = "PURCHASE")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "PURCHASE"))]
    Purchase,
}

business_code!(InvoiceKind, "kind", {
    Sale => "SALE",
    Purchase => "PURCHASE",
});

/// Computed receivable state. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AgingStatus {
    #[serde(rename = "VIGENTE")]
    Current,
    #[serde(rename = "VENCIDA")]
    Overdue,
    #[serde(rename = "PAGADA")]
    Settled,
    #[serde(rename = "ANULADA")]
    Voided,
}

business_code!(AgingStatus, "aging", {
    Current => "VIGENTE",
    Overdue => "VENCIDA",
    Settled => "PAGADA",
    Voided => "ANULADA",
});

// =============================================================================
// Reference Data
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    /// Honduran tax id, 14 digits.
    pub rtn: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Walk-in customer created on the fly by the POS.
    pub is_guest: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on invoices.
    pub name: String,

    /// Numeric barcode, 8-50 digits. Unique when present.
    pub barcode: Option<String>,

    pub supplier_id: Option<String>,

    pub category_id: Option<String>,

    /// Sale price in cents.
    pub sale_price_cents: i64,

    /// Average cost in cents. Fallback unit cost for purchase lines.
    pub average_cost_cents: i64,

    /// Reorder threshold in units.
    pub min_stock: i64,

    /// Tax rate in basis points, 0-1500.
    pub tax_rate_bps: u32,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the sale price as a Money type.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn average_cost(&self) -> Money {
        Money::from_cents(self.average_cost_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Stock Ledger
// =============================================================================

/// One immutable ledger entry. `quantity` is always a magnitude.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    /// Source tag, e.g. `PURCHASE:{id}:{line}` or `SALE-000042`.
    pub reference: String,
    pub reason: String,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Cached on-hand quantity, one row per product.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockBalance {
    pub product_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Stock report row: an active product with its balance and reorder point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockLevel {
    pub product_id: String,
    pub name: String,
    pub barcode: Option<String>,
    pub quantity: i64,
    pub min_stock: i64,
}

impl StockLevel {
    #[inline]
    pub fn is_low(&self) -> bool {
        self.quantity < self.min_stock
    }
}

/// A cached balance that disagreed with its movements during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BalanceDrift {
    pub product_id: String,
    pub cached: i64,
    pub recomputed: i64,
}

// =============================================================================
// Purchase
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: Option<String>,
    #[ts(as = "String")]
    pub purchase_date: NaiveDate,
    pub status: PurchaseStatus,
    pub tax_rate_bps: u32,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseLine {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

impl PurchaseLine {
    #[inline]
    pub fn unit_cost(&self) -> Money {
        Money::from_cents(self.unit_cost_cents)
    }

    /// quantity × unit cost, before tax.
    #[inline]
    pub fn line_subtotal(&self) -> ValidationResult<Money> {
        self.unit_cost().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Six-digit business number, `000001` onwards.
    pub number: String,
    pub customer_id: Option<String>,
    pub cashier_id: Option<String>,
    pub created_by: Option<String>,
    pub channel: SaleChannel,
    pub status: SaleStatus,
    pub payment_method: PaymentMethod,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub cash_received_cents: i64,
    pub change_cents: i64,
    pub payment_reference: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale line with its computed amounts frozen at edit time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Discount as basis points of the gross amount.
    pub discount_bps: u32,
    /// Gross minus discount.
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

impl SaleLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price, before discount.
    #[inline]
    pub fn gross(&self) -> ValidationResult<Money> {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Invoice
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub kind: InvoiceKind,
    /// `FV-{saleNumber}` or `FC-{purchaseId}`.
    pub number: String,
    pub sale_id: Option<String>,
    pub purchase_id: Option<String>,
    pub customer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub cash_received_cents: Option<i64>,
    pub change_cents: Option<i64>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub issued_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Invoice {
    #[inline]
    pub fn is_voided(&self) -> bool {
        self.voided_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

// =============================================================================
// Accounts Receivable
// =============================================================================

/// Credit owed by a customer for one credit sale.
///
/// Invariant: `0 <= outstanding_cents <= total_cents`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Receivable {
    pub id: String,
    pub sale_id: String,
    pub customer_id: String,
    pub total_cents: i64,
    pub outstanding_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
}

impl Receivable {
    #[inline]
    pub fn outstanding(&self) -> Money {
        Money::from_cents(self.outstanding_cents)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Amount already collected.
    #[inline]
    pub fn paid(&self) -> Money {
        self.total() - self.outstanding()
    }
}

/// A payment applied to a receivable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReceivablePayment {
    pub id: String,
    pub receivable_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub paid_on: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1500);
        assert_eq!(rate.bps(), 1500);
        assert!((rate.percentage() - 15.0).abs() < 0.001);
        assert_eq!(rate, TaxRate::STANDARD);
    }

    #[test]
    fn test_tax_rate_parses_percent() {
        assert_eq!("15".parse::<TaxRate>().unwrap().bps(), 1500);
        assert_eq!("12.5".parse::<TaxRate>().unwrap().bps(), 1250);
        assert_eq!("0".parse::<TaxRate>().unwrap().bps(), 0);
        assert!("-1".parse::<TaxRate>().is_err());
        assert!("quince".parse::<TaxRate>().is_err());
    }

    #[test]
    fn test_business_codes_round_trip_through_str() {
        assert_eq!(MovementKind::AdjustDown.as_str(), "AJUSTE_NEG");
        assert_eq!("SALIDA".parse::<MovementKind>().unwrap(), MovementKind::Outbound);
        assert_eq!(SaleStatus::Cancelled.to_string(), "CANCELADA");
        assert_eq!("CREDITO".parse::<PaymentMethod>().unwrap(), PaymentMethod::Credit);
        assert!("CHEQUE".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_serde_uses_business_codes() {
        let json = serde_json::to_string(&PurchaseStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMADA\"");

        let method: PaymentMethod = serde_json::from_str("\"TRANSFERENCIA\"").unwrap();
        assert_eq!(method, PaymentMethod::Transfer);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SaleStatus::default(), SaleStatus::Draft);
        assert_eq!(PurchaseStatus::default(), PurchaseStatus::Draft);
        assert_eq!(SaleChannel::default(), SaleChannel::Pos);
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }

    #[test]
    fn test_line_helpers() {
        let line = PurchaseLine {
            id: "l".into(),
            purchase_id: "p".into(),
            product_id: "x".into(),
            quantity: 5,
            unit_cost_cents: 1000,
        };
        assert_eq!(line.line_subtotal().unwrap().cents(), 5000);
    }
}
