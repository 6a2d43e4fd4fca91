//! # Stock Ledger
//!
//! Pure rules of the append-only stock ledger.
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  stock_movements (append-only)            stock_balances (cache)        │
//! │  ─────────────────────────────            ──────────────────────        │
//! │  ENTRADA     +10  PURCHASE:p1:l1                                        │
//! │  SALIDA       -3  SALE-000001       ──►   quantity = Σ signed = 6       │
//! │  AJUSTE_NEG   -1  ADJUST                                                │
//! │                                                                         │
//! │  Quantities are stored as magnitudes. The sign comes from the kind.     │
//! │  After every insert/delete the balance is recomputed from scratch.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reference Tags
//! Every movement created by a document carries a reference that makes
//! materialization idempotent:
//!
//! | Source                 | Kind    | Reference                          |
//! |------------------------|---------|------------------------------------|
//! | Purchase confirmation  | ENTRADA | `PURCHASE:{purchaseId}:{lineId}`   |
//! | Purchase void          | SALIDA  | `PURCHASE-VOID:{purchaseId}:{lineId}` |
//! | Sale completion        | SALIDA  | `SALE-{number}`                    |
//! | Sale void              | ENTRADA | `SALE-VOID-{number}`               |

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MovementKind, StockMovement};
use crate::validation::validate_reason;

// =============================================================================
// Sign Rules
// =============================================================================

impl MovementKind {
    /// `+1` for kinds that add stock, `-1` for kinds that remove it.
    #[inline]
    pub const fn sign(&self) -> i64 {
        match self {
            MovementKind::Inbound | MovementKind::AdjustUp => 1,
            MovementKind::Outbound | MovementKind::AdjustDown => -1,
        }
    }
}

/// Applies the kind's sign to a stored magnitude.
///
/// The stored value is treated as a magnitude even if a negative value
/// slipped in through legacy data.
#[inline]
pub fn signed_quantity(kind: MovementKind, quantity: i64) -> i64 {
    kind.sign() * quantity.abs()
}

/// Balance implied by a set of movements: `Σ signed(quantity)`.
///
/// ## Example
/// ```rust
/// use bodega_core::ledger::balance_of;
/// let empty: Vec<bodega_core::StockMovement> = Vec::new();
/// assert_eq!(balance_of(&empty), 0);
/// ```
pub fn balance_of(movements: &[StockMovement]) -> i64 {
    movements
        .iter()
        .map(|m| signed_quantity(m.kind, m.quantity))
        .sum()
}

// =============================================================================
// New Movement
// =============================================================================

/// A validated movement ready to be appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub product_id: String,
    pub kind: MovementKind,
    pub quantity: i64,
    pub unit_cost: Money,
    pub reference: String,
    pub reason: String,
    pub user_id: Option<String>,
}

impl NewMovement {
    /// Builds a movement, rejecting negative quantities and costs.
    ///
    /// Direction is expressed by `kind`, so a negative quantity is always
    /// a caller bug.
    pub fn new(
        product_id: impl Into<String>,
        kind: MovementKind,
        quantity: i64,
        unit_cost: Money,
        reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> CoreResult<Self> {
        if quantity < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "quantity".to_string(),
            }
            .into());
        }
        if unit_cost.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "unit_cost".to_string(),
            }
            .into());
        }

        Ok(NewMovement {
            product_id: product_id.into(),
            kind,
            quantity,
            unit_cost,
            reference: reference.into(),
            reason: reason.into(),
            user_id: None,
        })
    }

    pub fn by(mut self, user_id: Option<&str>) -> Self {
        self.user_id = user_id.map(str::to_string);
        self
    }

    #[inline]
    pub fn signed_quantity(&self) -> i64 {
        signed_quantity(self.kind, self.quantity)
    }
}

// =============================================================================
// Manual Adjustments
// =============================================================================

/// Direction of a manual stock correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum AdjustmentKind {
    #[serde(rename = "AJUSTE_POS")]
    Positive,
    #[serde(rename = "AJUSTE_NEG")]
    Negative,
}

impl From<AdjustmentKind> for MovementKind {
    fn from(kind: AdjustmentKind) -> Self {
        match kind {
            AdjustmentKind::Positive => MovementKind::AdjustUp,
            AdjustmentKind::Negative => MovementKind::AdjustDown,
        }
    }
}

/// Reference used for manual adjustments.
pub const ADJUSTMENT_REFERENCE: &str = "ADJUST";

/// Builds a manual adjustment after checking the reason, the quantity and,
/// for negative adjustments, the balance on hand.
pub fn plan_adjustment(
    product_id: &str,
    product_name: &str,
    kind: AdjustmentKind,
    quantity: i64,
    reason: &str,
    on_hand: i64,
) -> CoreResult<NewMovement> {
    validate_reason(reason)?;
    crate::validation::validate_quantity(quantity)?;

    if kind == AdjustmentKind::Negative {
        ensure_available(product_name, on_hand, quantity)?;
    }

    NewMovement::new(
        product_id,
        kind.into(),
        quantity,
        Money::zero(),
        ADJUSTMENT_REFERENCE,
        reason.trim(),
    )
}

// =============================================================================
// Availability
// =============================================================================

/// Rejects a withdrawal of `requested` units when only `available` are on hand.
pub fn ensure_available(product_name: &str, available: i64, requested: i64) -> CoreResult<()> {
    if requested > available {
        return Err(CoreError::InsufficientStock {
            product: product_name.to_string(),
            available,
            requested,
        });
    }
    Ok(())
}

// =============================================================================
// Reference Tags
// =============================================================================

/// `PURCHASE:{purchaseId}:{lineId}`, the ENTRADA created on confirmation.
pub fn purchase_entry_reference(purchase_id: &str, line_id: &str) -> String {
    format!("PURCHASE:{}:{}", purchase_id, line_id)
}

/// `PURCHASE-VOID:{purchaseId}:{lineId}`, the SALIDA reversing it.
pub fn purchase_void_reference(purchase_id: &str, line_id: &str) -> String {
    format!("PURCHASE-VOID:{}:{}", purchase_id, line_id)
}

/// `SALE-{number}`, shared by every SALIDA of a completed sale.
pub fn sale_exit_reference(sale_number: &str) -> String {
    format!("SALE-{}", sale_number)
}

/// `SALE-VOID-{number}`, shared by every ENTRADA reversing a voided sale.
pub fn sale_void_reference(sale_number: &str) -> String {
    format!("SALE-VOID-{}", sale_number)
}

// =============================================================================
// Unit Tests
// =============================================================================
