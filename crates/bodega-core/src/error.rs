//! # Error Types
//!
//! Domain-specific error types for bodega-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  bodega-core errors (this file)                                        │
//! │  ├── CoreError        - Ledger / document rule violations              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  bodega-db errors                                                      │
//! │  ├── DbError          - Database failures + Domain(CoreError)          │
//! │  └── ApiError         - What the POS widget sees (serialized)          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → JSON         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant reports an [`ErrorKind`], which is what the transport edge
//! maps to a status code. Rule violations are all `Validation` (HTTP 400)
//! except lookups (`NotFound`, 404).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Error Kind
// =============================================================================

/// Coarse classification shared by every error type in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// HTTP status code the transport edge should use.
    pub const fn http_status(&self) -> u16 {
        match self {
            ErrorKind::Validation | ErrorKind::Conflict => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Ledger and document rule violations.
///
/// Raised before any write happens; the surrounding transaction is dropped
/// so no partial state survives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Not enough stock on hand to cover a SALIDA.
    ///
    /// ## User Workflow
    /// ```text
    /// Complete sale (Arroz 1lb × 5)
    ///      │
    ///      ▼
    /// Balance check: available = 3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Arroz 1lb", available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Widget shows: "Stock insuficiente para Arroz 1lb"
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    /// Cash received does not cover the sale total.
    #[error("Insufficient payment: total {total_cents} cents, received {received_cents} cents")]
    InsufficientPayment {
        total_cents: i64,
        received_cents: i64,
    },

    /// Card or transfer payment without a reference.
    #[error("A payment reference is required for {method}")]
    MissingReference { method: String },

    /// Credit sale without a resolvable customer.
    #[error("A customer is required for credit sales")]
    MissingCustomer,

    /// Payment amount is zero or negative.
    #[error("Invalid amount: {cents} cents, must be greater than zero")]
    InvalidAmount { cents: i64 },

    /// Receivable has nothing left to pay.
    #[error("Receivable {receivable_id} is already settled")]
    AlreadySettled { receivable_id: String },

    /// Payment larger than the outstanding balance.
    #[error("Payment of {amount_cents} cents exceeds outstanding balance of {outstanding_cents} cents")]
    ExceedsBalance {
        amount_cents: i64,
        outstanding_cents: i64,
    },

    /// Receivable was written off when its sale was voided.
    #[error("Receivable {receivable_id} was voided")]
    ReceivableVoided { receivable_id: String },

    /// Document is not in a status that allows the operation.
    ///
    /// ## When This Occurs
    /// - Completing a sale that is already PAGADA
    /// - Editing lines of a CONFIRMADA purchase
    /// - Voiding a BORRADOR sale
    #[error("{document} {id} is {status}, cannot {operation}")]
    InvalidStatus {
        document: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Confirming or completing a document without lines.
    #[error("{document} {id} has no lines")]
    EmptyDocument { document: String, id: String },

    /// Referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn invalid_status(
        document: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidStatus {
            document: document.into(),
            id: id.into(),
            status: status.into(),
            operation: operation.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Validation,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Used for early validation before any document or ledger rule runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Arithmetic on the value left the representable range.
    #[error("{field} is too large")]
    TooLarge { field: String },

    /// Invalid format (e.g., invalid UUID, non-numeric barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
