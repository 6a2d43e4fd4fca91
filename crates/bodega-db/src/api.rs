//! # API Error Type
//!
//! Serializable error and reply envelope for whatever transport sits on
//! top of the repositories (POS widget calls, back-office actions).
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Bodega                                 │
//! │                                                                         │
//! │  Repository call                                                        │
//! │  Result<T, DbError>                                                     │
//! │         │                                                               │
//! │         ├── DbError::Domain(CoreError::InsufficientStock) ──┐           │
//! │         ├── DbError::NotFound                              ├─► ApiError │
//! │         └── DbError::QueryFailed (logged, message hidden) ──┘           │
//! │                                                                         │
//! │  Reply::err(api_error)  →  { "ok": false, "error": "..." }   HTTP 400   │
//! │  Reply::ok(reply)       →  { "ok": true, ...reply fields }   HTTP 200   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bodega_core::{CoreError, ErrorKind};
use serde::Serialize;
use ts_rs::TS;

use crate::error::DbError;

/// API error returned to callers.
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for Arroz 1lb: ..." }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Document in the wrong status for the operation (400)
    InvalidStatus,

    /// Not enough stock on hand (400)
    InsufficientStock,

    /// Payment rules not met (400)
    PaymentError,

    /// Receivable payment rejected (400)
    ReceivableError,

    /// Duplicate or dangling reference (400)
    Conflict,

    /// Database operation failed (500)
    DatabaseError,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(
            ErrorCode::NotFound,
            format!("{} not found: {}", resource, id),
        )
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code {
            ErrorCode::NotFound => ErrorKind::NotFound,
            ErrorCode::Conflict => ErrorKind::Conflict,
            ErrorCode::DatabaseError => ErrorKind::Internal,
            _ => ErrorKind::Validation,
        }
    }

    /// HTTP status for this error: 400, 404 or 500.
    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::InsufficientPayment { .. }
            | CoreError::MissingReference { .. }
            | CoreError::MissingCustomer => ErrorCode::PaymentError,
            CoreError::InvalidAmount { .. }
            | CoreError::AlreadySettled { .. }
            | CoreError::ExceedsBalance { .. }
            | CoreError::ReceivableVoided { .. } => ErrorCode::ReceivableError,
            CoreError::InvalidStatus { .. } | CoreError::EmptyDocument { .. } => {
                ErrorCode::InvalidStatus
            }
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Domain(core) => ApiError::from(core),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::Conflict,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::Conflict, "Invalid or protected reference")
            }
            DbError::CheckViolation { message } => {
                tracing::warn!("Check constraint violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Value out of range")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

// =============================================================================
// Reply Envelope
// =============================================================================

/// `{ok, error?}` envelope the POS widgets expect.
///
/// On success the payload's fields are flattened next to `ok: true`; on
/// failure only `ok: false` and the error message are sent.
#[derive(Debug, Clone, Serialize)]
pub struct Reply<T: Serialize> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Option<T>,
    #[serde(skip)]
    pub status: u16,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(data: T) -> Self {
        Reply {
            ok: true,
            error: None,
            data: Some(data),
            status: 200,
        }
    }

    pub fn err(error: impl Into<ApiError>) -> Self {
        let error = error.into();
        Reply {
            ok: false,
            status: error.http_status(),
            error: Some(error.message),
            data: None,
        }
    }

    /// Wraps a repository result.
    pub fn from_result<E: Into<ApiError>>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Reply::ok(data),
            Err(e) => Reply::err(e),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use bodega_core::ValidationError;
    use serde_json::json;

    #[test]
    fn test_core_errors_map_to_codes() {
        let err = ApiError::from(CoreError::InsufficientStock {
            product: "Arroz".to_string(),
            available: 3,
            requested: 5,
        });
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.http_status(), 400);
        assert!(err.message.contains("Arroz"));

        assert_eq!(ApiError::from(CoreError::MissingCustomer).code, ErrorCode::PaymentError);
        assert_eq!(
            ApiError::from(CoreError::not_found("Sale", "s1")).http_status(),
            404
        );
    }

    #[test]
    fn test_db_errors_map_to_codes() {
        let err = ApiError::from(DbError::from(CoreError::AlreadySettled {
            receivable_id: "r1".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ReceivableError);

        let err = ApiError::from(DbError::QueryFailed("near SELECT: syntax".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.http_status(), 500);
        assert!(!err.message.contains("syntax"));

        let err = ApiError::from(DbError::duplicate("barcode", "74012345"));
        assert_eq!(err.http_status(), 400);

        let err = ApiError::from(DbError::from(ValidationError::Required {
            field: "reason".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_reply_envelope() {
        #[derive(Serialize)]
        struct Body {
            total: String,
        }

        let ok = serde_json::to_value(Reply::ok(Body {
            total: "126.50".to_string(),
        }))
        .unwrap();
        assert_eq!(ok, json!({"ok": true, "total": "126.50"}));

        let reply: Reply<Body> = Reply::err(CoreError::MissingCustomer);
        assert_eq!(reply.status, 400);
        let err = serde_json::to_value(reply).unwrap();
        assert_eq!(
            err,
            json!({"ok": false, "error": "A customer is required for credit sales"})
        );
    }
}
