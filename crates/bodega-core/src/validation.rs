//! # Validation Module
//!
//! Input validation for catalog records and document edits.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: POS widget / form                                            │
//! │  └── Immediate feedback (empty fields, obvious typos)                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Repository entry point (Rust)                                │
//! │  ├── Type validation (deserialization)                                 │
//! │  └── THIS MODULE: field rules (barcode, phone, tax range...)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (quantity > 0, outstanding <= total)            │
//! │  ├── UNIQUE constraints (barcode, invoice number, sale number)         │
//! │  └── Foreign keys (RESTRICT on products)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bodega_core::validation::{validate_barcode, validate_quantity};
//!
//! validate_barcode("74012345").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_PRODUCT_TAX_BPS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Characters allowed in names: letters (accented included), digits,
/// whitespace and `# / . - _`.
fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || matches!(c, '#' | '/' | '.' | '-' | '_')
}

/// Validates a display name (product, customer, supplier, category).
///
/// ## Rules
/// - Must not be empty
/// - At most `max` characters
/// - Only letters, digits, spaces and `# / . - _`
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_name;
///
/// assert!(validate_name("name", "Café Molido #2", 150).is_ok());
/// assert!(validate_name("name", "", 150).is_err());
/// assert!(validate_name("name", "DROP;TABLE", 150).is_err());
/// ```
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    if !name.chars().all(is_name_char) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "contains invalid characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a product barcode.
///
/// ## Rules
/// - Digits only
/// - Between 8 and 50 digits
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_barcode;
///
/// assert!(validate_barcode("7401234567890").is_ok());
/// assert!(validate_barcode("1234567").is_err());   // too short
/// assert!(validate_barcode("74012AB7").is_err());  // not numeric
/// ```
pub fn validate_barcode(barcode: &str) -> ValidationResult<()> {
    if !barcode.chars().all(|c| c.is_ascii_digit()) || barcode.is_empty() {
        return Err(ValidationError::InvalidFormat {
            field: "barcode".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    if !(8..=50).contains(&barcode.len()) {
        return Err(ValidationError::OutOfRange {
            field: "barcode length".to_string(),
            min: 8,
            max: 50,
        });
    }

    Ok(())
}

/// Validates a Honduran phone number for customers.
///
/// ## Rules
/// - Exactly 8 digits
/// - Starts with 2, 3, 7, 8 or 9
pub fn validate_customer_phone(phone: &str) -> ValidationResult<()> {
    validate_phone(phone)?;

    if !matches!(phone.chars().next(), Some('2' | '3' | '7' | '8' | '9')) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must start with 2, 3, 7, 8 or 9".to_string(),
        });
    }

    Ok(())
}

/// Validates an 8-digit phone number.
pub fn validate_phone(phone: &str) -> ValidationResult<()> {
    if phone.len() != 8 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain exactly 8 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a supplier RTN (14 digits).
pub fn validate_rtn(rtn: &str) -> ValidationResult<()> {
    if rtn.len() != 14 || !rtn.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "rtn".to_string(),
            reason: "must contain exactly 14 digits".to_string(),
        });
    }

    Ok(())
}

/// Minimal e-mail shape check: one `@` with text on both sides and a dot
/// in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid e-mail address".to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') || email.contains(char::is_whitespace) {
        return Err(invalid());
    }
    match domain.split_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates the reason attached to a manual stock adjustment.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.chars().count() > 120 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 120,
        });
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a document line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (9999)
///
/// Merged lines are checked again with the combined quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a non-negative amount in cents (price, cost).
///
/// ## Example
/// ```rust
/// use bodega_core::validation::validate_non_negative_cents;
///
/// assert!(validate_non_negative_cents("sale_price", 0).is_ok());
/// assert!(validate_non_negative_cents("sale_price", -100).is_err());
/// assert!(validate_non_negative_cents("sale_price", i64::MAX).is_err());
/// ```
pub fn validate_non_negative_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates the minimum stock threshold.
pub fn validate_min_stock(units: i64) -> ValidationResult<()> {
    if units < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock".to_string(),
        });
    }

    Ok(())
}

/// Validates a product tax rate: 0% to 15%.
pub fn validate_product_tax_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_PRODUCT_TAX_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: MAX_PRODUCT_TAX_BPS as i64,
        });
    }

    Ok(())
}

/// Validates a document-level rate in basis points (purchase tax,
/// line discount): 0% to 100%.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Arroz Precocido 1lb", 150).is_ok());
        assert!(validate_name("name", "Jabón #3 / barra", 150).is_ok());

        assert!(validate_name("name", "", 150).is_err());
        assert!(validate_name("name", "   ", 150).is_err());
        assert!(validate_name("name", "precio=$5", 150).is_err());
        assert!(validate_name("name", &"A".repeat(151), 150).is_err());
    }

    #[test]
    fn test_validate_barcode() {
        assert!(validate_barcode("12345678").is_ok());
        assert!(validate_barcode(&"9".repeat(50)).is_ok());

        assert!(validate_barcode("").is_err());
        assert!(validate_barcode("1234567").is_err());
        assert!(validate_barcode(&"9".repeat(51)).is_err());
        assert!(validate_barcode("1234567A").is_err());
    }

    #[test]
    fn test_validate_customer_phone() {
        assert!(validate_customer_phone("98765432").is_ok());
        assert!(validate_customer_phone("22345678").is_ok());

        assert!(validate_customer_phone("12345678").is_err());
        assert!(validate_customer_phone("5555555").is_err());
        assert!(validate_customer_phone("9876543a").is_err());
    }

    #[test]
    fn test_validate_rtn_and_email() {
        assert!(validate_rtn("08011999123456").is_ok());
        assert!(validate_rtn("0801").is_err());

        assert!(validate_email("ventas@bodega.hn").is_ok());
        assert!(validate_email("ventas@bodega").is_err());
        assert!(validate_email("@bodega.hn").is_err());
        assert!(validate_email("a b@bodega.hn").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(matches!(
            validate_quantity(MAX_ITEM_QUANTITY + 1),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(validate_quantity(i64::MAX / 1000).is_err());
    }

    #[test]
    fn test_validate_non_negative_cents() {
        assert!(validate_non_negative_cents("unit_cost", MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_non_negative_cents("unit_cost", MAX_AMOUNT_CENTS + 1).is_err());
    }

    #[test]
    fn test_validate_product_tax_bps() {
        assert!(validate_product_tax_bps(0).is_ok());
        assert!(validate_product_tax_bps(1500).is_ok());
        assert!(validate_product_tax_bps(1501).is_err());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps("discount", 10000).is_ok());
        assert!(validate_rate_bps("discount", 10001).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("Conteo físico").is_ok());
        assert!(validate_reason("  ").is_err());
    }
}
