//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Purchase: 5 × 10.00 + 3 × 20.00 = 110.00                               │
//! │  Tax 15%:  110.00 × 0.15 = 16.500000000000004  ❌ WRONG (float)         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    11000 cents × 1500 bps / 10000 = 1650 cents                          │
//! │    Every document total, invoice and receivable balance is exact       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use bodega_core::money::Money;
//!
//! let cost = Money::from_cents(1000); // 10.00
//! let line = cost.multiply_quantity(5).unwrap(); // 50.00
//! assert_eq!(line.cents(), 5000);
//!
//! // Parsing what a POS widget sends
//! let paid: Money = "126.50".parse().unwrap();
//! assert_eq!(paid.cents(), 12650);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::types::TaxRate;
use crate::validation::ValidationResult;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents).
///
/// ## Where Money Flows
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  PurchaseLine.unit_cost ──► Purchase.subtotal ──► Invoice FC-*          │
/// │                                                                         │
/// │  SaleLine.unit_price ──► SaleLine.total ──► Sale.total ──┬► Invoice FV-*│
/// │                                                          │              │
/// │                                                          └► Receivable  │
/// │                                                             (CREDITO)   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts, only the major unit should be negative:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Clamps negative values to zero.
    ///
    /// Used wherever a balance must never go below zero
    /// (receivable outstanding, cash change).
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Calculates tax, rounding half away from zero to whole cents.
    ///
    /// ## Implementation
    /// Integer math on i128: `(amount * bps + 5000) / 10000`.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    /// use bodega_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(11000); // 110.00
    /// let tax = subtotal.calculate_tax(TaxRate::from_bps(1500)).unwrap(); // 15%
    /// assert_eq!(tax.cents(), 1650); // 16.50
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> ValidationResult<Money> {
        self.percentage(rate.bps())
    }

    /// Returns `bps / 10000` of this amount, rounded half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// let gross = Money::from_cents(10000); // 100.00
    /// assert_eq!(gross.percentage(1000).unwrap().cents(), 1000); // 10% = 10.00
    /// ```
    pub fn percentage(&self, bps: u32) -> ValidationResult<Money> {
        // Cannot overflow i128: |i64| × u32 < 2^95.
        let scaled = self.0 as i128 * bps as i128;
        let rounded = if scaled >= 0 {
            (scaled + 5000) / 10000
        } else {
            (scaled - 5000) / 10000
        };
        i64::try_from(rounded)
            .map(Money)
            .map_err(|_| too_large())
    }

    /// Multiplies money by a quantity.
    ///
    /// Fails with `TooLarge` instead of wrapping.
    ///
    /// ## Example
    /// ```rust
    /// use bodega_core::money::Money;
    ///
    /// let unit_cost = Money::from_cents(2000); // 20.00
    /// assert_eq!(unit_cost.multiply_quantity(3).unwrap().cents(), 6000); // 60.00
    /// assert!(unit_cost.multiply_quantity(i64::MAX / 1000).is_err());
    /// ```
    #[inline]
    pub fn multiply_quantity(&self, qty: i64) -> ValidationResult<Money> {
        self.0.checked_mul(qty).map(Money).ok_or_else(too_large)
    }

    /// Adds two amounts, failing with `TooLarge` instead of wrapping.
    #[inline]
    pub fn checked_add(&self, other: Money) -> ValidationResult<Money> {
        self.0.checked_add(other.0).map(Money).ok_or_else(too_large)
    }
}

fn too_large() -> ValidationError {
    ValidationError::TooLarge {
        field: "amount".to_string(),
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering (`-5.50`). Currency symbols are a display
/// concern handled by configuration.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor())
    }
}

/// Parses decimal strings such as `"126.5"`, `"126.50"` or `"-3"`.
///
/// More than two decimal places is rejected rather than silently rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "amount".to_string(),
            });
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("must contain digits"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("must be a decimal number"));
        }
        if frac.len() > 2 {
            return Err(invalid("at most 2 decimal places"));
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("too large"))?
        };
        let minor: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => frac.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or_else(|| invalid("too large"))?;

        Ok(Money(if negative { -cents } else { cents }))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
