//! # Decimal Module
//!
//! Provides the `Amount` type used for every quantity and price in the engine.
//!
//! ## Why Fixed-Point?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  0.1 kg + 0.2 kg = 0.30000000000000004 kg  ❌ balance never matches     │
//! │                                                                         │
//! │  Stock balances are compared against the sum of the ledger, so every   │
//! │  quantity must add up exactly.                                          │
//! │                                                                         │
//! │  OUR SOLUTION: 96-bit decimal (rust_decimal)                           │
//! │    0.1 + 0.2 = 0.3 exactly                                             │
//! │    Stored as TEXT with at least 4 fractional digits: "0.3000"          │
//! │    Division rounds half to even at an explicit scale                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use depot_core::decimal::Amount;
//!
//! let received: Amount = "10.5".parse().unwrap();
//! let issued = Amount::from(4);
//!
//! assert_eq!((received - issued).to_string(), "6.5000");
//! assert!(issued.min(received) == issued);
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Minimum number of fractional digits kept when an amount is rendered or persisted.
pub const MIN_SCALE: u32 = 4;

/// Largest accepted item quantity or price: 10^15.
///
/// Leaves thirteen orders of magnitude of headroom below the decimal range
/// for balances that accumulate many lines.
pub const MAX_MAGNITUDE: Amount = Amount(Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0));

// =============================================================================
// Amount Type
// =============================================================================

/// A signed fixed-point decimal (quantity or price).
///
/// ## Design Decisions
/// - **rust_decimal**: exact base-10 arithmetic, 28 significant digits
/// - **Signed**: movements carry negative quantities for outgoing stock
/// - **Equality is numeric**: `10` and `10.0000` compare equal
///
/// ## Where Amount is Used
/// ```text
/// DocumentItem.quantity ──► StockMovement.quantity ──► StockBalance.quantity
///                      └──► StockLot.current_quantity
/// DocumentItem.price ────► StockLot.unit_cost / ItemPrice.price
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(Decimal);

impl Amount {
    /// Zero.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Wraps a `rust_decimal::Decimal`.
    #[inline]
    pub const fn new(value: Decimal) -> Self {
        Amount(value)
    }

    /// Returns zero.
    #[inline]
    pub const fn zero() -> Self {
        Amount::ZERO
    }

    /// Returns the inner decimal.
    #[inline]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Checks if the value is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checks if the value is strictly greater than zero.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Checks if the value is strictly less than zero.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    /// Returns the absolute value.
    #[inline]
    pub fn abs(&self) -> Self {
        Amount(self.0.abs())
    }

    /// Returns the smaller of two amounts.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if other < self {
            other
        } else {
            self
        }
    }

    /// Divides by `divisor`, rounding half to even at `scale` fractional digits.
    ///
    /// The scale is never allowed below [`MIN_SCALE`].
    ///
    /// ## Bankers Rounding
    /// ```text
    /// 0.00005 at scale 4 → 0.0000   (half goes to the even neighbour)
    /// 0.00015 at scale 4 → 0.0002
    /// ```
    ///
    /// ## Example
    /// ```rust
    /// use depot_core::decimal::Amount;
    ///
    /// let total = Amount::from(10);
    /// let share = total.div_scaled(Amount::from(3), 4).unwrap();
    /// assert_eq!(share.to_string(), "3.3333");
    /// ```
    ///
    /// Returns `None` when dividing by zero or on overflow.
    pub fn div_scaled(self, divisor: Amount, scale: u32) -> Option<Amount> {
        let quotient = self.0.checked_div(divisor.0)?;
        Some(Amount(quotient.round_dp_with_strategy(
            scale.max(MIN_SCALE),
            RoundingStrategy::MidpointNearestEven,
        )))
    }

    /// Checked addition.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    /// Checked subtraction.
    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Subtraction clamped at the representable range.
    pub fn saturating_sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }

    /// Addition clamped at the representable range.
    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// True when `|self|` stays within [`MAX_MAGNITUDE`].
    pub fn within_bounds(&self) -> bool {
        self.0.abs() <= MAX_MAGNITUDE.0
    }

    /// Renders the value with at least [`MIN_SCALE`] fractional digits.
    ///
    /// This is the persisted representation: `"15"` is stored as `"15.0000"`.
    pub fn to_storage_string(&self) -> String {
        let mut value = self.0;
        if value.scale() < MIN_SCALE {
            value.rescale(MIN_SCALE);
        }
        value.to_string()
    }

    /// Parses an amount, naming the offending field on failure.
    pub fn parse_field(field: &str, raw: &str) -> Result<Amount, ValidationError> {
        raw.trim()
            .parse::<Amount>()
            .map_err(|e| ValidationError::InvalidFormat {
                field: field.to_string(),
                reason: e.to_string(),
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_string())
    }
}

impl FromStr for Amount {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s).map(Amount)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount(value)
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<i32> for Amount {
    fn from(value: i32) -> Self {
        Amount(Decimal::from(value))
    }
}

impl From<Amount> for Decimal {
    fn from(value: Amount) -> Self {
        value.0
    }
}

impl Add for Amount {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Amount(self.0 + other.0)
    }
}

impl AddAssign for Amount {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Amount(self.0 - other.0)
    }
}

impl SubAssign for Amount {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication (quantity × unit cost).
impl Mul for Amount {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Amount(self.0 * other.0)
    }
}

impl Neg for Amount {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Amount(-self.0)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, |acc, x| acc + *x)
    }
}

// =============================================================================
// SQLite Mapping
// =============================================================================
// Amounts are stored as TEXT so that nothing on the way to disk goes
// through a float.

#[cfg(feature = "sqlx")]
mod sqlite {
    use super::Amount;
    use rust_decimal::Decimal;
    use sqlx::encode::IsNull;
    use sqlx::error::BoxDynError;
    use sqlx::sqlite::{SqliteTypeInfo, SqliteValueRef};
    use sqlx::{Database, Decode, Encode, Sqlite, Type};
    use std::str::FromStr;

    impl Type<Sqlite> for Amount {
        fn type_info() -> SqliteTypeInfo {
            <String as Type<Sqlite>>::type_info()
        }

        fn compatible(ty: &SqliteTypeInfo) -> bool {
            <String as Type<Sqlite>>::compatible(ty)
                || <i64 as Type<Sqlite>>::compatible(ty)
                || <f64 as Type<Sqlite>>::compatible(ty)
        }
    }

    impl<'q> Encode<'q, Sqlite> for Amount {
        fn encode_by_ref(
            &self,
            buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
        ) -> Result<IsNull, BoxDynError> {
            <String as Encode<'q, Sqlite>>::encode(self.to_storage_string(), buf)
        }
    }

    impl<'r> Decode<'r, Sqlite> for Amount {
        fn decode(value: SqliteValueRef<'r>) -> Result<Self, BoxDynError> {
            let text = <&str as Decode<'r, Sqlite>>::decode(value)?;
            Ok(Amount(Decimal::from_str(text.trim())?))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_storage_string_keeps_four_digits() {
        assert_eq!(Amount::from(15).to_storage_string(), "15.0000");
        assert_eq!(Amount::new(dec!(0.5)).to_storage_string(), "0.5000");
        assert_eq!(Amount::new(dec!(1.123456)).to_storage_string(), "1.123456");
        assert_eq!(Amount::new(dec!(-2.5)).to_string(), "-2.5000");
    }

    #[test]
    fn test_exact_addition() {
        let a = Amount::new(dec!(0.1));
        let b = Amount::new(dec!(0.2));
        assert_eq!(a + b, Amount::new(dec!(0.3)));
    }

    #[test]
    fn test_numeric_equality_ignores_scale() {
        assert_eq!(Amount::new(dec!(10.0000)), Amount::from(10));
    }

    #[test]
    fn test_bankers_rounding_on_division() {
        // 0.00005 → 0.0000, 0.00015 → 0.0002
        let half_down = Amount::new(dec!(0.0001)).div_scaled(Amount::from(2), 4).unwrap();
        assert_eq!(half_down, Amount::zero());

        let half_up = Amount::new(dec!(0.0003)).div_scaled(Amount::from(2), 4).unwrap();
        assert_eq!(half_up, Amount::new(dec!(0.0002)));
    }

    #[test]
    fn test_division_scale_never_below_minimum() {
        let third = Amount::from(1).div_scaled(Amount::from(3), 0).unwrap();
        assert_eq!(third, Amount::new(dec!(0.3333)));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(Amount::from(1).div_scaled(Amount::zero(), 4).is_none());
    }

    #[test]
    fn test_sign_helpers() {
        let n = -Amount::from(3);
        assert!(n.is_negative());
        assert_eq!(n.abs(), Amount::from(3));
        assert!(!Amount::zero().is_positive());
        assert_eq!(Amount::from(3).min(Amount::from(7)), Amount::from(3));
    }

    #[test]
    fn test_sum() {
        let parts = [Amount::from(10), Amount::new(dec!(5.25)), -Amount::from(1)];
        let total: Amount = parts.iter().sum();
        assert_eq!(total, Amount::new(dec!(14.25)));
    }

    #[test]
    fn test_bounds_and_checked_arithmetic() {
        assert_eq!(MAX_MAGNITUDE, Amount::new(dec!(1000000000000000)));
        assert!(MAX_MAGNITUDE.within_bounds());
        assert!((-MAX_MAGNITUDE).within_bounds());
        assert!(!Amount::new(dec!(1000000000000000.0001)).within_bounds());

        let max = Amount::new(Decimal::MAX);
        assert_eq!(max.checked_add(Amount::from(1)), None);
        assert_eq!((-max).checked_sub(Amount::from(1)), None);
        assert_eq!(Amount::from(3).checked_sub(Amount::from(5)), Some(Amount::from(-2)));
        assert_eq!(max.saturating_add(Amount::from(1)), max);
        assert_eq!((-max).saturating_sub(Amount::from(1)), -max);
    }

    #[test]
    fn test_parse_field_reports_field_name() {
        let err = Amount::parse_field("quantity", "ten").unwrap_err();
        assert!(err.to_string().starts_with("quantity has invalid format"));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Amount::new(dec!(1.5))).unwrap();
        assert_eq!(json, "\"1.5\"");
    }
}
