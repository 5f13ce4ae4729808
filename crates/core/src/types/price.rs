//! Money amounts and price ranges for catalog filtering.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decimal places a stored amount may carry.
pub const MONEY_SCALE: u32 = 2;
/// Digits a stored amount may carry before the decimal point.
pub const MONEY_INTEGER_DIGITS: u32 = 10;

/// Returned when an amount does not fit the `NUMERIC(12, 2)` money columns.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("must not be negative")]
    Negative,
    #[error("must have at most {MONEY_SCALE} decimal places")]
    TooPrecise,
    #[error("must have at most {MONEY_INTEGER_DIGITS} digits before the decimal point")]
    TooLarge,
}

/// Check that `amount` can be stored as money without rounding or overflow.
///
/// # Errors
///
/// Returns [`MoneyError`] for negative amounts, more than two decimal places,
/// or more than ten integer digits.
pub fn check_money(amount: Decimal) -> Result<Decimal, MoneyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MoneyError::Negative);
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(MoneyError::TooPrecise);
    }
    if amount.trunc() >= Decimal::from(10_i64.pow(MONEY_INTEGER_DIGITS)) {
        return Err(MoneyError::TooLarge);
    }
    Ok(amount)
}

/// Errors building a [`PriceRange`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceRangeError {
    /// The bounds were not given as exactly `[min, max]`.
    #[error("price filter must be [min, max]")]
    Arity,
    /// A bound is negative.
    #[error("price bounds must not be negative")]
    Negative,
    /// `min` is greater than `max`.
    #[error("price range minimum {min} exceeds maximum {max}")]
    Inverted {
        /// Lower bound supplied.
        min: Decimal,
        /// Upper bound supplied.
        max: Decimal,
    },
}

/// A closed price interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    min: Decimal,
    max: Decimal,
}

impl PriceRange {
    /// Build a range, rejecting negative or inverted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`PriceRangeError`] when a bound is negative or `min > max`.
    pub fn new(min: Decimal, max: Decimal) -> Result<Self, PriceRangeError> {
        if min.is_sign_negative() || max.is_sign_negative() {
            return Err(PriceRangeError::Negative);
        }
        if min > max {
            return Err(PriceRangeError::Inverted { min, max });
        }
        Ok(Self { min, max })
    }

    /// Build a range from the `[min, max]` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`PriceRangeError::Arity`] unless exactly two bounds are given.
    pub fn from_bounds(bounds: &[Decimal]) -> Result<Self, PriceRangeError> {
        match bounds {
            [min, max] => Self::new(*min, *max),
            _ => Err(PriceRangeError::Arity),
        }
    }

    #[must_use]
    pub const fn min(&self) -> Decimal {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> Decimal {
        self.max
    }

    /// Whether `price` lies inside the range, bounds included.
    #[must_use]
    pub fn contains(&self, price: Decimal) -> bool {
        self.min <= price && price <= self.max
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_fits_numeric_12_2() {
        assert!(check_money(Decimal::new(1250, 2)).is_ok());
        // Trailing zeros are not extra precision
        assert!(check_money(Decimal::new(10_500, 3)).is_ok());
        assert!(check_money(Decimal::new(999_999_999_999, 2)).is_ok());
        assert_eq!(check_money(Decimal::new(1001, 3)), Err(MoneyError::TooPrecise));
        assert_eq!(
            check_money(Decimal::from(10_000_000_000_i64)),
            Err(MoneyError::TooLarge)
        );
        assert_eq!(check_money(Decimal::NEGATIVE_ONE), Err(MoneyError::Negative));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = PriceRange::new(Decimal::from(10), Decimal::from(50)).unwrap();
        assert!(range.contains(Decimal::from(10)));
        assert!(range.contains(Decimal::from(50)));
        assert!(!range.contains(Decimal::new(5001, 2)));
        assert!(!range.contains(Decimal::new(999, 2)));
    }

    #[test]
    fn test_from_bounds_requires_pair() {
        assert_eq!(
            PriceRange::from_bounds(&[Decimal::ONE]),
            Err(PriceRangeError::Arity)
        );
        assert_eq!(
            PriceRange::from_bounds(&[Decimal::ONE, Decimal::TWO, Decimal::TEN]),
            Err(PriceRangeError::Arity)
        );
    }

    #[test]
    fn test_rejects_inverted_and_negative() {
        assert!(matches!(
            PriceRange::new(Decimal::TEN, Decimal::ONE),
            Err(PriceRangeError::Inverted { .. })
        ));
        assert_eq!(
            PriceRange::new(Decimal::NEGATIVE_ONE, Decimal::ONE),
            Err(PriceRangeError::Negative)
        );
    }
}
