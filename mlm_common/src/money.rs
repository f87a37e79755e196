use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const USD_CURRENCY_CODE: &str = "USD";
pub const USD_CURRENCY_CODE_LOWER: &str = "usd";

//--------------------------------------     UsdAmount       ---------------------------------------------------------

/// A USD amount held as a whole number of cents.
///
/// All accumulation in the engine is integer arithmetic on cents, so repeated additions never
/// drift. Fractional dollar values only exist at the boundary: [`UsdAmount::try_from`] a
/// [`Decimal`] rounds half-up (away from zero) at 2 decimal places before converting.
///
/// Amounts are signed. Refund clawbacks can legitimately push a balance below zero.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct UsdAmount(i64);

op!(binary UsdAmount, Add, add);
op!(binary UsdAmount, Sub, sub);
op!(inplace UsdAmount, AddAssign, add_assign);
op!(inplace UsdAmount, SubAssign, sub_assign);
op!(unary UsdAmount, Neg, neg);

impl Mul<i64> for UsdAmount {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.0 * rhs)
    }
}

impl Sum for UsdAmount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in USD cents: {0}")]
pub struct UsdConversionError(String);

impl From<i64> for UsdAmount {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl TryFrom<Decimal> for UsdAmount {
    type Error = UsdConversionError;

    fn try_from(dollars: Decimal) -> Result<Self, Self::Error> {
        let rounded = dollars.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        (rounded * Decimal::ONE_HUNDRED)
            .to_i64()
            .map(Self)
            .ok_or_else(|| UsdConversionError(format!("{dollars} is out of range for UsdAmount")))
    }
}

impl FromStr for UsdAmount {
    type Err = UsdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dollars = Decimal::from_str(s).map_err(|e| UsdConversionError(format!("{s}: {e}")))?;
        Self::try_from(dollars)
    }
}

impl PartialEq for UsdAmount {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for UsdAmount {}

impl Display for UsdAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dollars = self.to_dollars();
        if self.0 < 0 {
            write!(f, "-${}", -dollars)
        } else {
            write!(f, "${dollars}")
        }
    }
}

impl UsdAmount {
    pub const ZERO: UsdAmount = UsdAmount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// The amount in whole cents.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// The amount as a 2-decimal dollar value.
    pub fn to_dollars(&self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::UsdAmount;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn conversion_rounds_half_up_at_two_decimals() {
        assert_eq!(UsdAmount::try_from(dec("82.28")).unwrap().value(), 8228);
        assert_eq!(UsdAmount::try_from(dec("82.275")).unwrap().value(), 8228);
        assert_eq!(UsdAmount::try_from(dec("82.274")).unwrap().value(), 8227);
        assert_eq!(UsdAmount::try_from(dec("0.005")).unwrap().value(), 1);
        assert_eq!(UsdAmount::try_from(dec("0.004")).unwrap().value(), 0);
        // Half-up is away from zero for debits too
        assert_eq!(UsdAmount::try_from(dec("-0.005")).unwrap().value(), -1);
    }

    #[test]
    fn conversion_rejects_out_of_range_values() {
        let too_big = Decimal::MAX;
        assert!(UsdAmount::try_from(too_big).is_err());
    }

    #[test]
    fn parses_dollar_strings() {
        assert_eq!(UsdAmount::from_str("50").unwrap().value(), 5000);
        assert_eq!(UsdAmount::from_str("82.28").unwrap().value(), 8228);
        assert!(UsdAmount::from_str("nope").is_err());
    }

    #[test]
    fn arithmetic_is_exact() {
        let mut total = UsdAmount::ZERO;
        for _ in 0..10 {
            total += UsdAmount::from_cents(1);
        }
        assert_eq!(total.value(), 10);
        total -= UsdAmount::from_cents(25);
        assert_eq!(total.value(), -15);
        assert!(total.is_negative());
        assert_eq!((-total).value(), 15);
    }

    #[test]
    fn sums_an_iterator_of_amounts() {
        let total: UsdAmount = [5000, 3000, 228].into_iter().map(UsdAmount::from_cents).sum();
        assert_eq!(total.value(), 8228);
    }

    #[test]
    fn displays_as_dollars() {
        assert_eq!(UsdAmount::from_cents(8228).to_string(), "$82.28");
        assert_eq!(UsdAmount::from_cents(5).to_string(), "$0.05");
        assert_eq!(UsdAmount::from_cents(-8228).to_string(), "-$82.28");
    }
}
