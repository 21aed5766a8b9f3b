use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Currency amount held at cent precision.
///
/// Every constructor that accepts an arbitrary decimal rounds half away from
/// zero to two places, so `Money` values always compare exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Money(Decimal);

pub const CENT_PLACES: u32 = 2;

impl Money {
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, CENT_PLACES))
    }

    /// Saturates at the `i64` range; amounts that large are not representable as cents.
    pub fn to_cents(self) -> i64 {
        (self.0 * Decimal::ONE_HUNDRED).to_i64().unwrap_or(if self.0.is_sign_negative() {
            i64::MIN
        } else {
            i64::MAX
        })
    }

    pub fn from_decimal(decimal: Decimal) -> Self {
        Money(round_to_cents(decimal))
    }

    pub fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn as_decimal(self) -> Decimal {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Multiplies by a raw rate and rounds the product to cents.
    /// Returns `None` if the product overflows.
    pub fn apply_rate(self, rate: Decimal) -> Option<Self> {
        self.0.checked_mul(rate).map(Money::from_decimal)
    }

    /// Divides evenly into `parts`, rounding the quotient to cents.
    pub fn split_evenly(self, parts: u32) -> Option<Self> {
        if parts == 0 {
            return None;
        }
        self.0.checked_div(Decimal::from(parts)).map(Money::from_decimal)
    }
}

pub(crate) fn round_to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(CENT_PLACES, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CENT_PLACES);
    rounded
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_negative() {
            write!(f, "-${:.2}", self.0.abs())
        } else {
            write!(f, "${:.2}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid amount: {0}")]
pub struct ParseMoneyError(pub String);

impl FromStr for Money {
    type Err = ParseMoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let cleaned: String = rest
            .trim_start_matches('$')
            .chars()
            .filter(|c| *c != ',')
            .collect();
        // One sign only, and only ahead of the currency symbol.
        if cleaned.starts_with(|c| c == '-' || c == '+') {
            return Err(ParseMoneyError(s.to_string()));
        }
        let value =
            Decimal::from_str(&cleaned).map_err(|_| ParseMoneyError(s.to_string()))?;
        let value = if negative { -value } else { value };
        Ok(Money::from_decimal(value))
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Money(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::zero(), |a, b| a + b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cents_round_trip() {
        assert_eq!(Money::from_cents(86066).to_cents(), 86066);
        assert_eq!(Money::from_cents(-5).to_cents(), -5);
    }

    #[test]
    fn from_decimal_rounds_half_up() {
        assert_eq!(Money::from_decimal(dec!(0.125)), Money::from_cents(13));
        assert_eq!(Money::from_decimal(dec!(0.135)), Money::from_cents(14));
        assert_eq!(Money::from_decimal(dec!(-0.125)), Money::from_cents(-13));
        assert_eq!(Money::from_decimal(dec!(208.3333)), Money::from_cents(20833));
    }

    #[test]
    fn equality_ignores_input_scale() {
        assert_eq!(Money::from_decimal(dec!(50)), Money::from_decimal(dec!(50.000)));
    }

    #[test]
    fn display_formats_dollars() {
        assert_eq!(Money::from_cents(5000).to_string(), "$50.00");
        assert_eq!(Money::from_cents(-1999).to_string(), "-$19.99");
    }

    #[test]
    fn parse_accepts_symbols_and_commas() {
        assert_eq!("$1,234.50".parse::<Money>().unwrap(), Money::from_cents(123450));
        assert_eq!("860.66".parse::<Money>().unwrap(), Money::from_cents(86066));
        assert_eq!("-12".parse::<Money>().unwrap(), Money::from_cents(-1200));
        assert!("twelve".parse::<Money>().is_err());
    }

    #[test]
    fn parse_rejects_repeated_signs() {
        assert!("--5".parse::<Money>().is_err());
        assert!("-$-5".parse::<Money>().is_err());
        assert!("+-5".parse::<Money>().is_err());
        assert_eq!("+5".parse::<Money>().unwrap(), Money::from_cents(500));
    }

    #[test]
    fn checked_add_reports_overflow() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.checked_add(huge), None);
        assert_eq!(
            Money::from_cents(150).checked_add(Money::from_cents(-50)),
            Some(Money::from_cents(100))
        );
    }

    #[test]
    fn apply_rate_rounds_product() {
        let balance = Money::from_cents(1_000_000);
        assert_eq!(balance.apply_rate(dec!(0.005)), Some(Money::from_cents(5000)));
    }

    #[test]
    fn split_evenly_rejects_zero_parts() {
        assert_eq!(Money::from_cents(500000).split_evenly(24), Some(Money::from_cents(20833)));
        assert_eq!(Money::from_cents(100).split_evenly(0), None);
    }

    #[test]
    fn sign_helpers() {
        assert!(Money::from_cents(-1).is_negative());
        assert!(!Money::zero().is_negative());
        assert!(!Money::zero().is_positive());
        assert!(Money::from_cents(1).is_positive());
    }

    #[test]
    fn sum_of_amounts() {
        let total: Money = [100, 250, 650].iter().map(|c| Money::from_cents(*c)).sum();
        assert_eq!(total, Money::from_cents(1000));
    }
}
