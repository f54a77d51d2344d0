//! Amount type for handling signed monetary values.
//!
//! This module provides the `Amount` type which wraps `Decimal`. The sign carries meaning: a
//! negative amount is an expense and a positive amount is income.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, AddAssign, Neg};
use std::str::FromStr;

/// Represents a signed amount of money.
///
/// Amounts are held at the full decimal precision they were received with. The remote API sends
/// them either as decimal strings (`"-50.00"`) or as JSON numbers and both decode into the same
/// `Decimal`.
///
/// # Examples
///
/// ```
/// # use fintrack::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("-$1,250.50").unwrap();
/// assert!(amount.is_expense());
/// assert_eq!(amount.to_string(), "-1250.50");
/// assert_eq!(amount.format_signed("₹"), "-₹1,250.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount::new(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn abs(&self) -> Amount {
        Amount::new(self.value.abs())
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is positive, i.e. income.
    pub fn is_income(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    /// Returns true if the amount is negative, i.e. an expense.
    pub fn is_expense(&self) -> bool {
        !self.is_zero() && self.value.is_sign_negative()
    }

    /// Formats the amount for display with an explicit sign, the currency `symbol`, thousands
    /// separators and two decimal places, e.g. `+₹5,000.00` or `-₹50.00`. Zero is shown as
    /// positive.
    pub fn format_signed(&self, symbol: &str) -> String {
        let sign = if self.is_expense() { "-" } else { "+" };
        format!("{sign}{symbol}{}", self.format_magnitude())
    }

    /// Formats the amount for display with the currency `symbol` and a sign only when negative,
    /// e.g. `₹4,950.00` or `-₹50.00`. This is how balances are shown.
    pub fn format_balance(&self, symbol: &str) -> String {
        let sign = if self.is_expense() { "-" } else { "" };
        format!("{sign}{symbol}{}", self.format_magnitude())
    }

    /// Formats an expense total, always with a leading `-`, e.g. `-₹50.00` or `-₹0.00`.
    pub fn format_expense(&self, symbol: &str) -> String {
        format!("-{symbol}{}", self.format_magnitude())
    }

    fn format_magnitude(&self) -> String {
        format_num::format_num!(",.2", self.value.abs().to_f64().unwrap_or_default())
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(rust_decimal::Error);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl std::error::Error for AmountError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.0)
    }
}

const CURRENCY_SYMBOLS: &[char] = &['$', '₹', '€', '£'];

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses plain decimals as well as amounts written with a leading sign, a currency symbol
    /// and thousands separators, e.g. `-₹1,000.00`. An empty string is zero.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(Amount::default());
        }

        let (negative, unsigned) = if let Some(rest) = trimmed.strip_prefix('-') {
            (true, rest)
        } else if let Some(rest) = trimmed.strip_prefix('+') {
            (false, rest)
        } else {
            (false, trimmed)
        };
        let without_symbol = unsigned.trim_start_matches(CURRENCY_SYMBOLS);
        let without_commas = without_symbol.replace(',', "");

        let value = Decimal::from_str(&without_commas).map_err(AmountError)?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

impl Display for Amount {
    /// Writes the plain decimal, e.g. `-50.00`. This is also the serialized form.
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.value, f)
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.value.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl<'de> Visitor<'de> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal amount as a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        // The shortest round-trip representation keeps `12.5` as `12.5` instead of the binary
        // expansion of the float.
        Decimal::from_str(&v.to_string())
            .or_else(|_| Decimal::from_scientific(&format!("{v:e}")))
            .map(Amount::new)
            .map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Amount, E> {
        Ok(Amount::ZERO)
    }
}

/// Serializes an `Amount` as a JSON number. Used for request bodies, where the server expects a
/// number the way the original client sent it.
pub(crate) fn serialize_as_number<S>(amount: &Amount, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match amount.value().to_f64() {
        Some(f) => serializer.serialize_f64(f),
        None => Err(serde::ser::Error::custom(format!(
            "amount {amount} cannot be represented as a number"
        ))),
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl From<i64> for Amount {
    fn from(value: i64) -> Self {
        Amount::new(Decimal::from(value))
    }
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount::new(self.value + rhs.value)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.value += rhs.value;
    }
}

impl Neg for Amount {
    type Output = Amount;

    fn neg(self) -> Amount {
        Amount::new(-self.value)
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, Add::add)
    }
}
