use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// A plain decimal amount in the statement's single currency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid amount: '{0}'")]
pub struct MoneyError(pub String);

impl Money {
    pub fn new(decimal: Decimal) -> Self {
        Money(decimal)
    }

    /// `Money::from_parts(73, 2)` is 0.73.
    pub fn from_parts(num: i64, scale: u32) -> Self {
        Money(Decimal::new(num, scale))
    }

    pub fn decimal(self) -> Decimal {
        self.0
    }

    /// Subtracts `rhs`, flooring the result at zero.
    pub fn saturating_sub(self, rhs: Money) -> Self {
        Money((self.0 - rhs.0).max(Decimal::ZERO))
    }

    /// Parses a statement amount cell. Currency glyphs, thousands separators
    /// and surrounding whitespace are ignored.
    pub fn parse(s: &str) -> Result<Self, MoneyError> {
        let cleaned: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '¥' | '￥' | ',' | ' '))
            .collect();
        Decimal::from_str(&cleaned)
            .map(Money)
            .map_err(|_| MoneyError(s.trim().to_string()))
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
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

// Persisted bill files store amounts as JSON numbers.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawAmount::deserialize(deserializer)? {
            // The shortest round-trip repr keeps 0.73 as 0.73 rather than 0.72999...
            RawAmount::Number(n) => Decimal::from_str(&n.to_string())
                .ok()
                .or_else(|| Decimal::from_f64(n))
                .map(Money)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid amount {n}"))),
            RawAmount::Text(s) => Money::parse(&s).map_err(serde::de::Error::custom),
        }
    }
}
