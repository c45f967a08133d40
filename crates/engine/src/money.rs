use std::{fmt, str::FromStr};

use crate::EngineError;

/// Signed amount in minor units (two decimal places).
///
/// Every balance, transaction amount and adjustment in the ledger is an
/// integer number of minor units; decimal strings only exist at the edges.
///
/// ```rust
/// use engine::Money;
///
/// let amount: Money = "150".parse().unwrap();
/// assert_eq!(amount.minor(), 15_000);
/// assert_eq!(amount.to_string(), "150.00");
/// assert!("12.345".parse::<Money>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a decimal string into minor units.
    ///
    /// Accepts `.` or `,` as separator and an optional leading sign. More than
    /// two fraction digits is an error, never a rounding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| EngineError::InvalidAmount(reason.to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, &trimmed[1..]),
            Some(b'+') => (false, &trimmed[1..]),
            _ => (false, trimmed),
        };
        if rest.is_empty() {
            return Err(invalid("empty amount"));
        }

        let rest = rest.replace(',', ".");
        let (units, fraction) = match rest.split_once('.') {
            Some((units, fraction)) => (units, fraction),
            None => (rest.as_str(), ""),
        };

        let digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if units.is_empty() || !digits(units) || !digits(fraction) {
            return Err(invalid("invalid amount"));
        }
        if fraction.len() > 2 {
            return Err(invalid("too many decimals"));
        }

        let units: i64 = units.parse().map_err(|_| invalid("amount too large"))?;
        let fraction: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| invalid("invalid amount"))? * 10,
            _ => fraction.parse().map_err(|_| invalid("invalid amount"))?,
        };

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(fraction))
            .ok_or_else(|| invalid("amount too large"))?;

        Ok(Money(if negative { -total } else { total }))
    }
}
