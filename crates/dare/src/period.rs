//! Periods for periodical executions

use std::fmt;
use std::str::FromStr;

use crate::error::DareError;

/// Unit a period amount is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodUnit {
    Days,
    Hours,
    Minutes,
}

impl PeriodUnit {
    /// Single-letter form used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodUnit::Days => "d",
            PeriodUnit::Hours => "h",
            PeriodUnit::Minutes => "m",
        }
    }

    fn representations(&self) -> &'static [&'static str] {
        match self {
            PeriodUnit::Days => &["d", "day", "days"],
            PeriodUnit::Hours => &["h", "hour", "hours"],
            PeriodUnit::Minutes => &["m", "minute", "minutes"],
        }
    }
}

impl FromStr for PeriodUnit {
    type Err = DareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = s.trim();
        [PeriodUnit::Days, PeriodUnit::Hours, PeriodUnit::Minutes]
            .into_iter()
            .find(|u| {
                u.representations()
                    .iter()
                    .any(|r| r.eq_ignore_ascii_case(unit))
            })
            .ok_or_else(|| DareError::InvalidPeriod(format!("'{}' is not a valid unit", unit)))
    }
}

/// How often a periodical execution runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    amount: u32,
    unit: PeriodUnit,
}

impl Period {
    pub fn new(amount: u32, unit: PeriodUnit) -> Result<Self, DareError> {
        if amount == 0 {
            return Err(DareError::InvalidPeriod(
                "the amount must be greater than zero".to_string(),
            ));
        }
        Ok(Self { amount, unit })
    }

    pub fn days(amount: u32) -> Result<Self, DareError> {
        Self::new(amount, PeriodUnit::Days)
    }

    pub fn hours(amount: u32) -> Result<Self, DareError> {
        Self::new(amount, PeriodUnit::Hours)
    }

    pub fn minutes(amount: u32) -> Result<Self, DareError> {
        Self::new(amount, PeriodUnit::Minutes)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.unit.as_str())
    }
}

impl FromStr for Period {
    type Err = DareError;

    /// Accepts an amount followed by a unit, e.g. `2d`, `48 hours`, `90minute`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let digits_end = text
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(text.len());
        let (amount, unit) = text.split_at(digits_end);

        if amount.is_empty() || unit.trim().is_empty() {
            return Err(DareError::InvalidPeriod(format!(
                "'{}' must be an amount followed by a unit",
                s
            )));
        }

        let amount: u32 = amount
            .parse()
            .map_err(|_| DareError::InvalidPeriod(format!("'{}' is not a valid amount", amount)))?;

        Period::new(amount, unit.parse()?)
    }
}
