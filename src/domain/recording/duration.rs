//! Capture length limit

use std::fmt;
use std::str::FromStr;

use crate::domain::error::DurationParseError;

/// Maximum capture length (30 minutes)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 30 * 60;

/// A positive whole number of seconds, written as `1h`, `5m`, `2m30s`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    seconds: u64,
}

impl Duration {
    pub const fn from_secs(secs: u64) -> Self {
        Self { seconds: secs }
    }

    /// Default capture cap (30 minutes)
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    pub const fn as_secs(&self) -> u64 {
        self.seconds
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Units must appear in `h`, `m`, `s` order, each at most once
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_ascii_lowercase();

        let mut total: u64 = 0;
        let mut digits = String::new();
        // Index into UNITS of the last unit seen; enforces order and uniqueness
        let mut next_unit = 0;
        const UNITS: [(char, u64); 3] = [('h', 3600), ('m', 60), ('s', 1)];

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }
            let position = UNITS[next_unit..]
                .iter()
                .position(|(unit, _)| *unit == ch)
                .ok_or_else(error)?;
            if digits.is_empty() {
                return Err(error());
            }
            let (_, factor) = UNITS[next_unit + position];
            let amount: u64 = digits.parse().map_err(|_| error())?;
            total = amount
                .checked_mul(factor)
                .and_then(|secs| total.checked_add(secs))
                .ok_or_else(error)?;
            digits.clear();
            next_unit += position + 1;
        }

        if !digits.is_empty() || next_unit == 0 || total == 0 {
            return Err(error());
        }
        Ok(Self::from_secs(total))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hours, rest) = (self.seconds / 3600, self.seconds % 3600);
        let (minutes, seconds) = (rest / 60, rest % 60);

        let mut wrote = false;
        for (value, unit) in [(hours, "h"), (minutes, "m"), (seconds, "s")] {
            if value > 0 {
                write!(f, "{}{}", value, unit)?;
                wrote = true;
            }
        }
        if !wrote {
            write!(f, "0s")?;
        }
        Ok(())
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_max_duration()
    }
}
