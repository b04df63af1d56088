//! Currency-tagged money in minor units.

use serde::{Deserialize, Serialize};

use crate::error::PricingError;

/// Settlement currency for a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
    Aed,
}

impl Currency {
    /// ISO 4217 code.
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Aed => "AED",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary amount in the currency's minor unit (cents, fils, pence).
///
/// All four supported currencies have a minor-unit exponent of 2. Amounts
/// are tagged with their currency; arithmetic across currencies is rejected
/// rather than silently mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    minor_units: i64,
    currency: Currency,
}

impl Money {
    /// Creates an amount from minor units.
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Creates an amount from whole major units (e.g. dollars).
    pub fn from_major(major: i64, currency: Currency) -> Self {
        Self {
            minor_units: major * 100,
            currency,
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: Currency) -> Self {
        Self {
            minor_units: 0,
            currency,
        }
    }

    /// Amount in minor units.
    pub fn minor_units(&self) -> i64 {
        self.minor_units
    }

    /// The currency tag.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is strictly positive.
    pub fn is_positive(&self) -> bool {
        self.minor_units > 0
    }

    /// Adds another amount of the same currency.
    pub fn try_add(&self, other: Money) -> Result<Money, PricingError> {
        if self.currency != other.currency {
            return Err(PricingError::CurrencyMismatch {
                expected: self.currency,
                found: other.currency,
            });
        }
        Ok(Money {
            minor_units: self.minor_units + other.minor_units,
            currency: self.currency,
        })
    }

    /// Multiplies by a whole count (nights, quantity).
    pub fn times(&self, count: i64) -> Money {
        Money {
            minor_units: self.minor_units * count,
            currency: self.currency,
        }
    }

    /// Applies a basis-point rate with round-half-up.
    ///
    /// 10_000 bps = 1.0×. Rounding happens here, once per additive stage,
    /// so repeated application does not accumulate drift.
    pub fn apply_bps(&self, bps: u32) -> Money {
        Money {
            minor_units: round_half_up_bps(self.minor_units, bps),
            currency: self.currency,
        }
    }
}

/// `value * bps / 10_000`, rounded half-up. Values are non-negative in all
/// pricing stages.
pub(crate) fn round_half_up_bps(value: i64, bps: u32) -> i64 {
    (value * bps as i64 + 5_000) / 10_000
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.minor_units < 0 { "-" } else { "" };
        let abs = self.minor_units.abs();
        write!(
            f,
            "{sign}{}.{:02} {}",
            abs / 100,
            abs % 100,
            self.currency.code()
        )
    }
}
