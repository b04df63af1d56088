//! Domain error types.

use chrono::NaiveDate;
use thiserror::Error;

use crate::item::{ItemCategory, Location, ServiceTier};
use crate::money::Currency;
use crate::status::BookingStatus;

/// Invalid date-range construction.
#[derive(Debug, Error)]
pub enum DateRangeError {
    /// Zero-length or inverted range.
    #[error("date range is empty or inverted: {start}..{end}")]
    Empty { start: NaiveDate, end: NaiveDate },
}

/// Errors raised by booking state transitions.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The requested transition is not valid from the current status.
    #[error("cannot {action} a booking in {current} status")]
    InvalidStateTransition {
        current: BookingStatus,
        action: &'static str,
    },
}

/// Errors raised while computing a price breakdown.
#[derive(Debug, Error)]
pub enum PricingError {
    /// Amounts in two different currencies were combined.
    #[error("currency mismatch: expected {expected}, found {found}")]
    CurrencyMismatch { expected: Currency, found: Currency },

    /// The pricing configuration has no entry for the location.
    #[error("no pricing configuration for location {0:?}")]
    UnpricedLocation(Location),

    /// The pricing configuration has no entry for the item category.
    #[error("no pricing configuration for category {0:?}")]
    UnpricedCategory(ItemCategory),

    /// The item is not offered at the requested location.
    #[error("item is not available at {0:?}")]
    LocationNotSupported(Location),
}

/// Validation failures in a loaded pricing configuration.
#[derive(Debug, Error)]
pub enum PricingConfigError {
    /// A seasonal multiplier is zero or implausibly large.
    #[error("seasonal multiplier {bps} bps for {season} is out of range")]
    SeasonOutOfRange { season: &'static str, bps: u32 },

    /// A tier multiplier falls outside its allowed band.
    #[error("{tier:?} multiplier {bps} bps for {location:?} outside {min}..={max}")]
    TierOutOfBand {
        location: Location,
        tier: ServiceTier,
        bps: u32,
        min: u32,
        max: u32,
    },

    /// A percentage-style rate at or above 100%.
    #[error("{rate} rate {bps} bps for {scope} must be below 10000")]
    RateTooHigh {
        scope: String,
        rate: &'static str,
        bps: u32,
    },

    /// A location or category has no entry.
    #[error("missing pricing entry for {0}")]
    MissingEntry(String),

    /// A security deposit is negative.
    #[error("negative security deposit for {0:?}")]
    NegativeDeposit(ItemCategory),
}
