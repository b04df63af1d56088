//! Calendar error types.

use domain::DateRange;
use store::StoreError;
use thiserror::Error;

/// Errors from availability checks and hold placement.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// The item is not in the inventory catalog.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// The requested range intersects an owner blackout.
    #[error("range {requested} falls in a blackout period {blackout}")]
    Blackout {
        requested: DateRange,
        blackout: DateRange,
    },

    /// The stay is shorter than the item's minimum.
    #[error("{requested} nights requested, item requires at least {required}")]
    BelowMinimum { required: i64, requested: i64 },

    /// The range overlaps active holds or calendar-occupying bookings.
    #[error("date range unavailable ({} conflicting ranges)", conflicts.len())]
    Conflict { conflicts: Vec<DateRange> },

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for calendar results.
pub type Result<T> = std::result::Result<T, CalendarError>;
