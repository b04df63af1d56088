//! Store error types.

use common::BookingId;
use thiserror::Error;

/// Errors surfaced by repository implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional write lost an optimistic-concurrency race.
    #[error("version conflict on booking {booking_id}: expected {expected}, found {actual}")]
    VersionConflict {
        booking_id: BookingId,
        expected: i64,
        actual: i64,
    },

    /// Atomic hold insertion found an overlapping hold or booking.
    #[error("date range conflict on item {item_id}")]
    RangeConflict { item_id: String },

    /// Insert hit an existing row with the same key.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data failed to decode.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;
