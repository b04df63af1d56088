//! Reservation error types.

use calendar::CalendarError;
use common::BookingId;
use domain::{BookingError, PricingError};
use store::StoreError;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::validate::ValidationError;

/// Errors from the booking orchestrator.
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Request failed input validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Caller exceeded the reservation rate limit.
    #[error("too many reservation attempts, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Calendar rejected the requested range.
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    /// Quote computation failed.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The booking and its hold exist, but the payment intent could not
    /// be created. The reservation is kept for follow-up.
    #[error("booking {booking_id} is reserved but payment could not be started: {source}")]
    Gateway {
        booking_id: BookingId,
        source: GatewayError,
    },

    /// No booking with this id.
    #[error("booking not found: {0}")]
    NotFound(BookingId),

    /// The booking's current status forbids the requested action.
    #[error(transparent)]
    State(#[from] BookingError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for reservation results.
pub type Result<T> = std::result::Result<T, ReservationError>;
