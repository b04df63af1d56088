//! Shared identifier types used across the booking core.

mod types;

pub use types::{BookingId, EventId, HoldId, ItemId, JobId};
