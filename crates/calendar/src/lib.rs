//! Availability calendar: hold placement, conflict detection, expiry.

mod calendar;
mod error;

pub use calendar::AvailabilityCalendar;
pub use error::{CalendarError, Result};
