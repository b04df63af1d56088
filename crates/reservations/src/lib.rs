//! Reservation flow: validation, rate limiting, the payment gateway
//! contract, and the booking orchestrator.

mod error;
mod gateway;
mod orchestrator;
mod rate_limit;
mod validate;

pub use error::{ReservationError, Result};
pub use gateway::{GatewayError, InMemoryGateway, PaymentGateway, PaymentIntent};
pub use orchestrator::{BookingOrchestrator, Reservation};
pub use rate_limit::RateLimiter;
pub use validate::{AddOnRequest, ReservationRequest, ValidReservation, ValidationError, validate};
