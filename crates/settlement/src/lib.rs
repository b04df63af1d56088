//! Payment settlement: webhook verification and idempotent event
//! application.

mod error;
mod processor;
mod verify;

pub use error::{Result, SettlementError};
pub use processor::{Outcome, PaymentEventProcessor};
pub use verify::{ParsedEvent, WebhookVerifier, parse_event, parse_ipn_event};
