//! Settlement error types.

use reservations::GatewayError;
use store::StoreError;
use thiserror::Error;

/// Errors from webhook verification and event processing.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// The webhook signature did not match the shared secret.
    #[error("invalid webhook signature")]
    BadSignature,

    /// The event payload could not be parsed.
    #[error("malformed event payload: {0}")]
    Malformed(String),

    /// The gateway denied knowledge of an IPN event id.
    #[error("gateway does not recognize event {0}")]
    UnverifiedEvent(String),

    /// The gateway could not be reached for verification.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias for settlement results.
pub type Result<T> = std::result::Result<T, SettlementError>;
