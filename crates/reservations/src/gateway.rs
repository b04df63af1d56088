//! Payment gateway contract.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use common::BookingId;
use domain::Money;
use thiserror::Error;
use tokio::sync::RwLock;

/// A payment intent created at the gateway. The client completes the
/// charge out of band using the secret; the outcome arrives as a
/// webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub intent_ref: String,
    pub client_secret: String,
}

/// Gateway-side failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway could not be reached or returned a server error.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway refused the request.
    #[error("gateway rejected: {0}")]
    Rejected(String),
}

/// Outbound calls to the payment provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates (or returns the existing) payment intent for a booking.
    ///
    /// The booking id is the idempotency key; calling twice for the same
    /// booking must not create a second charge.
    async fn create_intent(
        &self,
        booking_id: BookingId,
        amount: Money,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Confirms with the gateway that it really emitted this event id.
    /// Used for notification channels that carry no signature.
    async fn verify_event(&self, external_id: &str) -> Result<bool, GatewayError>;
}

#[derive(Default)]
struct GatewayInner {
    intents: HashMap<BookingId, PaymentIntent>,
    known_events: HashSet<String>,
    fail_on_create: bool,
    fail_on_verify: bool,
}

/// In-memory gateway for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    inner: Arc<RwLock<GatewayInner>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `create_intent` calls fail.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.inner.write().await.fail_on_create = fail;
    }

    /// Makes subsequent `verify_event` calls fail.
    pub async fn set_fail_on_verify(&self, fail: bool) {
        self.inner.write().await.fail_on_verify = fail;
    }

    /// Registers an event id as genuinely emitted by the gateway.
    pub async fn register_event(&self, external_id: impl Into<String>) {
        self.inner.write().await.known_events.insert(external_id.into());
    }

    /// Number of distinct intents created.
    pub async fn intent_count(&self) -> usize {
        self.inner.read().await.intents.len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn create_intent(
        &self,
        booking_id: BookingId,
        _amount: Money,
    ) -> Result<PaymentIntent, GatewayError> {
        let mut inner = self.inner.write().await;
        if inner.fail_on_create {
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        let intent = inner
            .intents
            .entry(booking_id)
            .or_insert_with(|| PaymentIntent {
                intent_ref: format!("pi_{}", booking_id.as_uuid().simple()),
                client_secret: format!("secret_{}", booking_id.as_uuid().simple()),
            });
        Ok(intent.clone())
    }

    async fn verify_event(&self, external_id: &str) -> Result<bool, GatewayError> {
        let inner = self.inner.read().await;
        if inner.fail_on_verify {
            return Err(GatewayError::Unavailable("simulated outage".to_string()));
        }
        Ok(inner.known_events.contains(external_id))
    }
}
