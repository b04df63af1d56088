//! Idempotent application of gateway events to booking state.

use std::sync::Arc;

use chrono::Utc;
use domain::{Booking, BookingStatus, GatewayEvent, GatewayEventKind, NotificationKind, PaymentEventRecord};
use notifications::NotificationDispatcher;
use reservations::PaymentGateway;
use store::Store;

use crate::error::{Result, SettlementError};
use crate::verify::{ParsedEvent, WebhookVerifier, parse_event, parse_ipn_event};

/// How an event landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event changed booking state; the new status is attached.
    Applied(BookingStatus),
    /// The event id was already fully processed. No state change.
    Replayed,
    /// The event was acknowledged but not applicable: unknown kind,
    /// unknown booking, or a status that does not accept it.
    Ignored,
}

/// Applies gateway events to bookings exactly once.
///
/// The external event id is the idempotency key: the first arrival is
/// recorded and applied, any replay is detected and acknowledged
/// without touching state. An event recorded but not yet marked
/// processed (a crash mid-flight) is processed again on redelivery;
/// the status predicates make the second application a no-op.
pub struct PaymentEventProcessor<S> {
    store: S,
    dispatcher: Arc<NotificationDispatcher<S>>,
    gateway: Arc<dyn PaymentGateway>,
    verifier: WebhookVerifier,
    ops_recipient: String,
}

impl<S: Store> PaymentEventProcessor<S> {
    pub fn new(
        store: S,
        dispatcher: Arc<NotificationDispatcher<S>>,
        gateway: Arc<dyn PaymentGateway>,
        verifier: WebhookVerifier,
        ops_recipient: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            gateway,
            verifier,
            ops_recipient: ops_recipient.into(),
        }
    }

    /// Handles a signed webhook delivery: verifies the signature over
    /// the raw body, then parses and applies the event.
    pub async fn process_webhook(&self, body: &[u8], signature: &str) -> Result<Outcome> {
        self.verifier.verify(body, signature)?;
        self.process_parsed(parse_event(body)?).await
    }

    /// Handles an unsigned, form-encoded IPN delivery: the event id is
    /// confirmed with the gateway before anything is applied.
    pub async fn process_ipn(&self, body: &[u8]) -> Result<Outcome> {
        let parsed = parse_ipn_event(body)?;
        let external_id = match &parsed {
            ParsedEvent::Known(event) => event.external_id.clone(),
            ParsedEvent::UnknownKind { external_id, .. } => external_id.clone(),
        };
        if !self.gateway.verify_event(&external_id).await? {
            return Err(SettlementError::UnverifiedEvent(external_id));
        }
        self.process_parsed(parsed).await
    }

    async fn process_parsed(&self, parsed: ParsedEvent) -> Result<Outcome> {
        match parsed {
            ParsedEvent::Known(event) => self.process_event(event).await,
            ParsedEvent::UnknownKind { external_id, kind } => {
                metrics::counter!("settlement_events_ignored_total").increment(1);
                tracing::info!(external_id, kind, "ignoring unrecognized event kind");
                Ok(Outcome::Ignored)
            }
        }
    }

    /// Applies a parsed event. Safe to call repeatedly with the same
    /// event.
    #[tracing::instrument(
        skip(self, event),
        fields(external_id = %event.external_id, kind = event.kind.as_str(), booking_id = %event.booking_id)
    )]
    pub async fn process_event(&self, event: GatewayEvent) -> Result<Outcome> {
        let record = PaymentEventRecord::from_event(&event);
        if !self.store.insert_event_if_absent(&record).await? {
            let fully_processed = self
                .store
                .get_event(&event.external_id)
                .await?
                .is_some_and(|r| r.processed_at.is_some());
            if fully_processed {
                metrics::counter!("settlement_events_replayed_total").increment(1);
                tracing::info!("replayed event acknowledged");
                return Ok(Outcome::Replayed);
            }
            // Recorded but not processed: an earlier delivery died
            // mid-flight. Fall through and finish the job.
            tracing::warn!("resuming half-processed event");
        }

        let Some(mut booking) = self.store.get_booking(event.booking_id).await? else {
            metrics::counter!("settlement_events_ignored_total").increment(1);
            tracing::warn!("event references unknown booking");
            self.store
                .mark_event_processed(&event.external_id, Utc::now())
                .await?;
            return Ok(Outcome::Ignored);
        };

        let status_before = booking.status();
        let applied = match event.kind {
            GatewayEventKind::PaymentSucceeded => booking.confirm().is_ok(),
            GatewayEventKind::PaymentFailed => {
                status_before.can_fail() && booking.cancel("payment failed at gateway").is_ok()
            }
            GatewayEventKind::RefundCreated => booking.refund().is_ok(),
            GatewayEventKind::DisputeCreated => booking.flag_disputed().is_ok(),
        };

        if !applied {
            metrics::counter!("settlement_events_ignored_total").increment(1);
            tracing::warn!(
                status = status_before.as_str(),
                "event does not apply in current status, ignoring"
            );
            self.store
                .mark_event_processed(&event.external_id, Utc::now())
                .await?;
            return Ok(Outcome::Ignored);
        }

        let version = self
            .store
            .update_booking(&booking, booking.version())
            .await?;
        booking.set_version(version);

        // Confirmed bookings occupy the calendar through their status;
        // failed payments free the dates. Either way the hold is done.
        if matches!(
            booking.status(),
            BookingStatus::Confirmed | BookingStatus::Cancelled
        ) {
            self.store.release_hold(booking.id()).await?;
        }

        self.notify(&booking, event.kind).await;

        self.store
            .mark_event_processed(&event.external_id, Utc::now())
            .await?;

        metrics::counter!(
            "settlement_events_applied_total",
            "kind" => event.kind.as_str()
        )
        .increment(1);
        tracing::info!(
            from = status_before.as_str(),
            to = booking.status().as_str(),
            "event applied"
        );
        Ok(Outcome::Applied(booking.status()))
    }

    /// Notification failures never unwind a settled event; the
    /// dispatcher queues what it cannot send, and anything beyond that
    /// is only logged.
    async fn notify(&self, booking: &Booking, kind: GatewayEventKind) {
        let (notification, recipient) = match kind {
            GatewayEventKind::PaymentSucceeded => (
                NotificationKind::BookingConfirmed,
                booking.customer().email.clone(),
            ),
            GatewayEventKind::PaymentFailed => (
                NotificationKind::PaymentFailed,
                booking.customer().email.clone(),
            ),
            GatewayEventKind::RefundCreated => (
                NotificationKind::RefundIssued,
                booking.customer().email.clone(),
            ),
            GatewayEventKind::DisputeCreated => {
                (NotificationKind::DisputeAlert, self.ops_recipient.clone())
            }
        };

        let mut data = serde_json::json!({
            "booking_id": booking.id().to_string(),
            "item_id": booking.item_id().to_string(),
            "range": booking.range().to_string(),
            "total": booking.pricing().total.to_string(),
        });
        if kind == GatewayEventKind::PaymentFailed {
            data["reason"] = serde_json::Value::from("payment failed at gateway");
        }

        if let Err(e) = self
            .dispatcher
            .dispatch(notification, booking.id(), &recipient, data)
            .await
        {
            tracing::error!(
                booking_id = %booking.id(),
                kind = notification.as_str(),
                error = %e,
                "could not dispatch or queue notification"
            );
        }

        // A confirmed payment is announced to ops as well as the customer.
        if kind == GatewayEventKind::PaymentSucceeded {
            let ops_data = serde_json::json!({
                "booking_id": booking.id().to_string(),
                "reason": format!(
                    "payment received, {} confirmed for {}",
                    booking.item_id(),
                    booking.range()
                ),
            });
            if let Err(e) = self
                .dispatcher
                .dispatch(
                    NotificationKind::OpsAlert,
                    booking.id(),
                    &self.ops_recipient,
                    ops_data,
                )
                .await
            {
                tracing::error!(
                    booking_id = %booking.id(),
                    error = %e,
                    "could not dispatch or queue ops alert"
                );
            }
        }
    }
}
