//! Payment-gateway event types and the idempotency record.

use chrono::{DateTime, Utc};
use common::{BookingId, EventId};
use serde::{Deserialize, Serialize};

/// Kind of asynchronous gateway event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayEventKind {
    PaymentSucceeded,
    PaymentFailed,
    RefundCreated,
    DisputeCreated,
}

impl GatewayEventKind {
    /// Gateway wire name (`payment.succeeded` style).
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayEventKind::PaymentSucceeded => "payment.succeeded",
            GatewayEventKind::PaymentFailed => "payment.failed",
            GatewayEventKind::RefundCreated => "refund.created",
            GatewayEventKind::DisputeCreated => "dispute.created",
        }
    }

    /// Parses a gateway wire name. Unknown types are None and are dropped
    /// by the processor without side effects.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "payment.succeeded" => Some(GatewayEventKind::PaymentSucceeded),
            "payment.failed" => Some(GatewayEventKind::PaymentFailed),
            "refund.created" => Some(GatewayEventKind::RefundCreated),
            "dispute.created" => Some(GatewayEventKind::DisputeCreated),
            _ => None,
        }
    }
}

impl std::fmt::Display for GatewayEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A verified gateway event, decoded from a webhook or IPN payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    /// Event id assigned by the gateway. Applied at most once.
    pub external_id: String,
    pub kind: GatewayEventKind,
    /// Booking the event refers to (the intent's idempotency key).
    pub booking_id: BookingId,
    /// Raw payload, kept for audit.
    pub payload: serde_json::Value,
}

/// Idempotency record for a gateway event.
///
/// One row per external event id; `processed_at` is set after the booking
/// transition the event triggered has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEventRecord {
    pub id: EventId,
    pub external_id: String,
    pub kind: GatewayEventKind,
    pub booking_id: BookingId,
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl PaymentEventRecord {
    /// Creates an unprocessed record for a freshly verified event.
    pub fn from_event(event: &GatewayEvent) -> Self {
        Self {
            id: EventId::new(),
            external_id: event.external_id.clone(),
            kind: event.kind,
            booking_id: event.booking_id,
            payload: event.payload.clone(),
            received_at: Utc::now(),
            processed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_roundtrip() {
        for kind in [
            GatewayEventKind::PaymentSucceeded,
            GatewayEventKind::PaymentFailed,
            GatewayEventKind::RefundCreated,
            GatewayEventKind::DisputeCreated,
        ] {
            assert_eq!(GatewayEventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_wire_name_is_none() {
        assert_eq!(GatewayEventKind::parse("payment.pending"), None);
    }

    #[test]
    fn record_starts_unprocessed() {
        let event = GatewayEvent {
            external_id: "evt_123".to_string(),
            kind: GatewayEventKind::PaymentSucceeded,
            booking_id: BookingId::new(),
            payload: serde_json::json!({"amount": 100}),
        };
        let record = PaymentEventRecord::from_event(&event);
        assert_eq!(record.external_id, "evt_123");
        assert!(record.processed_at.is_none());
    }
}
