//! Webhook signature verification and event payload parsing.

use common::BookingId;
use domain::{GatewayEvent, GatewayEventKind};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{Result, SettlementError};

type HmacSha256 = Hmac<Sha256>;

/// Verifies gateway webhook signatures.
///
/// The gateway signs the raw request body with HMAC-SHA256 over a shared
/// secret and sends the hex digest in a header. Verification happens on
/// the exact bytes received, before any parsing.
pub struct WebhookVerifier {
    secret: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Checks `signature_hex` against the body. Constant-time compare.
    pub fn verify(&self, body: &[u8], signature_hex: &str) -> Result<()> {
        let expected = hex::decode(signature_hex).map_err(|_| SettlementError::BadSignature)?;
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|_| SettlementError::BadSignature)?;
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| SettlementError::BadSignature)
    }

    /// Signs a body the way the gateway would. Test and tooling helper.
    pub fn sign(&self, body: &[u8]) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

/// Event body as the gateway sends it.
#[derive(Debug, Deserialize)]
struct WireEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    booking_id: Uuid,
    #[serde(default)]
    data: serde_json::Value,
}

/// A parsed event body: either a kind we settle, or one we acknowledge
/// and skip.
#[derive(Debug)]
pub enum ParsedEvent {
    Known(GatewayEvent),
    UnknownKind { external_id: String, kind: String },
}

/// Parses a raw event body. Unknown event kinds parse successfully so
/// the caller can acknowledge them; structural problems are errors.
pub fn parse_event(body: &[u8]) -> Result<ParsedEvent> {
    let wire: WireEvent =
        serde_json::from_slice(body).map_err(|e| SettlementError::Malformed(e.to_string()))?;
    if wire.id.is_empty() {
        return Err(SettlementError::Malformed("empty event id".to_string()));
    }

    match GatewayEventKind::parse(&wire.kind) {
        Some(kind) => Ok(ParsedEvent::Known(GatewayEvent {
            external_id: wire.id,
            kind,
            booking_id: BookingId::from_uuid(wire.booking_id),
            payload: wire.data,
        })),
        None => Ok(ParsedEvent::UnknownKind {
            external_id: wire.id,
            kind: wire.kind,
        }),
    }
}

/// IPN body as the gateway posts it, form-encoded.
#[derive(Debug, Deserialize)]
struct WireForm {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    booking_id: Uuid,
}

/// Parses a form-encoded IPN body. Same leniency as [`parse_event`]:
/// unknown kinds parse successfully, structural problems are errors.
pub fn parse_ipn_event(body: &[u8]) -> Result<ParsedEvent> {
    let wire: WireForm = serde_urlencoded::from_bytes(body)
        .map_err(|e| SettlementError::Malformed(e.to_string()))?;
    if wire.id.is_empty() {
        return Err(SettlementError::Malformed("empty event id".to_string()));
    }

    match GatewayEventKind::parse(&wire.kind) {
        Some(kind) => Ok(ParsedEvent::Known(GatewayEvent {
            external_id: wire.id,
            kind,
            booking_id: BookingId::from_uuid(wire.booking_id),
            payload: serde_json::Value::Null,
        })),
        None => Ok(ParsedEvent::UnknownKind {
            external_id: wire.id,
            kind: wire.kind,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_round_trip() {
        let verifier = WebhookVerifier::new(b"whsec_test".to_vec());
        let body = br#"{"id":"evt_1"}"#;
        let signature = verifier.sign(body);
        verifier.verify(body, &signature).unwrap();
    }

    #[test]
    fn rejects_tampered_body() {
        let verifier = WebhookVerifier::new(b"whsec_test".to_vec());
        let signature = verifier.sign(br#"{"id":"evt_1"}"#);
        let result = verifier.verify(br#"{"id":"evt_2"}"#, &signature);
        assert!(matches!(result, Err(SettlementError::BadSignature)));
    }

    #[test]
    fn rejects_wrong_secret() {
        let signer = WebhookVerifier::new(b"whsec_a".to_vec());
        let verifier = WebhookVerifier::new(b"whsec_b".to_vec());
        let body = br#"{"id":"evt_1"}"#;
        let signature = signer.sign(body);
        assert!(matches!(
            verifier.verify(body, &signature),
            Err(SettlementError::BadSignature)
        ));
    }

    #[test]
    fn rejects_non_hex_signature() {
        let verifier = WebhookVerifier::new(b"whsec_test".to_vec());
        assert!(matches!(
            verifier.verify(b"{}", "not hex!"),
            Err(SettlementError::BadSignature)
        ));
    }

    #[test]
    fn parses_known_event() {
        let booking_id = Uuid::new_v4();
        let body = serde_json::json!({
            "id": "evt_42",
            "type": "payment.succeeded",
            "booking_id": booking_id,
            "data": { "amount": 100 },
        });
        let parsed = parse_event(body.to_string().as_bytes()).unwrap();
        match parsed {
            ParsedEvent::Known(event) => {
                assert_eq!(event.external_id, "evt_42");
                assert_eq!(event.kind, GatewayEventKind::PaymentSucceeded);
                assert_eq!(event.booking_id.as_uuid(), booking_id);
            }
            other => panic!("expected known event, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let body = serde_json::json!({
            "id": "evt_43",
            "type": "payout.created",
            "booking_id": Uuid::new_v4(),
        });
        let parsed = parse_event(body.to_string().as_bytes()).unwrap();
        assert!(matches!(
            parsed,
            ParsedEvent::UnknownKind { ref kind, .. } if kind == "payout.created"
        ));
    }

    #[test]
    fn parses_form_encoded_ipn() {
        let booking_id = Uuid::new_v4();
        let body = format!("id=evt_9&type=refund.created&booking_id={booking_id}");
        let parsed = parse_ipn_event(body.as_bytes()).unwrap();
        match parsed {
            ParsedEvent::Known(event) => {
                assert_eq!(event.external_id, "evt_9");
                assert_eq!(event.kind, GatewayEventKind::RefundCreated);
                assert_eq!(event.booking_id.as_uuid(), booking_id);
            }
            other => panic!("expected known event, got {other:?}"),
        }
    }

    #[test]
    fn malformed_ipn_body_is_an_error() {
        assert!(matches!(
            parse_ipn_event(b"id=evt_9&type=refund.created"),
            Err(SettlementError::Malformed(_))
        ));
        assert!(matches!(
            parse_ipn_event(b"id=evt_9&type=refund.created&booking_id=not-a-uuid"),
            Err(SettlementError::Malformed(_))
        ));
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(matches!(
            parse_event(b"not json"),
            Err(SettlementError::Malformed(_))
        ));
        assert!(matches!(
            parse_event(br#"{"id":"","type":"payment.succeeded","booking_id":"00000000-0000-0000-0000-000000000000"}"#),
            Err(SettlementError::Malformed(_))
        ));
    }
}
