//! Message rendering.

use domain::NotificationKind;
use serde_json::Value;

/// A rendered message ready to hand to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

fn field<'a>(data: &'a Value, key: &str) -> &'a str {
    data.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Renders the message for a notification kind from its template data.
///
/// Template data is the flat JSON object captured when the notification
/// was triggered, so a queued retry renders exactly what the inline
/// attempt would have sent.
pub fn render(kind: NotificationKind, recipient: &str, data: &Value) -> Message {
    let booking_id = field(data, "booking_id");
    let item_id = field(data, "item_id");
    let range = field(data, "range");
    let total = field(data, "total");
    let reason = field(data, "reason");

    let (subject, body) = match kind {
        NotificationKind::BookingConfirmed => (
            format!("Your booking {booking_id} is confirmed"),
            format!(
                "Great news! Your booking of {item_id} for {range} is confirmed. \
                 Total charged: {total}. We look forward to hosting you."
            ),
        ),
        NotificationKind::PaymentFailed => (
            format!("Payment failed for booking {booking_id}"),
            format!(
                "Unfortunately the payment for your booking of {item_id} ({range}) \
                 did not go through: {reason}. The dates have been released; \
                 please book again once your payment method is sorted."
            ),
        ),
        NotificationKind::RefundIssued => (
            format!("Refund issued for booking {booking_id}"),
            format!(
                "A refund of {total} for your booking of {item_id} ({range}) is on \
                 its way. Depending on your bank it can take a few business days."
            ),
        ),
        NotificationKind::OpsAlert => (
            format!("Operations alert for booking {booking_id}"),
            format!("Manual attention needed on booking {booking_id}: {reason}"),
        ),
        NotificationKind::DisputeAlert => (
            format!("Dispute opened on booking {booking_id}"),
            format!(
                "The payment provider reported a dispute on booking {booking_id} \
                 ({item_id}, {range}). Review and respond before the provider's deadline."
            ),
        ),
    };

    Message {
        recipient: recipient.to_string(),
        subject,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_confirmation() {
        let data = serde_json::json!({
            "booking_id": "b-1",
            "item_id": "yacht-01",
            "range": "[2027-07-01, 2027-07-05)",
            "total": "26100.00 USD",
        });
        let message = render(NotificationKind::BookingConfirmed, "ada@example.com", &data);
        assert_eq!(message.recipient, "ada@example.com");
        assert!(message.subject.contains("b-1"));
        assert!(message.body.contains("yacht-01"));
        assert!(message.body.contains("26100.00 USD"));
    }

    #[test]
    fn missing_fields_render_empty() {
        let message = render(
            NotificationKind::OpsAlert,
            "ops@example.com",
            &serde_json::json!({}),
        );
        assert!(message.subject.contains("booking "));
    }
}
