//! Transactional notification kinds.

use serde::{Deserialize, Serialize};

use crate::status::BookingStatus;

/// Kind of transactional message the platform sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Customer confirmation after a successful payment.
    BookingConfirmed,
    /// Customer notice with recovery guidance after a failed payment.
    PaymentFailed,
    /// Customer notice after a refund is issued.
    RefundIssued,
    /// Operations alert (new confirmed booking, dead-lettered job, ...).
    OpsAlert,
    /// High-priority operations alert for a payment dispute.
    DisputeAlert,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingConfirmed => "booking-confirmed",
            NotificationKind::PaymentFailed => "payment-failed",
            NotificationKind::RefundIssued => "refund-issued",
            NotificationKind::OpsAlert => "ops-alert",
            NotificationKind::DisputeAlert => "dispute-alert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booking-confirmed" => Some(NotificationKind::BookingConfirmed),
            "payment-failed" => Some(NotificationKind::PaymentFailed),
            "refund-issued" => Some(NotificationKind::RefundIssued),
            "ops-alert" => Some(NotificationKind::OpsAlert),
            "dispute-alert" => Some(NotificationKind::DisputeAlert),
            _ => None,
        }
    }

    /// True if a deferred send of this message is still correct for the
    /// booking's current status. Retried jobs check this before sending so
    /// a booking cancelled after enqueue never receives a stale
    /// confirmation.
    pub fn is_consistent_with(&self, status: BookingStatus) -> bool {
        match self {
            NotificationKind::BookingConfirmed => {
                matches!(status, BookingStatus::Confirmed | BookingStatus::Completed)
            }
            NotificationKind::PaymentFailed => matches!(status, BookingStatus::Cancelled),
            NotificationKind::RefundIssued => matches!(status, BookingStatus::Refunded),
            // Ops alerts describe something that happened; they never go stale.
            NotificationKind::OpsAlert | NotificationKind::DisputeAlert => true,
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_roundtrip() {
        for kind in [
            NotificationKind::BookingConfirmed,
            NotificationKind::PaymentFailed,
            NotificationKind::RefundIssued,
            NotificationKind::OpsAlert,
            NotificationKind::DisputeAlert,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn stale_confirmation_detected_after_cancellation() {
        assert!(NotificationKind::BookingConfirmed.is_consistent_with(BookingStatus::Confirmed));
        assert!(!NotificationKind::BookingConfirmed.is_consistent_with(BookingStatus::Cancelled));
    }

    #[test]
    fn ops_alerts_never_go_stale() {
        for status in [
            BookingStatus::PendingPayment,
            BookingStatus::Cancelled,
            BookingStatus::Refunded,
        ] {
            assert!(NotificationKind::OpsAlert.is_consistent_with(status));
            assert!(NotificationKind::DisputeAlert.is_consistent_with(status));
        }
    }
}
