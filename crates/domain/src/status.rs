//! Booking status state machine.

use serde::{Deserialize, Serialize};

/// The status of a booking in its lifecycle.
///
/// Transitions:
/// ```text
/// PendingPayment ──► PaymentProcessing ──► Confirmed ──► Completed
///       │                  │                  │              │
///       ├──────────────────┴──────────────────┘              │
///       ▼                                                    ▼
///   Cancelled                              Refunded ◄────────┘
///                                             ▲
///                              Confirmed ─────┘
/// ```
///
/// Confirmed and Completed bookings can additionally carry a `disputed`
/// flag without leaving their status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Created, awaiting payment confirmation from the gateway.
    #[default]
    PendingPayment,

    /// The gateway has acknowledged the intent and is settling.
    PaymentProcessing,

    /// Payment succeeded; the dates are locked in.
    Confirmed,

    /// The rental took place.
    Completed,

    /// Payment failed or the customer withdrew (terminal).
    Cancelled,

    /// Money returned after confirmation or completion (terminal).
    Refunded,
}

impl BookingStatus {
    /// True if the gateway may move this booking into processing.
    pub fn can_mark_processing(&self) -> bool {
        matches!(self, BookingStatus::PendingPayment)
    }

    /// True if a payment-succeeded event applies in this status.
    pub fn can_confirm(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingPayment | BookingStatus::PaymentProcessing
        )
    }

    /// True if a payment-failed event applies in this status.
    pub fn can_fail(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingPayment | BookingStatus::PaymentProcessing
        )
    }

    /// True if the booking can be cancelled (failure or manual).
    pub fn can_cancel(&self) -> bool {
        matches!(
            self,
            BookingStatus::PendingPayment
                | BookingStatus::PaymentProcessing
                | BookingStatus::Confirmed
        )
    }

    /// True if the rental can be marked as having taken place.
    pub fn can_complete(&self) -> bool {
        matches!(self, BookingStatus::Confirmed)
    }

    /// True if a refund-created event applies in this status.
    pub fn can_refund(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    /// True if a dispute flag applies in this status.
    pub fn can_dispute(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Completed)
    }

    /// True if no event may move the booking to another status.
    ///
    /// Completed is not listed: it still accepts refund and dispute events,
    /// neither of which moves it backward.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Refunded)
    }

    /// True while the booking's hold should block the calendar.
    pub fn occupies_calendar(&self) -> bool {
        matches!(
            self,
            BookingStatus::Confirmed | BookingStatus::Completed
        )
    }

    /// Kebab-case status name as used on the wire and in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending-payment",
            BookingStatus::PaymentProcessing => "payment-processing",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Refunded => "refunded",
        }
    }

    /// Parses the kebab-case status name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending-payment" => Some(BookingStatus::PendingPayment),
            "payment-processing" => Some(BookingStatus::PaymentProcessing),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            "refunded" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
