//! Booking aggregate.

use chrono::{DateTime, Utc};
use common::{BookingId, ItemId};
use serde::{Deserialize, Serialize};

use crate::dates::DateRange;
use crate::error::BookingError;
use crate::pricing::PriceBreakdown;
use crate::status::BookingStatus;

/// Customer reference attached to a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// One applied status transition, kept for audit.
///
/// Bookings are never deleted; history rows accumulate instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub at: DateTime<Utc>,
    pub note: Option<String>,
}

/// A booking and its payment-driven lifecycle.
///
/// The pricing breakdown is computed once at creation and never changes.
/// Status is mutated only through the transition methods below, which
/// enforce the state machine; the `version` field backs optimistic
/// concurrency in the repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    id: BookingId,
    item_id: ItemId,
    range: DateRange,
    customer: Customer,
    pricing: PriceBreakdown,
    status: BookingStatus,
    /// Set by a dispute event on a confirmed/completed booking; pending
    /// manual review, not a status of its own.
    disputed: bool,
    payment_intent_ref: Option<String>,
    history: Vec<StatusChange>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl Booking {
    /// Creates a booking in `pending-payment`.
    pub fn new(
        id: BookingId,
        item_id: ItemId,
        range: DateRange,
        customer: Customer,
        pricing: PriceBreakdown,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            item_id,
            range,
            customer,
            pricing,
            status: BookingStatus::PendingPayment,
            disputed: false,
            payment_intent_ref: None,
            history: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    pub fn id(&self) -> BookingId {
        self.id
    }

    pub fn item_id(&self) -> &ItemId {
        &self.item_id
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn pricing(&self) -> &PriceBreakdown {
        &self.pricing
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub fn is_disputed(&self) -> bool {
        self.disputed
    }

    pub fn payment_intent_ref(&self) -> Option<&str> {
        self.payment_intent_ref.as_deref()
    }

    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Repository version for optimistic concurrency.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Called by the repository after a successful conditional write.
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Attaches the gateway's intent reference after intent creation.
    pub fn set_payment_intent_ref(&mut self, intent_ref: impl Into<String>) {
        self.payment_intent_ref = Some(intent_ref.into());
        self.updated_at = Utc::now();
    }

    /// Moves `pending-payment` bookings into `payment-processing`.
    pub fn mark_processing(&mut self) -> Result<(), BookingError> {
        self.transition(
            BookingStatus::PaymentProcessing,
            "mark processing",
            |s| s.can_mark_processing(),
            None,
        )
    }

    /// Applies a successful payment: booking is confirmed.
    pub fn confirm(&mut self) -> Result<(), BookingError> {
        self.transition(
            BookingStatus::Confirmed,
            "confirm",
            |s| s.can_confirm(),
            None,
        )
    }

    /// Applies a failed payment or a manual cancellation.
    pub fn cancel(&mut self, reason: impl Into<String>) -> Result<(), BookingError> {
        self.transition(
            BookingStatus::Cancelled,
            "cancel",
            |s| s.can_cancel(),
            Some(reason.into()),
        )
    }

    /// Marks the rental as having taken place.
    pub fn complete(&mut self) -> Result<(), BookingError> {
        self.transition(
            BookingStatus::Completed,
            "complete",
            |s| s.can_complete(),
            None,
        )
    }

    /// Applies a refund on a confirmed or completed booking.
    pub fn refund(&mut self) -> Result<(), BookingError> {
        self.transition(BookingStatus::Refunded, "refund", |s| s.can_refund(), None)
    }

    /// Flags a dispute. The status does not change; the flag marks the
    /// booking for manual review.
    pub fn flag_disputed(&mut self) -> Result<(), BookingError> {
        if !self.status.can_dispute() {
            return Err(BookingError::InvalidStateTransition {
                current: self.status,
                action: "flag dispute",
            });
        }
        self.disputed = true;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn transition(
        &mut self,
        to: BookingStatus,
        action: &'static str,
        allowed: impl Fn(&BookingStatus) -> bool,
        note: Option<String>,
    ) -> Result<(), BookingError> {
        if !allowed(&self.status) {
            return Err(BookingError::InvalidStateTransition {
                current: self.status,
                action,
            });
        }
        let now = Utc::now();
        self.history.push(StatusChange {
            from: self.status,
            to,
            at: now,
            note,
        });
        self.status = to;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{InventoryItem, ItemCategory, Location, ServiceTier};
    use crate::money::{Currency, Money};
    use crate::pricing::{PricingConfig, quote};
    use chrono::NaiveDate;
    use common::ItemId;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn test_booking() -> Booking {
        let range = DateRange::new(d("2026-07-01"), d("2026-07-04")).unwrap();
        let item = InventoryItem {
            id: ItemId::new("car-phantom-01"),
            category: ItemCategory::Car,
            base_price: Money::from_major(1_000, Currency::Usd),
            locations: vec![Location::Miami],
            min_rental_nights: 1,
            blackout_ranges: vec![],
        };
        let pricing = quote(
            &item,
            range,
            Location::Miami,
            ServiceTier::Standard,
            &[],
            &PricingConfig::default(),
        )
        .unwrap();
        Booking::new(
            BookingId::new(),
            item.id,
            range,
            Customer {
                full_name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: None,
            },
            pricing,
        )
    }

    #[test]
    fn new_booking_is_pending_payment() {
        let booking = test_booking();
        assert_eq!(booking.status(), BookingStatus::PendingPayment);
        assert!(!booking.is_disputed());
        assert!(booking.history().is_empty());
        assert_eq!(booking.version(), 1);
    }

    #[test]
    fn confirm_from_pending() {
        let mut booking = test_booking();
        booking.confirm().unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert_eq!(booking.history().len(), 1);
        assert_eq!(booking.history()[0].from, BookingStatus::PendingPayment);
        assert_eq!(booking.history()[0].to, BookingStatus::Confirmed);
    }

    #[test]
    fn confirm_from_processing() {
        let mut booking = test_booking();
        booking.mark_processing().unwrap();
        booking.confirm().unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);
    }

    #[test]
    fn cancel_records_reason() {
        let mut booking = test_booking();
        booking.cancel("card declined").unwrap();
        assert_eq!(booking.status(), BookingStatus::Cancelled);
        assert_eq!(booking.history()[0].note.as_deref(), Some("card declined"));
    }

    #[test]
    fn cancelled_booking_rejects_confirm() {
        let mut booking = test_booking();
        booking.cancel("card declined").unwrap();
        let result = booking.confirm();
        assert!(matches!(
            result,
            Err(BookingError::InvalidStateTransition { .. })
        ));
        assert_eq!(booking.status(), BookingStatus::Cancelled);
    }

    #[test]
    fn refund_requires_confirmation() {
        let mut booking = test_booking();
        assert!(booking.refund().is_err());

        booking.confirm().unwrap();
        booking.refund().unwrap();
        assert_eq!(booking.status(), BookingStatus::Refunded);
    }

    #[test]
    fn dispute_flags_without_status_change() {
        let mut booking = test_booking();
        booking.confirm().unwrap();
        booking.flag_disputed().unwrap();
        assert_eq!(booking.status(), BookingStatus::Confirmed);
        assert!(booking.is_disputed());
        // Flagging leaves no status-history row.
        assert_eq!(booking.history().len(), 1);
    }

    #[test]
    fn dispute_rejected_before_confirmation() {
        let mut booking = test_booking();
        assert!(booking.flag_disputed().is_err());
        assert!(!booking.is_disputed());
    }

    #[test]
    fn full_lifecycle_to_completed_then_refunded() {
        let mut booking = test_booking();
        booking.mark_processing().unwrap();
        booking.confirm().unwrap();
        booking.complete().unwrap();
        assert_eq!(booking.status(), BookingStatus::Completed);

        booking.refund().unwrap();
        assert_eq!(booking.status(), BookingStatus::Refunded);
        assert_eq!(booking.history().len(), 4);
    }

    #[test]
    fn pricing_is_immutable_through_transitions() {
        let mut booking = test_booking();
        let before = booking.pricing().clone();
        booking.confirm().unwrap();
        booking.complete().unwrap();
        assert_eq!(booking.pricing(), &before);
    }

    #[test]
    fn serialization_roundtrip() {
        let mut booking = test_booking();
        booking.confirm().unwrap();
        let json = serde_json::to_string(&booking).unwrap();
        let back: Booking = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id(), booking.id());
        assert_eq!(back.status(), BookingStatus::Confirmed);
        assert_eq!(back.history().len(), 1);
    }
}
