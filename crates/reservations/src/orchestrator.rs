//! Booking orchestrator: the reservation and cancellation flows.

use std::sync::Arc;

use calendar::AvailabilityCalendar;
use common::BookingId;
use domain::{Booking, InventoryCatalog, PricingConfig, quote};
use store::{Hold, Store};

use crate::error::{ReservationError, Result};
use crate::gateway::{PaymentGateway, PaymentIntent};
use crate::rate_limit::RateLimiter;
use crate::validate::{ReservationRequest, ValidationError, validate};

/// Outcome of a successful reservation: the booking is persisted in
/// `payment-processing`, its hold blocks the calendar, and the client
/// completes the charge with the intent's secret.
#[derive(Debug, Clone)]
pub struct Reservation {
    pub booking: Booking,
    pub hold: Hold,
    pub payment: PaymentIntent,
}

/// Coordinates validation, the calendar, pricing, persistence, and the
/// payment gateway into the reservation flow.
///
/// The flow order is fixed: the hold is taken before the booking is
/// persisted, and the payment intent is created last, so a failure at
/// any step leaves no charge without a booking. A gateway failure
/// deliberately keeps both the booking and its hold; the hold's expiry
/// is the cleanup if nobody follows up.
pub struct BookingOrchestrator<S> {
    store: S,
    calendar: Arc<AvailabilityCalendar<S>>,
    catalog: Arc<dyn InventoryCatalog>,
    gateway: Arc<dyn PaymentGateway>,
    pricing: PricingConfig,
    limiter: RateLimiter,
}

impl<S: Store> BookingOrchestrator<S> {
    pub fn new(
        store: S,
        calendar: Arc<AvailabilityCalendar<S>>,
        catalog: Arc<dyn InventoryCatalog>,
        gateway: Arc<dyn PaymentGateway>,
        pricing: PricingConfig,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            store,
            calendar,
            catalog,
            gateway,
            pricing,
            limiter,
        }
    }

    /// Runs the full reservation flow. `rate_key` buckets the caller for
    /// rate limiting, typically the customer email.
    #[tracing::instrument(skip(self, request), fields(item_id = %request.item_id))]
    pub async fn reserve(&self, request: &ReservationRequest, rate_key: &str) -> Result<Reservation> {
        if let Err(retry_after) = self.limiter.check(rate_key).await {
            metrics::counter!("reservations_rate_limited_total").increment(1);
            return Err(ReservationError::RateLimited {
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        let valid = validate(request)?;

        let item = self
            .catalog
            .get(&valid.item_id)
            .await
            .ok_or_else(|| calendar::CalendarError::UnknownItem(valid.item_id.to_string()))?;

        let booking_id = BookingId::new();
        let hold = self
            .calendar
            .place_hold(booking_id, &valid.item_id, valid.range)
            .await?;

        let pricing = match quote(
            &item,
            valid.range,
            valid.location,
            valid.tier,
            &valid.add_ons,
            &self.pricing,
        ) {
            Ok(pricing) => pricing,
            Err(e) => {
                self.calendar.release_hold(booking_id).await?;
                return Err(e.into());
            }
        };
        if !pricing.total.is_positive() {
            self.calendar.release_hold(booking_id).await?;
            return Err(ValidationError::NonPositiveTotal.into());
        }

        let mut booking = Booking::new(
            booking_id,
            valid.item_id.clone(),
            valid.range,
            valid.customer,
            pricing,
        );
        if let Err(e) = self.store.insert_booking(&booking).await {
            self.calendar.release_hold(booking_id).await?;
            return Err(e.into());
        }

        let total = booking.pricing().total;
        let payment = match self.gateway.create_intent(booking_id, total).await {
            Ok(payment) => payment,
            Err(source) => {
                // Booking and hold survive; ops or a client retry picks
                // this up before the hold expires.
                metrics::counter!("reservations_gateway_failures_total").increment(1);
                tracing::warn!(
                    booking_id = %booking_id,
                    error = %source,
                    "payment intent creation failed, keeping reservation"
                );
                return Err(ReservationError::Gateway { booking_id, source });
            }
        };

        booking.set_payment_intent_ref(&payment.intent_ref);
        booking.mark_processing()?;
        let version = self.store.update_booking(&booking, booking.version()).await?;
        booking.set_version(version);

        metrics::counter!("reservations_created_total").increment(1);
        tracing::info!(
            booking_id = %booking_id,
            item_id = %booking.item_id(),
            range = %booking.range(),
            total = %total,
            "reservation created"
        );

        Ok(Reservation {
            booking,
            hold,
            payment,
        })
    }

    /// Loads a booking.
    pub async fn get(&self, booking_id: BookingId) -> Result<Booking> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or(ReservationError::NotFound(booking_id))
    }

    /// Manually cancels a booking and frees its calendar range.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, booking_id: BookingId, reason: &str) -> Result<Booking> {
        let mut booking = self.get(booking_id).await?;
        booking.cancel(reason)?;

        let version = self.store.update_booking(&booking, booking.version()).await?;
        booking.set_version(version);
        self.calendar.release_hold(booking_id).await?;

        metrics::counter!("reservations_cancelled_total").increment(1);
        tracing::info!(booking_id = %booking_id, reason, "booking cancelled");
        Ok(booking)
    }
}
