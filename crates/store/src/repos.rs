//! Repository traits the core requires from the durable store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, ItemId, JobId};
use domain::{Booking, DateRange, PaymentEventRecord};

use crate::Result;
use crate::types::{Hold, NotificationJob};

/// Persistent access to bookings.
///
/// Bookings are never deleted; state changes go through `update` with an
/// optimistic version check so two concurrent writers cannot silently
/// overwrite each other.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Persists a new booking. `Duplicate` if the id already exists.
    async fn insert_booking(&self, booking: &Booking) -> Result<()>;

    /// Loads a booking by id.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Conditionally writes the booking's current state.
    ///
    /// Succeeds only if the stored version equals `expected_version`; the
    /// stored version then becomes `expected_version + 1`, which is also
    /// the return value. `VersionConflict` otherwise.
    async fn update_booking(&self, booking: &Booking, expected_version: i64) -> Result<i64>;

    /// Date ranges of bookings on this item that currently occupy the
    /// calendar (confirmed or completed).
    async fn confirmed_ranges(&self, item_id: &ItemId) -> Result<Vec<DateRange>>;
}

/// Persistent access to availability holds.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Atomically verifies that no active hold (other than one owned by
    /// the same booking) and no calendar-occupying booking overlaps the
    /// hold's range, then inserts it, replacing the owning booking's
    /// previous hold if present. `RangeConflict` on overlap.
    ///
    /// This is the write side of the per-item critical section; callers
    /// serialize per item, and the PostgreSQL implementation additionally
    /// takes a per-item advisory lock so multiple service instances stay
    /// correct.
    async fn insert_hold(&self, hold: &Hold) -> Result<()>;

    /// The active holds blocking an item's calendar.
    async fn active_holds(&self, item_id: &ItemId, now: DateTime<Utc>) -> Result<Vec<Hold>>;

    /// The hold owned by a booking, if any (expired or not).
    async fn hold_for_booking(&self, booking_id: BookingId) -> Result<Option<Hold>>;

    /// Deletes a booking's hold. Returns true if one existed.
    async fn release_hold(&self, booking_id: BookingId) -> Result<bool>;

    /// Deletes expired holds; returns how many were removed.
    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Idempotency ledger for gateway events.
#[async_trait]
pub trait PaymentEventStore: Send + Sync {
    /// Records the event if its external id is new. Returns `true` on
    /// first insertion, `false` if the id was already recorded (replay).
    /// The insert-or-detect is a single atomic operation.
    async fn insert_event_if_absent(&self, record: &PaymentEventRecord) -> Result<bool>;

    /// Stamps the event as applied to booking state.
    async fn mark_event_processed(&self, external_id: &str, at: DateTime<Utc>) -> Result<()>;

    /// Loads an event record by external id.
    async fn get_event(&self, external_id: &str) -> Result<Option<PaymentEventRecord>>;
}

/// Persistent retry queue for notifications.
#[async_trait]
pub trait NotificationJobStore: Send + Sync {
    /// Persists a new pending job.
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()>;

    /// Pending jobs whose `next_retry_at` has come due, oldest first.
    async fn due_jobs(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<NotificationJob>>;

    /// Pushes a job's retry forward after another failed attempt.
    async fn reschedule_job(
        &self,
        id: JobId,
        attempts: u32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<()>;

    /// Marks a job delivered.
    async fn mark_job_delivered(&self, id: JobId) -> Result<()>;

    /// Marks a job dropped because its content no longer matches the
    /// booking's status.
    async fn drop_job(&self, id: JobId) -> Result<()>;

    /// Parks a job after exhausting its attempts.
    async fn dead_letter_job(&self, id: JobId, last_error: &str) -> Result<()>;

    /// Loads a job by id.
    async fn get_job(&self, id: JobId) -> Result<Option<NotificationJob>>;
}

/// Everything the application wires together, in one bound.
pub trait Store:
    BookingRepository + CalendarStore + PaymentEventStore + NotificationJobStore + Clone + 'static
{
}

impl<T> Store for T where
    T: BookingRepository + CalendarStore + PaymentEventStore + NotificationJobStore + Clone + 'static
{
}
