//! In-memory store for tests and single-process runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, ItemId, JobId};
use domain::{Booking, DateRange, PaymentEventRecord};
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::repos::{BookingRepository, CalendarStore, NotificationJobStore, PaymentEventStore};
use crate::types::{Hold, JobStatus, NotificationJob};

#[derive(Default)]
struct Inner {
    bookings: HashMap<BookingId, Booking>,
    /// One hold per owning booking.
    holds: HashMap<BookingId, Hold>,
    payment_events: HashMap<String, PaymentEventRecord>,
    jobs: HashMap<JobId, NotificationJob>,
}

/// In-memory implementation of all four repositories.
///
/// A single lock guards every table, so cross-table operations like the
/// hold overlap check observe a consistent snapshot, mirroring what the
/// PostgreSQL implementation gets from a transaction.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bookings.
    pub async fn booking_count(&self) -> usize {
        self.inner.read().await.bookings.len()
    }

    /// Number of stored holds, expired ones included.
    pub async fn hold_count(&self) -> usize {
        self.inner.read().await.holds.len()
    }
}

fn occupied_ranges(inner: &Inner, item_id: &ItemId) -> Vec<DateRange> {
    inner
        .bookings
        .values()
        .filter(|b| b.item_id() == item_id && b.status().occupies_calendar())
        .map(|b| b.range())
        .collect()
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.bookings.contains_key(&booking.id()) {
            return Err(StoreError::Duplicate(booking.id().to_string()));
        }
        inner.bookings.insert(booking.id(), booking.clone());
        Ok(())
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn update_booking(&self, booking: &Booking, expected_version: i64) -> Result<i64> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .bookings
            .get_mut(&booking.id())
            .ok_or_else(|| StoreError::NotFound(booking.id().to_string()))?;

        if stored.version() != expected_version {
            return Err(StoreError::VersionConflict {
                booking_id: booking.id(),
                expected: expected_version,
                actual: stored.version(),
            });
        }

        let new_version = expected_version + 1;
        let mut updated = booking.clone();
        updated.set_version(new_version);
        *stored = updated;
        Ok(new_version)
    }

    async fn confirmed_ranges(&self, item_id: &ItemId) -> Result<Vec<DateRange>> {
        Ok(occupied_ranges(&*self.inner.read().await, item_id))
    }
}

#[async_trait]
impl CalendarStore for InMemoryStore {
    async fn insert_hold(&self, hold: &Hold) -> Result<()> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();

        let hold_conflict = inner.holds.values().any(|existing| {
            existing.item_id == hold.item_id
                && existing.booking_id != hold.booking_id
                && existing.is_active(now)
                && existing.range.overlaps(&hold.range)
        });
        let booking_conflict = occupied_ranges(&inner, &hold.item_id)
            .iter()
            .any(|r| r.overlaps(&hold.range));

        if hold_conflict || booking_conflict {
            return Err(StoreError::RangeConflict {
                item_id: hold.item_id.to_string(),
            });
        }

        // Re-hold: the owning booking's previous hold is replaced.
        inner.holds.insert(hold.booking_id, hold.clone());
        Ok(())
    }

    async fn active_holds(&self, item_id: &ItemId, now: DateTime<Utc>) -> Result<Vec<Hold>> {
        Ok(self
            .inner
            .read()
            .await
            .holds
            .values()
            .filter(|h| &h.item_id == item_id && h.is_active(now))
            .cloned()
            .collect())
    }

    async fn hold_for_booking(&self, booking_id: BookingId) -> Result<Option<Hold>> {
        Ok(self.inner.read().await.holds.get(&booking_id).cloned())
    }

    async fn release_hold(&self, booking_id: BookingId) -> Result<bool> {
        Ok(self.inner.write().await.holds.remove(&booking_id).is_some())
    }

    async fn purge_expired_holds(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut inner = self.inner.write().await;
        let before = inner.holds.len();
        inner.holds.retain(|_, h| h.is_active(now));
        Ok((before - inner.holds.len()) as u64)
    }
}

#[async_trait]
impl PaymentEventStore for InMemoryStore {
    async fn insert_event_if_absent(&self, record: &PaymentEventRecord) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.payment_events.contains_key(&record.external_id) {
            return Ok(false);
        }
        inner
            .payment_events
            .insert(record.external_id.clone(), record.clone());
        Ok(true)
    }

    async fn mark_event_processed(&self, external_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let record = inner
            .payment_events
            .get_mut(external_id)
            .ok_or_else(|| StoreError::NotFound(external_id.to_string()))?;
        record.processed_at = Some(at);
        Ok(())
    }

    async fn get_event(&self, external_id: &str) -> Result<Option<PaymentEventRecord>> {
        Ok(self
            .inner
            .read()
            .await
            .payment_events
            .get(external_id)
            .cloned())
    }
}

#[async_trait]
impl NotificationJobStore for InMemoryStore {
    async fn enqueue_job(&self, job: &NotificationJob) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::Duplicate(job.id.to_string()));
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn due_jobs(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<NotificationJob>> {
        let inner = self.inner.read().await;
        let mut due: Vec<NotificationJob> = inner
            .jobs
            .values()
            .filter(|j| j.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|j| j.next_retry_at);
        due.truncate(limit);
        Ok(due)
    }

    async fn reschedule_job(
        &self,
        id: JobId,
        attempts: u32,
        next_retry_at: DateTime<Utc>,
        last_error: &str,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.attempts = attempts;
        job.next_retry_at = next_retry_at;
        job.last_error = Some(last_error.to_string());
        Ok(())
    }

    async fn mark_job_delivered(&self, id: JobId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.status = JobStatus::Delivered;
        Ok(())
    }

    async fn drop_job(&self, id: JobId) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.status = JobStatus::Dropped;
        Ok(())
    }

    async fn dead_letter_job(&self, id: JobId, last_error: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        let job = inner
            .jobs
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        job.status = JobStatus::DeadLettered;
        job.last_error = Some(last_error.to_string());
        Ok(())
    }

    async fn get_job(&self, id: JobId) -> Result<Option<NotificationJob>> {
        Ok(self.inner.read().await.jobs.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::HoldId;
    use domain::{
        Customer, GatewayEvent, GatewayEventKind, InventoryItem, ItemCategory, Location, Money,
        NotificationKind, PricingConfig, ServiceTier, quote,
    };

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    fn test_booking(item: &str, start: &str, end: &str) -> Booking {
        let stay = range(start, end);
        let inventory = InventoryItem {
            id: ItemId::new(item),
            category: ItemCategory::Car,
            base_price: Money::from_major(1_000, domain::Currency::Usd),
            locations: vec![Location::Miami],
            min_rental_nights: 1,
            blackout_ranges: vec![],
        };
        let pricing = quote(
            &inventory,
            stay,
            Location::Miami,
            ServiceTier::Standard,
            &[],
            &PricingConfig::default(),
        )
        .unwrap();
        Booking::new(
            BookingId::new(),
            inventory.id,
            stay,
            Customer {
                full_name: "Grace Hopper".to_string(),
                email: "grace@example.com".to_string(),
                phone: None,
            },
            pricing,
        )
    }

    fn hold_for(booking: &Booking, ttl_minutes: i64) -> Hold {
        Hold {
            id: HoldId::new(),
            item_id: booking.item_id().clone(),
            booking_id: booking.id(),
            range: booking.range(),
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }

    #[tokio::test]
    async fn insert_and_get_booking() {
        let store = InMemoryStore::new();
        let booking = test_booking("car-01", "2026-07-01", "2026-07-04");
        store.insert_booking(&booking).await.unwrap();

        let loaded = store.get_booking(booking.id()).await.unwrap().unwrap();
        assert_eq!(loaded.id(), booking.id());

        assert!(matches!(
            store.insert_booking(&booking).await,
            Err(StoreError::Duplicate(_))
        ));
    }

    #[tokio::test]
    async fn update_booking_bumps_version() {
        let store = InMemoryStore::new();
        let mut booking = test_booking("car-01", "2026-07-01", "2026-07-04");
        store.insert_booking(&booking).await.unwrap();

        booking.confirm().unwrap();
        let new_version = store.update_booking(&booking, 1).await.unwrap();
        assert_eq!(new_version, 2);

        let loaded = store.get_booking(booking.id()).await.unwrap().unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.status(), domain::BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn update_booking_detects_version_conflict() {
        let store = InMemoryStore::new();
        let mut booking = test_booking("car-01", "2026-07-01", "2026-07-04");
        store.insert_booking(&booking).await.unwrap();

        booking.confirm().unwrap();
        store.update_booking(&booking, 1).await.unwrap();

        // Second writer still believes the version is 1.
        let result = store.update_booking(&booking, 1).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn confirmed_ranges_exclude_pending() {
        let store = InMemoryStore::new();
        let pending = test_booking("car-01", "2026-07-01", "2026-07-04");
        store.insert_booking(&pending).await.unwrap();

        let mut confirmed = test_booking("car-01", "2026-08-01", "2026-08-04");
        confirmed.confirm().unwrap();
        store.insert_booking(&confirmed).await.unwrap();

        let ranges = store.confirmed_ranges(&ItemId::new("car-01")).await.unwrap();
        assert_eq!(ranges, vec![range("2026-08-01", "2026-08-04")]);
    }

    #[tokio::test]
    async fn insert_hold_rejects_overlap() {
        let store = InMemoryStore::new();
        let first = test_booking("car-01", "2026-07-01", "2026-07-05");
        let second = test_booking("car-01", "2026-07-03", "2026-07-08");

        store.insert_hold(&hold_for(&first, 15)).await.unwrap();
        let result = store.insert_hold(&hold_for(&second, 15)).await;
        assert!(matches!(result, Err(StoreError::RangeConflict { .. })));
    }

    #[tokio::test]
    async fn insert_hold_allows_re_hold_by_same_booking() {
        let store = InMemoryStore::new();
        let booking = test_booking("car-01", "2026-07-01", "2026-07-05");

        store.insert_hold(&hold_for(&booking, 15)).await.unwrap();
        // Same booking re-holds (e.g. extended TTL): replaces, no conflict.
        store.insert_hold(&hold_for(&booking, 30)).await.unwrap();
        assert_eq!(store.hold_count().await, 1);
    }

    #[tokio::test]
    async fn insert_hold_ignores_expired_holds() {
        let store = InMemoryStore::new();
        let stale = test_booking("car-01", "2026-07-01", "2026-07-05");
        let fresh = test_booking("car-01", "2026-07-03", "2026-07-08");

        store.insert_hold(&hold_for(&stale, -5)).await.unwrap();
        store.insert_hold(&hold_for(&fresh, 15)).await.unwrap();
    }

    #[tokio::test]
    async fn insert_hold_rejects_confirmed_booking_overlap() {
        let store = InMemoryStore::new();
        let mut confirmed = test_booking("car-01", "2026-07-01", "2026-07-05");
        confirmed.confirm().unwrap();
        store.insert_booking(&confirmed).await.unwrap();

        let incoming = test_booking("car-01", "2026-07-04", "2026-07-08");
        let result = store.insert_hold(&hold_for(&incoming, 15)).await;
        assert!(matches!(result, Err(StoreError::RangeConflict { .. })));
    }

    #[tokio::test]
    async fn purge_expired_holds_frees_range() {
        let store = InMemoryStore::new();
        let booking = test_booking("car-01", "2026-07-01", "2026-07-05");
        store.insert_hold(&hold_for(&booking, -5)).await.unwrap();

        let purged = store.purge_expired_holds(Utc::now()).await.unwrap();
        assert_eq!(purged, 1);
        assert_eq!(store.hold_count().await, 0);
    }

    #[tokio::test]
    async fn event_insert_if_absent_detects_replay() {
        let store = InMemoryStore::new();
        let event = GatewayEvent {
            external_id: "evt_001".to_string(),
            kind: GatewayEventKind::PaymentSucceeded,
            booking_id: BookingId::new(),
            payload: serde_json::json!({}),
        };
        let record = PaymentEventRecord::from_event(&event);

        assert!(store.insert_event_if_absent(&record).await.unwrap());
        assert!(!store.insert_event_if_absent(&record).await.unwrap());
    }

    #[tokio::test]
    async fn event_mark_processed() {
        let store = InMemoryStore::new();
        let event = GatewayEvent {
            external_id: "evt_002".to_string(),
            kind: GatewayEventKind::PaymentFailed,
            booking_id: BookingId::new(),
            payload: serde_json::json!({}),
        };
        store
            .insert_event_if_absent(&PaymentEventRecord::from_event(&event))
            .await
            .unwrap();

        store
            .mark_event_processed("evt_002", Utc::now())
            .await
            .unwrap();
        let record = store.get_event("evt_002").await.unwrap().unwrap();
        assert!(record.processed_at.is_some());
    }

    #[tokio::test]
    async fn due_jobs_ordered_and_limited() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let booking_id = BookingId::new();

        for minutes_ago in [1, 30, 10] {
            let job = NotificationJob::new(
                NotificationKind::BookingConfirmed,
                booking_id,
                "guest@example.com",
                serde_json::json!({}),
                now - Duration::minutes(minutes_ago),
                "smtp timeout",
            );
            store.enqueue_job(&job).await.unwrap();
        }
        // Not yet due.
        let future_job = NotificationJob::new(
            NotificationKind::OpsAlert,
            booking_id,
            "ops@example.com",
            serde_json::json!({}),
            now + Duration::minutes(5),
            "smtp timeout",
        );
        store.enqueue_job(&future_job).await.unwrap();

        let due = store.due_jobs(now, 2).await.unwrap();
        assert_eq!(due.len(), 2);
        assert!(due[0].next_retry_at <= due[1].next_retry_at);
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let job = NotificationJob::new(
            NotificationKind::PaymentFailed,
            BookingId::new(),
            "guest@example.com",
            serde_json::json!({}),
            now,
            "provider down",
        );
        store.enqueue_job(&job).await.unwrap();

        store
            .reschedule_job(job.id, 2, now + Duration::minutes(25), "still down")
            .await
            .unwrap();
        let loaded = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.attempts, 2);
        assert_eq!(loaded.last_error.as_deref(), Some("still down"));

        store.dead_letter_job(job.id, "gave up").await.unwrap();
        let loaded = store.get_job(job.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::DeadLettered);
        assert!(store.due_jobs(now, 10).await.unwrap().is_empty());
    }
}
