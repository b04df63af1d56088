//! Availability checks and hold placement.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{BookingId, HoldId, ItemId};
use domain::{DateRange, InventoryCatalog, InventoryItem};
use store::{BookingRepository, CalendarStore, Hold, StoreError};
use tokio::sync::Mutex;

use crate::error::{CalendarError, Result};

/// Gatekeeper for an item's calendar.
///
/// All writes to an item's availability go through `place_hold`, which
/// serializes per item within the process and relies on the store's
/// atomic overlap recheck for cross-instance safety. A date range is
/// available when it clears the item's blackouts and minimum stay and
/// overlaps neither an unexpired hold nor a confirmed booking.
pub struct AvailabilityCalendar<S> {
    catalog: Arc<dyn InventoryCatalog>,
    store: S,
    hold_ttl: Duration,
    item_locks: Mutex<HashMap<ItemId, Arc<Mutex<()>>>>,
}

impl<S> AvailabilityCalendar<S>
where
    S: CalendarStore + BookingRepository,
{
    /// Creates a calendar over the given catalog and store. `hold_ttl`
    /// is how long a placed hold blocks the calendar before expiring.
    pub fn new(catalog: Arc<dyn InventoryCatalog>, store: S, hold_ttl: Duration) -> Self {
        Self {
            catalog,
            store,
            hold_ttl,
            item_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn item_lock(&self, item_id: &ItemId) -> Arc<Mutex<()>> {
        let mut locks = self.item_locks.lock().await;
        locks.entry(item_id.clone()).or_default().clone()
    }

    async fn lookup_item(&self, item_id: &ItemId) -> Result<InventoryItem> {
        self.catalog
            .get(item_id)
            .await
            .ok_or_else(|| CalendarError::UnknownItem(item_id.to_string()))
    }

    fn check_item_rules(item: &InventoryItem, range: &DateRange) -> Result<()> {
        if let Some(blackout) = item.blackout_conflict(range) {
            return Err(CalendarError::Blackout {
                requested: *range,
                blackout: *blackout,
            });
        }
        if range.nights() < item.min_rental_nights {
            return Err(CalendarError::BelowMinimum {
                required: item.min_rental_nights,
                requested: range.nights(),
            });
        }
        Ok(())
    }

    /// Ranges blocking the item's calendar that overlap `range`,
    /// excluding a hold owned by `exclude_booking`.
    async fn conflicts(
        &self,
        item_id: &ItemId,
        range: &DateRange,
        exclude_booking: Option<BookingId>,
        now: DateTime<Utc>,
    ) -> Result<Vec<DateRange>> {
        let mut conflicts: Vec<DateRange> = self
            .store
            .active_holds(item_id, now)
            .await?
            .into_iter()
            .filter(|h| Some(h.booking_id) != exclude_booking)
            .map(|h| h.range)
            .filter(|r| r.overlaps(range))
            .collect();

        conflicts.extend(
            self.store
                .confirmed_ranges(item_id)
                .await?
                .into_iter()
                .filter(|r| r.overlaps(range)),
        );

        conflicts.sort_by_key(|r| r.start());
        Ok(conflicts)
    }

    /// Checks whether a range is open, without reserving anything.
    ///
    /// The answer is advisory; only `place_hold` guarantees the range.
    pub async fn check(&self, item_id: &ItemId, range: DateRange) -> Result<()> {
        let item = self.lookup_item(item_id).await?;
        Self::check_item_rules(&item, &range)?;

        let conflicts = self.conflicts(item_id, &range, None, Utc::now()).await?;
        if !conflicts.is_empty() {
            return Err(CalendarError::Conflict { conflicts });
        }
        Ok(())
    }

    /// Reserves a range for a booking pending payment.
    ///
    /// Re-invoking for the same booking replaces its previous hold, so
    /// a retried reservation does not conflict with itself. Exactly one
    /// of two concurrent calls for overlapping ranges succeeds.
    pub async fn place_hold(
        &self,
        booking_id: BookingId,
        item_id: &ItemId,
        range: DateRange,
    ) -> Result<Hold> {
        let item = self.lookup_item(item_id).await?;
        Self::check_item_rules(&item, &range)?;

        let lock = self.item_lock(item_id).await;
        let _guard = lock.lock().await;

        let now = Utc::now();
        let conflicts = self
            .conflicts(item_id, &range, Some(booking_id), now)
            .await?;
        if !conflicts.is_empty() {
            metrics::counter!("calendar_hold_conflicts_total").increment(1);
            return Err(CalendarError::Conflict { conflicts });
        }

        let hold = Hold {
            id: HoldId::new(),
            item_id: item_id.clone(),
            booking_id,
            range,
            expires_at: now + self.hold_ttl,
        };

        match self.store.insert_hold(&hold).await {
            Ok(()) => {}
            // Another instance won the race between our check and write.
            Err(StoreError::RangeConflict { .. }) => {
                metrics::counter!("calendar_hold_conflicts_total").increment(1);
                let conflicts = self
                    .conflicts(item_id, &range, Some(booking_id), now)
                    .await?;
                return Err(CalendarError::Conflict { conflicts });
            }
            Err(e) => return Err(e.into()),
        }

        metrics::counter!("calendar_holds_placed_total").increment(1);
        tracing::debug!(
            booking_id = %booking_id,
            item_id = %item_id,
            range = %range,
            expires_at = %hold.expires_at,
            "placed hold"
        );
        Ok(hold)
    }

    /// Releases a booking's hold, freeing its range immediately.
    pub async fn release_hold(&self, booking_id: BookingId) -> Result<bool> {
        let released = self.store.release_hold(booking_id).await?;
        if released {
            metrics::counter!("calendar_holds_released_total").increment(1);
        }
        Ok(released)
    }

    /// Deletes expired holds; returns how many were removed.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let purged = self.store.purge_expired_holds(Utc::now()).await?;
        if purged > 0 {
            metrics::counter!("calendar_holds_expired_total").increment(purged);
            tracing::info!(purged, "purged expired holds");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Currency, InMemoryCatalog, ItemCategory, Location, Money};
    use store::InMemoryStore;

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(start.parse().unwrap(), end.parse().unwrap()).unwrap()
    }

    async fn calendar_with_item(item: InventoryItem) -> AvailabilityCalendar<InMemoryStore> {
        let catalog = InMemoryCatalog::default();
        catalog.insert(item).await;
        AvailabilityCalendar::new(Arc::new(catalog), InMemoryStore::new(), Duration::minutes(15))
    }

    fn yacht(min_nights: i64, blackouts: Vec<DateRange>) -> InventoryItem {
        InventoryItem {
            id: ItemId::new("yacht-01"),
            category: ItemCategory::Yacht,
            base_price: Money::from_major(5_000, Currency::Usd),
            locations: vec![Location::Miami],
            min_rental_nights: min_nights,
            blackout_ranges: blackouts,
        }
    }

    #[tokio::test]
    async fn check_open_range() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        cal.check(&ItemId::new("yacht-01"), range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn check_unknown_item() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        let result = cal
            .check(&ItemId::new("missing"), range("2026-07-01", "2026-07-05"))
            .await;
        assert!(matches!(result, Err(CalendarError::UnknownItem(_))));
    }

    #[tokio::test]
    async fn check_blackout() {
        let cal = calendar_with_item(yacht(1, vec![range("2026-07-03", "2026-07-10")])).await;
        let result = cal
            .check(&ItemId::new("yacht-01"), range("2026-07-01", "2026-07-05"))
            .await;
        assert!(matches!(result, Err(CalendarError::Blackout { .. })));
    }

    #[tokio::test]
    async fn check_below_minimum_stay() {
        let cal = calendar_with_item(yacht(3, vec![])).await;
        let result = cal
            .check(&ItemId::new("yacht-01"), range("2026-07-01", "2026-07-03"))
            .await;
        assert!(matches!(
            result,
            Err(CalendarError::BelowMinimum {
                required: 3,
                requested: 2
            })
        ));
    }

    #[tokio::test]
    async fn hold_blocks_overlap_and_reports_conflicts() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        let item = ItemId::new("yacht-01");

        cal.place_hold(BookingId::new(), &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();

        let result = cal
            .place_hold(BookingId::new(), &item, range("2026-07-04", "2026-07-08"))
            .await;
        match result {
            Err(CalendarError::Conflict { conflicts }) => {
                assert_eq!(conflicts, vec![range("2026-07-01", "2026-07-05")]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn back_to_back_holds_do_not_conflict() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        let item = ItemId::new("yacht-01");

        cal.place_hold(BookingId::new(), &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
        cal.place_hold(BookingId::new(), &item, range("2026-07-05", "2026-07-08"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn re_hold_by_same_booking_replaces() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        let item = ItemId::new("yacht-01");
        let booking_id = BookingId::new();

        let first = cal
            .place_hold(booking_id, &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
        let second = cal
            .place_hold(booking_id, &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert!(second.expires_at >= first.expires_at);
    }

    #[tokio::test]
    async fn release_frees_range() {
        let cal = calendar_with_item(yacht(1, vec![])).await;
        let item = ItemId::new("yacht-01");
        let booking_id = BookingId::new();

        cal.place_hold(booking_id, &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
        assert!(cal.release_hold(booking_id).await.unwrap());

        cal.place_hold(BookingId::new(), &item, range("2026-07-01", "2026-07-05"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn concurrent_holds_one_wins() {
        let catalog = InMemoryCatalog::default();
        catalog.insert(yacht(1, vec![])).await;
        let cal = Arc::new(AvailabilityCalendar::new(
            Arc::new(catalog),
            InMemoryStore::new(),
            Duration::minutes(15),
        ));
        let item = ItemId::new("yacht-01");

        let a = {
            let cal = cal.clone();
            let item = item.clone();
            tokio::spawn(async move {
                cal.place_hold(BookingId::new(), &item, range("2026-07-01", "2026-07-05"))
                    .await
            })
        };
        let b = {
            let cal = cal.clone();
            let item = item.clone();
            tokio::spawn(async move {
                cal.place_hold(BookingId::new(), &item, range("2026-07-03", "2026-07-08"))
                    .await
            })
        };

        let (a, b) = tokio::join!(a, b);
        let results = [a.unwrap(), b.unwrap()];
        let wins = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(CalendarError::Conflict { .. })))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(conflicts, 1);
    }
}
