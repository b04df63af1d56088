//! Half-open date ranges for stays and blackouts.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::DateRangeError;

/// A half-open date range `[start, end)`.
///
/// Check-out day equals the next stay's check-in day without conflicting,
/// which is exactly the half-open overlap rule. Construction rejects empty
/// and inverted ranges, so every `DateRange` spans at least one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start >= end {
            return Err(DateRangeError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// First night of the stay.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Check-out day (exclusive).
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of nights covered, always >= 1.
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Two ranges conflict iff `s1 < e2 && s2 < e1`.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(d(start), d(end)).unwrap()
    }

    #[test]
    fn rejects_zero_length_range() {
        let day = d("2026-07-01");
        assert!(matches!(
            DateRange::new(day, day),
            Err(DateRangeError::Empty { .. })
        ));
    }

    #[test]
    fn rejects_inverted_range() {
        assert!(DateRange::new(d("2026-07-04"), d("2026-07-01")).is_err());
    }

    #[test]
    fn nights_counts_days() {
        assert_eq!(range("2024-07-01", "2024-07-04").nights(), 3);
        assert_eq!(range("2024-07-01", "2024-07-02").nights(), 1);
    }

    #[test]
    fn overlapping_ranges_conflict() {
        let a = range("2026-07-01", "2026-07-10");
        let b = range("2026-07-05", "2026-07-15");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn contained_range_conflicts() {
        let a = range("2026-07-01", "2026-07-31");
        let b = range("2026-07-10", "2026-07-12");
        assert!(a.overlaps(&b));
    }

    #[test]
    fn back_to_back_ranges_do_not_conflict() {
        // Check-out day == next check-in day is fine under half-open semantics.
        let a = range("2026-07-01", "2026-07-05");
        let b = range("2026-07-05", "2026-07-10");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn disjoint_ranges_do_not_conflict() {
        let a = range("2026-07-01", "2026-07-05");
        let b = range("2026-08-01", "2026-08-05");
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn serialization_roundtrip() {
        let a = range("2026-07-01", "2026-07-05");
        let json = serde_json::to_string(&a).unwrap();
        let back: DateRange = serde_json::from_str(&json).unwrap();
        assert_eq!(a, back);
    }
}
