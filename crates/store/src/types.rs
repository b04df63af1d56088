//! Rows owned by the external store.

use chrono::{DateTime, Utc};
use common::{BookingId, HoldId, ItemId, JobId};
use domain::{DateRange, NotificationKind};
use serde::{Deserialize, Serialize};

/// A temporary reservation blocking an item's date range pending payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hold {
    pub id: HoldId,
    pub item_id: ItemId,
    /// Owning booking; one active hold per booking.
    pub booking_id: BookingId,
    pub range: DateRange,
    /// After this instant the hold no longer blocks the calendar.
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// True while the hold still blocks the calendar.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Delivery state of a queued notification job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Waiting for its `next_retry_at` to come due.
    Pending,
    /// A provider accepted the message.
    Delivered,
    /// Superseded by a later status change before delivery; never sent.
    Dropped,
    /// Max attempts exhausted; parked for manual intervention.
    DeadLettered,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Delivered => "delivered",
            JobStatus::Dropped => "dropped",
            JobStatus::DeadLettered => "dead-lettered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "delivered" => Some(JobStatus::Delivered),
            "dropped" => Some(JobStatus::Dropped),
            "dead-lettered" => Some(JobStatus::DeadLettered),
            _ => None,
        }
    }
}

/// A notification whose immediate delivery failed, queued for retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub id: JobId,
    pub kind: NotificationKind,
    pub booking_id: BookingId,
    pub recipient: String,
    pub template_data: serde_json::Value,
    /// Delivery attempts made so far (the inline attempt counts as 1).
    pub attempts: u32,
    pub status: JobStatus,
    pub next_retry_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NotificationJob {
    /// Creates a pending job after a failed inline delivery.
    pub fn new(
        kind: NotificationKind,
        booking_id: BookingId,
        recipient: impl Into<String>,
        template_data: serde_json::Value,
        next_retry_at: DateTime<Utc>,
        last_error: impl Into<String>,
    ) -> Self {
        Self {
            id: JobId::new(),
            kind,
            booking_id,
            recipient: recipient.into(),
            template_data,
            attempts: 1,
            status: JobStatus::Pending,
            next_retry_at,
            last_error: Some(last_error.into()),
            created_at: Utc::now(),
        }
    }

    /// True once the job's retry time has come due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == JobStatus::Pending && self.next_retry_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hold_expires() {
        let now = Utc::now();
        let hold = Hold {
            id: HoldId::new(),
            item_id: ItemId::new("car-01"),
            booking_id: BookingId::new(),
            range: DateRange::new(
                "2026-07-01".parse().unwrap(),
                "2026-07-04".parse().unwrap(),
            )
            .unwrap(),
            expires_at: now + Duration::minutes(15),
        };
        assert!(hold.is_active(now));
        assert!(!hold.is_active(now + Duration::minutes(16)));
    }

    #[test]
    fn job_due_only_when_pending_and_elapsed() {
        let now = Utc::now();
        let mut job = NotificationJob::new(
            NotificationKind::BookingConfirmed,
            BookingId::new(),
            "guest@example.com",
            serde_json::json!({}),
            now - Duration::minutes(1),
            "provider timeout",
        );
        assert!(job.is_due(now));

        job.next_retry_at = now + Duration::minutes(5);
        assert!(!job.is_due(now));

        job.next_retry_at = now - Duration::minutes(1);
        job.status = JobStatus::DeadLettered;
        assert!(!job.is_due(now));
    }
}
