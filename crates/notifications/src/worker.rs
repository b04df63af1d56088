//! Background retry worker for queued notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use store::{BookingRepository, NotificationJob, NotificationJobStore};

use crate::dispatcher::{NotificationDispatcher, backoff};

/// Drains the retry queue on an interval.
///
/// Before resending, each job is checked against the booking's current
/// status; a notification that no longer matches (a confirmation for a
/// booking refunded in the meantime) is dropped rather than sent.
pub struct RetryWorker<S> {
    store: S,
    dispatcher: Arc<NotificationDispatcher<S>>,
    max_attempts: u32,
    batch_size: usize,
    ops_recipient: String,
}

impl<S> RetryWorker<S>
where
    S: NotificationJobStore + BookingRepository,
{
    pub fn new(
        store: S,
        dispatcher: Arc<NotificationDispatcher<S>>,
        max_attempts: u32,
        batch_size: usize,
        ops_recipient: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            max_attempts,
            batch_size,
            ops_recipient: ops_recipient.into(),
        }
    }

    async fn is_stale(&self, job: &NotificationJob) -> store::Result<bool> {
        match self.store.get_booking(job.booking_id).await? {
            Some(booking) => Ok(!job.kind.is_consistent_with(booking.status())),
            None => Ok(false),
        }
    }

    async fn handle_job(&self, job: &NotificationJob) -> store::Result<()> {
        if self.is_stale(job).await? {
            self.store.drop_job(job.id).await?;
            metrics::counter!("notifications_dropped_stale_total").increment(1);
            tracing::info!(
                job_id = %job.id,
                booking_id = %job.booking_id,
                kind = job.kind.as_str(),
                "dropped stale notification"
            );
            return Ok(());
        }

        match self
            .dispatcher
            .try_providers(job.kind, &job.recipient, &job.template_data)
            .await
        {
            Ok((provider, message_id)) => {
                self.store.mark_job_delivered(job.id).await?;
                metrics::counter!("notifications_retries_delivered_total").increment(1);
                tracing::info!(job_id = %job.id, provider, message_id, "retry delivered");
            }
            Err(last_error) => {
                let attempts = job.attempts + 1;
                if attempts >= self.max_attempts {
                    self.store.dead_letter_job(job.id, &last_error).await?;
                    metrics::counter!("notifications_dead_lettered_total").increment(1);
                    tracing::error!(
                        job_id = %job.id,
                        booking_id = %job.booking_id,
                        attempts,
                        "notification dead-lettered"
                    );
                    self.alert_ops(job, attempts).await;
                } else {
                    self.store
                        .reschedule_job(job.id, attempts, Utc::now() + backoff(attempts), &last_error)
                        .await?;
                    tracing::warn!(job_id = %job.id, attempts, "retry failed, rescheduled");
                }
            }
        }
        Ok(())
    }

    /// Best-effort ops alert for a dead-lettered job. Never queued, so a
    /// full provider outage cannot feed the queue it just failed.
    async fn alert_ops(&self, job: &NotificationJob, attempts: u32) {
        let data = serde_json::json!({
            "booking_id": job.booking_id.to_string(),
            "reason": format!(
                "{} notification dead-lettered after {attempts} attempts",
                job.kind.as_str()
            ),
        });
        if let Err(e) = self
            .dispatcher
            .try_providers(domain::NotificationKind::OpsAlert, &self.ops_recipient, &data)
            .await
        {
            tracing::error!(job_id = %job.id, error = %e, "ops alert also failed");
        }
    }

    /// Processes one batch of due jobs; returns how many were handled.
    pub async fn run_once(&self, now: DateTime<Utc>) -> store::Result<usize> {
        let jobs = self.store.due_jobs(now, self.batch_size).await?;
        for job in &jobs {
            self.handle_job(job).await?;
        }
        Ok(jobs.len())
    }

    /// Polls forever. Intended to be spawned as a background task.
    pub async fn run(self, poll_interval: std::time::Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                tracing::error!(error = %e, "notification retry pass failed");
            }
        }
    }
}
