//! Inline delivery with provider failover.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{BookingId, JobId};
use domain::NotificationKind;
use store::{NotificationJob, NotificationJobStore};

use crate::provider::NotificationProvider;
use crate::template::render;

/// Minutes until the next retry after `attempts` failed attempts.
///
/// Grows as 5^attempts, capped so the interval stays within a day.
pub fn backoff(attempts: u32) -> Duration {
    Duration::minutes(5_i64.pow(attempts.clamp(1, 4)))
}

/// How an inline dispatch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A provider accepted the message.
    Delivered { provider: String, message_id: String },
    /// Every provider failed; a retry job was queued.
    Queued { job_id: JobId },
}

/// Sends notifications through an ordered provider chain, queueing a
/// retry job when the whole chain is down.
///
/// Delivery is at-least-once: a crash between a provider accepting and
/// the delivery being recorded can resend, never silently drop.
pub struct NotificationDispatcher<S> {
    providers: Vec<Arc<dyn NotificationProvider>>,
    store: S,
}

impl<S: NotificationJobStore> NotificationDispatcher<S> {
    /// Providers are tried in the order given.
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>, store: S) -> Self {
        Self { providers, store }
    }

    /// Tries each provider in order; returns on the first success.
    pub(crate) async fn try_providers(
        &self,
        kind: NotificationKind,
        recipient: &str,
        template_data: &serde_json::Value,
    ) -> Result<(String, String), String> {
        let message = render(kind, recipient, template_data);
        let mut last_error = "no providers configured".to_string();

        for provider in &self.providers {
            match provider.send(&message).await {
                Ok(message_id) => {
                    return Ok((provider.name().to_string(), message_id));
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        kind = kind.as_str(),
                        error = %e,
                        "provider failed, trying next"
                    );
                    metrics::counter!(
                        "notifications_provider_failures_total",
                        "provider" => provider.name().to_string()
                    )
                    .increment(1);
                    last_error = e.to_string();
                }
            }
        }
        Err(last_error)
    }

    /// Dispatches inline, falling back to the retry queue.
    #[tracing::instrument(skip(self, template_data), fields(kind = kind.as_str()))]
    pub async fn dispatch(
        &self,
        kind: NotificationKind,
        booking_id: BookingId,
        recipient: &str,
        template_data: serde_json::Value,
    ) -> store::Result<DispatchOutcome> {
        match self.try_providers(kind, recipient, &template_data).await {
            Ok((provider, message_id)) => {
                metrics::counter!("notifications_delivered_total").increment(1);
                tracing::info!(provider, message_id, "notification delivered");
                Ok(DispatchOutcome::Delivered {
                    provider,
                    message_id,
                })
            }
            Err(last_error) => {
                let job = NotificationJob::new(
                    kind,
                    booking_id,
                    recipient,
                    template_data,
                    Utc::now() + backoff(1),
                    last_error,
                );
                self.store.enqueue_job(&job).await?;
                metrics::counter!("notifications_queued_total").increment(1);
                tracing::warn!(job_id = %job.id, "all providers failed, queued for retry");
                Ok(DispatchOutcome::Queued { job_id: job.id })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use store::{InMemoryStore, JobStatus};

    fn data() -> serde_json::Value {
        serde_json::json!({ "booking_id": "b-1", "item_id": "yacht-01" })
    }

    #[tokio::test]
    async fn primary_provider_delivers() {
        let primary = Arc::new(InMemoryProvider::new("email-primary"));
        let backup = Arc::new(InMemoryProvider::new("email-backup"));
        let dispatcher = NotificationDispatcher::new(
            vec![primary.clone(), backup.clone()],
            InMemoryStore::new(),
        );

        let outcome = dispatcher
            .dispatch(
                NotificationKind::BookingConfirmed,
                BookingId::new(),
                "ada@example.com",
                data(),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Delivered { ref provider, .. } if provider == "email-primary"
        ));
        assert_eq!(primary.sent_count().await, 1);
        assert_eq!(backup.sent_count().await, 0);
    }

    #[tokio::test]
    async fn failover_to_later_provider() {
        let a = Arc::new(InMemoryProvider::new("a"));
        let b = Arc::new(InMemoryProvider::new("b"));
        let c = Arc::new(InMemoryProvider::new("c"));
        a.set_fail(true);
        b.set_fail(true);
        let dispatcher = NotificationDispatcher::new(
            vec![a.clone(), b.clone(), c.clone()],
            InMemoryStore::new(),
        );

        let outcome = dispatcher
            .dispatch(
                NotificationKind::BookingConfirmed,
                BookingId::new(),
                "ada@example.com",
                data(),
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            DispatchOutcome::Delivered { ref provider, .. } if provider == "c"
        ));
        assert_eq!(c.sent_count().await, 1);
    }

    #[tokio::test]
    async fn all_providers_down_queues_job() {
        let a = Arc::new(InMemoryProvider::new("a"));
        a.set_fail(true);
        let store = InMemoryStore::new();
        let dispatcher = NotificationDispatcher::new(vec![a], store.clone());

        let outcome = dispatcher
            .dispatch(
                NotificationKind::PaymentFailed,
                BookingId::new(),
                "ada@example.com",
                data(),
            )
            .await
            .unwrap();

        let job_id = match outcome {
            DispatchOutcome::Queued { job_id } => job_id,
            other => panic!("expected queued, got {other:?}"),
        };
        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.attempts, 1);
        assert!(job.next_retry_at > Utc::now() + Duration::minutes(4));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert_eq!(backoff(1), Duration::minutes(5));
        assert_eq!(backoff(2), Duration::minutes(25));
        assert_eq!(backoff(3), Duration::minutes(125));
        assert_eq!(backoff(4), Duration::minutes(625));
        assert_eq!(backoff(9), Duration::minutes(625));
    }
}
