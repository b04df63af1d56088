//! Delivery provider contract.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::template::Message;

/// A provider refused or failed to accept a message.
#[derive(Debug, Error)]
#[error("provider {provider} failed: {reason}")]
pub struct ProviderError {
    pub provider: String,
    pub reason: String,
}

/// An outbound delivery channel (email service, SMS bridge, pager).
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Stable name used in logs and delivery records.
    fn name(&self) -> &str;

    /// Attempts delivery; returns the provider's message id.
    async fn send(&self, message: &Message) -> Result<String, ProviderError>;
}

/// Recording provider for tests and local runs.
pub struct InMemoryProvider {
    name: String,
    sent: Arc<RwLock<Vec<Message>>>,
    fail: AtomicBool,
}

impl InMemoryProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: Arc::new(RwLock::new(Vec::new())),
            fail: AtomicBool::new(false),
        }
    }

    /// Makes subsequent `send` calls fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages accepted so far.
    pub async fn sent(&self) -> Vec<Message> {
        self.sent.read().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl NotificationProvider for InMemoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<String, ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError {
                provider: self.name.clone(),
                reason: "simulated outage".to_string(),
            });
        }
        let mut sent = self.sent.write().await;
        sent.push(message.clone());
        Ok(format!("{}-{}", self.name, sent.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sent_messages() {
        let provider = InMemoryProvider::new("email-primary");
        let message = Message {
            recipient: "ada@example.com".to_string(),
            subject: "hi".to_string(),
            body: "there".to_string(),
        };

        let id = provider.send(&message).await.unwrap();
        assert_eq!(id, "email-primary-1");
        assert_eq!(provider.sent().await, vec![message]);
    }

    #[tokio::test]
    async fn failure_toggle() {
        let provider = InMemoryProvider::new("email-primary");
        provider.set_fail(true);
        let message = Message {
            recipient: "ada@example.com".to_string(),
            subject: "hi".to_string(),
            body: "there".to_string(),
        };
        assert!(provider.send(&message).await.is_err());
        assert_eq!(provider.sent_count().await, 0);
    }
}
