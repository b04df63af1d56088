//! Notification dispatch: templating, provider failover, and the
//! background retry worker.

mod dispatcher;
mod provider;
mod template;
mod worker;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher, backoff};
pub use provider::{InMemoryProvider, NotificationProvider, ProviderError};
pub use template::{Message, render};
pub use worker::RetryWorker;
