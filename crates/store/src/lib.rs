//! Contracts the booking core needs from its external durable store.
//!
//! The core does not ship a storage engine of its own; it defines the
//! four repositories it relies on, an in-memory implementation for tests
//! and local runs, and a PostgreSQL implementation for deployment.

mod error;
mod memory;
mod postgres;
mod repos;
mod types;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use repos::{BookingRepository, CalendarStore, NotificationJobStore, PaymentEventStore, Store};
pub use types::{Hold, JobStatus, NotificationJob};
