//! Domain layer for the luxury rental booking core.
//!
//! Holds the value objects (money, date ranges), the booking aggregate with
//! its payment-driven state machine, the read-only inventory contract, and
//! the deterministic pricing engine.

mod booking;
mod dates;
mod error;
mod gateway_events;
mod item;
mod money;
mod notification;
pub mod pricing;
mod status;

pub use booking::{Booking, Customer, StatusChange};
pub use dates::DateRange;
pub use error::{BookingError, DateRangeError, PricingConfigError, PricingError};
pub use gateway_events::{GatewayEvent, GatewayEventKind, PaymentEventRecord};
pub use item::{
    InMemoryCatalog, InventoryCatalog, InventoryItem, ItemCategory, Location, ServiceTier,
};
pub use money::{Currency, Money};
pub use notification::NotificationKind;
pub use pricing::{AddOn, PriceBreakdown, PricingConfig, Season, quote};
pub use status::BookingStatus;
