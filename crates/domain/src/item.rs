//! Inventory items and the read-only catalog contract.
//!
//! Inventory is owned by an external service; the core only reads it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ItemId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::dates::DateRange;
use crate::money::{Currency, Money};

/// Category of luxury inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemCategory {
    Car,
    Yacht,
    Jet,
    Property,
}

impl ItemCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Car => "car",
            ItemCategory::Yacht => "yacht",
            ItemCategory::Jet => "jet",
            ItemCategory::Property => "property",
        }
    }
}

/// Operating location; fixes the settlement currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Miami,
    Monaco,
    London,
    Dubai,
}

impl Location {
    /// Currency bookings at this location settle in.
    pub fn currency(&self) -> Currency {
        match self {
            Location::Miami => Currency::Usd,
            Location::Monaco => Currency::Eur,
            Location::London => Currency::Gbp,
            Location::Dubai => Currency::Aed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Miami => "miami",
            Location::Monaco => "monaco",
            Location::London => "london",
            Location::Dubai => "dubai",
        }
    }

    /// All supported locations.
    pub const ALL: [Location; 4] = [
        Location::Miami,
        Location::Monaco,
        Location::London,
        Location::Dubai,
    ];
}

/// Customer-selected luxury service level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    #[default]
    Standard,
    Premium,
    Vvip,
}

/// An inventory item as published by the external inventory service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: ItemId,
    pub category: ItemCategory,
    /// Nightly base price, in the currency of the item's home location.
    pub base_price: Money,
    /// Locations where this item can be booked.
    pub locations: Vec<Location>,
    /// Minimum rental duration in nights.
    pub min_rental_nights: i64,
    /// Ranges the operator has blocked regardless of bookings.
    pub blackout_ranges: Vec<DateRange>,
}

impl InventoryItem {
    /// Returns the blackout range overlapping the requested stay, if any.
    pub fn blackout_conflict(&self, range: &DateRange) -> Option<&DateRange> {
        self.blackout_ranges.iter().find(|b| b.overlaps(range))
    }

    /// True if the item can be booked at the location.
    pub fn supports_location(&self, location: Location) -> bool {
        self.locations.contains(&location)
    }
}

/// Read-only access to the external inventory catalog.
#[async_trait]
pub trait InventoryCatalog: Send + Sync {
    /// Looks up an item by id. Returns None for unknown ids.
    async fn get(&self, id: &ItemId) -> Option<InventoryItem>;
}

/// In-memory catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Arc<RwLock<HashMap<ItemId, InventoryItem>>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an item.
    pub async fn insert(&self, item: InventoryItem) {
        self.items.write().await.insert(item.id.clone(), item);
    }
}

#[async_trait]
impl InventoryCatalog for InMemoryCatalog {
    async fn get(&self, id: &ItemId) -> Option<InventoryItem> {
        self.items.read().await.get(id).cloned()
    }
}
