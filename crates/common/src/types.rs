use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Declares a UUID-backed identifier newtype.
///
/// Wrapping the UUID gives type safety so a booking id can never be
/// passed where a hold id is expected.
macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID.
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

uuid_id! {
    /// Unique identifier for a booking.
    ///
    /// Doubles as the payment-intent idempotency key, so retried client
    /// submissions never create a second charge.
    BookingId
}

uuid_id! {
    /// Unique identifier for a temporary availability hold.
    HoldId
}

uuid_id! {
    /// Unique identifier for a queued notification job.
    JobId
}

uuid_id! {
    /// Internal identifier for a recorded payment-gateway event.
    ///
    /// Distinct from the gateway's external event id, which is a string
    /// owned by the gateway and used for idempotency detection.
    EventId
}

/// Identifier for an inventory item (car, yacht, jet, property).
///
/// Items are owned by the external inventory service; their ids are opaque
/// strings to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Creates a new item ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the item ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_id_new_creates_unique_ids() {
        let id1 = BookingId::new();
        let id2 = BookingId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn booking_id_from_uuid_preserves_value() {
        let uuid = Uuid::new_v4();
        let id = BookingId::from_uuid(uuid);
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn booking_id_serialization_roundtrip() {
        let id = BookingId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: BookingId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }

    #[test]
    fn item_id_string_conversion() {
        let id = ItemId::new("car-aventador-01");
        assert_eq!(id.as_str(), "car-aventador-01");

        let id2: ItemId = "yacht-azzam".into();
        assert_eq!(id2.as_str(), "yacht-azzam");
    }

    #[test]
    fn item_id_serializes_transparently() {
        let id = ItemId::new("jet-g650");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"jet-g650\"");
    }
}
