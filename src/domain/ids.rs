//! Type-safe identifiers for markets, bookings, slots, users and locks.
//!
//! UUID-backed identifiers are generated by the engine; string-backed ones
//! come from outside (slot ids are chosen by the market owner, user ids by
//! the auth provider, lock ids are derived from the hold request).

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Creates a new random identifier (UUID v4).
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Wraps an existing [`uuid::Uuid`].
            #[must_use]
            pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner [`uuid::Uuid`].
            #[must_use]
            pub const fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<uuid::Uuid> for $name {
            fn from(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for uuid::Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps the given string.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a market.
    MarketId
);

uuid_id!(
    /// Unique identifier of a booking.
    BookingId
);

uuid_id!(
    /// Unique identifier of a notification record.
    NotificationId
);

string_id!(
    /// Owner-chosen identifier of a slot, unique within its market layout.
    SlotId
);

string_id!(
    /// Identity of an authenticated user as issued by the auth provider.
    UserId
);

string_id!(
    /// Deterministic identifier of a slot hold.
    ///
    /// Built from market id, slot id, range start, range end and requesting
    /// user so that a double-submitted hold maps onto the same record while
    /// equally named slots of different markets never collide.
    LockId
);

impl LockId {
    /// Derives the lock id for a hold request.
    #[must_use]
    pub fn derive(
        market_id: MarketId,
        slot_id: &SlotId,
        start: NaiveDate,
        end: NaiveDate,
        user_id: &UserId,
    ) -> Self {
        Self(format!("{market_id}_{slot_id}_{start}_{end}_{user_id}"))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        assert_ne!(BookingId::new(), BookingId::new());
        assert_ne!(MarketId::new(), MarketId::new());
    }

    #[test]
    fn uuid_id_serializes_transparently() {
        let id = MarketId::new();
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn lock_id_is_deterministic() {
        let Some(start) = NaiveDate::from_ymd_opt(2024, 5, 1) else {
            panic!("valid date");
        };
        let Some(end) = NaiveDate::from_ymd_opt(2024, 5, 5) else {
            panic!("valid date");
        };
        let market = MarketId::new();
        let slot = SlotId::from("S1");
        let a = LockId::derive(market, &slot, start, end, &UserId::from("alice"));
        let b = LockId::derive(market, &slot, start, end, &UserId::from("alice"));
        let c = LockId::derive(market, &slot, start, end, &UserId::from("bob"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), format!("{market}_S1_2024-05-01_2024-05-05_alice"));
    }

    #[test]
    fn lock_id_differs_across_markets() {
        let (Some(start), Some(end)) = (
            NaiveDate::from_ymd_opt(2024, 5, 1),
            NaiveDate::from_ymd_opt(2024, 5, 5),
        ) else {
            panic!("valid dates");
        };
        let slot = SlotId::from("A1");
        let user = UserId::from("alice");
        let here = LockId::derive(MarketId::new(), &slot, start, end, &user);
        let there = LockId::derive(MarketId::new(), &slot, start, end, &user);
        assert_ne!(here, there);
    }
}
