use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a request string cannot be parsed into a typed ID.
///
/// Identifiers arrive over the wire as strings; the backing store keys rows
/// with 64-bit integers, so a non-numeric string fails the whole operation
/// as a client error.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} id: {value:?}")]
pub struct IdParseError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! define_id {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        ///
        /// Wraps an i64 row key to prevent mixing up identifiers of
        /// different aggregates.
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates an ID from a raw row key.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw row key.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>().map(Self).map_err(|_| IdParseError {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a user account.
    UserId,
    "user"
);
define_id!(
    /// Unique identifier for a restaurant.
    RestaurantId,
    "restaurant"
);
define_id!(
    /// Unique identifier for a menu item.
    MenuItemId,
    "menu item"
);
define_id!(
    /// Unique identifier for a cart.
    CartId,
    "cart"
);
define_id!(
    /// Unique identifier for a cart line item.
    CartItemId,
    "cart item"
);
define_id!(
    /// Unique identifier for an order.
    OrderId,
    "order"
);
define_id!(
    /// Unique identifier for an order line item.
    OrderItemId,
    "order item"
);
define_id!(
    /// Unique identifier for a delivery driver profile.
    DriverId,
    "driver"
);
