//! Shared types for the delivery platform.
//!
//! Provides the typed identifiers used across every crate, the `Money`
//! minor-unit type, and the caller `Role` enum.

pub mod money;
pub mod role;
pub mod types;

pub use money::Money;
pub use role::Role;
pub use types::{
    CartId, CartItemId, DriverId, IdParseError, MenuItemId, OrderId, OrderItemId, RestaurantId,
    UserId,
};
