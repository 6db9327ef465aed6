//! Cart and cart line-item entities.

use chrono::{DateTime, Utc};
use common::{CartId, CartItemId, MenuItemId, RestaurantId, UserId};
use serde::{Deserialize, Serialize};

use crate::payment::PaymentMethod;

/// A customer's in-progress, pre-checkout selection for one restaurant.
///
/// Keyed uniquely by `(customer_id, restaurant_id)`; the business rule on
/// top restricts a customer to carts for a single restaurant at a time, so
/// adding to a cart for restaurant B deletes carts for every other
/// restaurant first. Destroyed on checkout, clear, or restaurant switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Merges non-null delivery fields from a request into the cart.
    ///
    /// Returns true if anything changed.
    pub fn merge_delivery_info(
        &mut self,
        delivery_address: Option<String>,
        payment_method: Option<PaymentMethod>,
        note: Option<String>,
    ) -> bool {
        let mut changed = false;
        if let Some(addr) = delivery_address {
            self.delivery_address = Some(addr);
            changed = true;
        }
        if let Some(pm) = payment_method {
            self.payment_method = Some(pm);
            changed = true;
        }
        if let Some(n) = note {
            self.note = Some(n);
            changed = true;
        }
        changed
    }
}

/// Payload for creating a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCart {
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
}

/// A line in a cart: one menu item with a quantity.
///
/// At most one row exists per `(cart_id, menu_item_id)`; repeated adds merge
/// by incrementing the quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub special_instructions: Option<String>,
}
