//! Restaurant and menu entities.

use chrono::{DateTime, Utc};
use common::{MenuItemId, Money, RestaurantId, UserId};
use serde::{Deserialize, Serialize};

/// A restaurant on the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub id: RestaurantId,
    /// Account that owns this restaurant; gates all restaurant-side
    /// mutations.
    pub owner_id: UserId,
    pub name: String,
    pub address: Option<String>,
    pub cuisine: Option<String>,
    pub rating: Option<f64>,
    pub opening_hours: Option<String>,
    /// Per-restaurant delivery fee applied to every order from this
    /// restaurant.
    pub delivery_fee: Money,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRestaurant {
    pub owner_id: UserId,
    pub name: String,
    pub address: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub delivery_fee: Money,
}

/// A dish on a restaurant's menu.
///
/// The price here is the live menu price. Cart lines carry no price and
/// are always priced against it on read; orders snapshot it into their
/// line items at checkout, after which menu changes no longer apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: MenuItemId,
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMenuItem {
    pub restaurant_id: RestaurantId,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_item_serialization() {
        let item = MenuItem {
            id: MenuItemId::new(7),
            restaurant_id: RestaurantId::new(2),
            name: "Nasi Goreng".into(),
            description: None,
            price: Money::from_minor(20000),
            category: Some("mains".into()),
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string(&item).unwrap();
        let back: MenuItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }
}
