//! Restaurant and menu management.
//!
//! Browsing is open to any authenticated account; mutations require the
//! restaurant role and ownership of the restaurant being changed.

use chrono::Utc;
use common::{MenuItemId, Money, RestaurantId, Role};
use domain::access::{require_identity, require_owner, require_role};
use domain::{Error, Identity, MenuItem, NewMenuItem, NewRestaurant, Restaurant, Result};
use serde::Deserialize;
use store::Store;

/// Payload for opening a restaurant. The caller becomes the owner.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRestaurantRequest {
    pub name: String,
    pub address: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub delivery_fee: Money,
}

/// Partial update to a restaurant. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RestaurantPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub cuisine: Option<String>,
    pub opening_hours: Option<String>,
    pub delivery_fee: Option<Money>,
    pub is_active: Option<bool>,
}

/// Payload for adding a dish to a menu.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: Option<String>,
}

/// Partial update to a menu item. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub category: Option<String>,
    pub is_available: Option<bool>,
}

/// Catalog operations.
#[derive(Clone)]
pub struct CatalogService<S> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, caller, req))]
    pub async fn create_restaurant(
        &self,
        caller: Option<Identity>,
        req: NewRestaurantRequest,
    ) -> Result<Restaurant> {
        let who = require_role(caller, Role::Restaurant)?;
        let restaurant = self
            .store
            .create_restaurant(NewRestaurant {
                owner_id: who.user_id,
                name: req.name,
                address: req.address,
                cuisine: req.cuisine,
                opening_hours: req.opening_hours,
                delivery_fee: req.delivery_fee,
            })
            .await?;
        tracing::info!(restaurant_id = %restaurant.id, "restaurant created");
        Ok(restaurant)
    }

    pub async fn get_restaurant(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<Restaurant> {
        require_identity(caller)?;
        self.load_restaurant(restaurant_id).await
    }

    pub async fn list_restaurants(&self, caller: Option<Identity>) -> Result<Vec<Restaurant>> {
        require_identity(caller)?;
        Ok(self.store.list_restaurants().await?)
    }

    /// Restaurants owned by the calling account.
    pub async fn my_restaurants(&self, caller: Option<Identity>) -> Result<Vec<Restaurant>> {
        let who = require_role(caller, Role::Restaurant)?;
        let all = self.store.list_restaurants().await?;
        Ok(all.into_iter().filter(|r| r.owner_id == who.user_id).collect())
    }

    #[tracing::instrument(skip(self, caller, patch))]
    pub async fn update_restaurant(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
        patch: RestaurantPatch,
    ) -> Result<Restaurant> {
        let who = require_role(caller, Role::Restaurant)?;
        let mut restaurant = self.load_restaurant(restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;

        if let Some(name) = patch.name {
            restaurant.name = name;
        }
        if patch.address.is_some() {
            restaurant.address = patch.address;
        }
        if patch.cuisine.is_some() {
            restaurant.cuisine = patch.cuisine;
        }
        if patch.opening_hours.is_some() {
            restaurant.opening_hours = patch.opening_hours;
        }
        if let Some(fee) = patch.delivery_fee {
            restaurant.delivery_fee = fee;
        }
        if let Some(active) = patch.is_active {
            restaurant.is_active = active;
        }
        restaurant.updated_at = Utc::now();
        self.store.update_restaurant(restaurant.clone()).await?;
        Ok(restaurant)
    }

    #[tracing::instrument(skip(self, caller, req))]
    pub async fn create_menu_item(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
        req: NewMenuItemRequest,
    ) -> Result<MenuItem> {
        let who = require_role(caller, Role::Restaurant)?;
        let restaurant = self.load_restaurant(restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;

        Ok(self
            .store
            .create_menu_item(NewMenuItem {
                restaurant_id,
                name: req.name,
                description: req.description,
                price: req.price,
                category: req.category,
            })
            .await?)
    }

    pub async fn get_menu_item(
        &self,
        caller: Option<Identity>,
        menu_item_id: MenuItemId,
    ) -> Result<MenuItem> {
        require_identity(caller)?;
        self.store
            .get_menu_item(menu_item_id)
            .await?
            .ok_or(Error::MenuItemNotFound(menu_item_id))
    }

    /// The restaurant's full menu, available and not.
    pub async fn list_menu(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<MenuItem>> {
        require_identity(caller)?;
        self.load_restaurant(restaurant_id).await?;
        Ok(self.store.list_menu_items(restaurant_id).await?)
    }

    #[tracing::instrument(skip(self, caller, patch))]
    pub async fn update_menu_item(
        &self,
        caller: Option<Identity>,
        menu_item_id: MenuItemId,
        patch: MenuItemPatch,
    ) -> Result<MenuItem> {
        let who = require_role(caller, Role::Restaurant)?;
        let mut item = self
            .store
            .get_menu_item(menu_item_id)
            .await?
            .ok_or(Error::MenuItemNotFound(menu_item_id))?;
        let restaurant = self.load_restaurant(item.restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;

        if let Some(name) = patch.name {
            item.name = name;
        }
        if patch.description.is_some() {
            item.description = patch.description;
        }
        if let Some(price) = patch.price {
            item.price = price;
        }
        if patch.category.is_some() {
            item.category = patch.category;
        }
        if let Some(available) = patch.is_available {
            item.is_available = available;
        }
        item.updated_at = Utc::now();
        self.store.update_menu_item(item.clone()).await?;
        Ok(item)
    }

    /// Removes a dish from the menu. Existing order lines keep their price
    /// snapshot; open cart lines show up as unavailable.
    #[tracing::instrument(skip(self, caller))]
    pub async fn delete_menu_item(
        &self,
        caller: Option<Identity>,
        menu_item_id: MenuItemId,
    ) -> Result<()> {
        let who = require_role(caller, Role::Restaurant)?;
        let item = self
            .store
            .get_menu_item(menu_item_id)
            .await?
            .ok_or(Error::MenuItemNotFound(menu_item_id))?;
        let restaurant = self.load_restaurant(item.restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;

        self.store.delete_menu_item(menu_item_id).await?;
        Ok(())
    }

    async fn load_restaurant(&self, id: RestaurantId) -> Result<Restaurant> {
        self.store
            .get_restaurant(id)
            .await?
            .ok_or(Error::RestaurantNotFound(id))
    }
}
