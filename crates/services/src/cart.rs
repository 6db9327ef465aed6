//! Cart operations: building a selection, keeping the one-restaurant rule,
//! and checkout.

use std::collections::BTreeMap;

use common::{CartId, CartItemId, MenuItemId, RestaurantId, Role};
use domain::access::{require_owner, require_role};
use domain::{
    Cart, Error, Identity, MenuItem, NewCart, NewCartItem, NewOrder, PaymentMethod, Restaurant,
    Result, compute_totals, pricing::LineItem,
};
use serde::Deserialize;
use store::Store;

use crate::order::validate_order_line;
use crate::views::{CartView, OrderView};

/// Delivery fields a customer can set on a cart; absent fields keep their
/// stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryInfo {
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
}

/// Request to put a menu item into a cart.
#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItem {
    pub restaurant_id: RestaurantId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub special_instructions: Option<String>,
}

/// Cart operations.
#[derive(Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the customer's cart for a restaurant, creating it if absent.
    /// Enforces the one-restaurant rule by deleting carts for every other
    /// restaurant first; non-null delivery fields merge into an existing
    /// cart.
    #[tracing::instrument(skip(self, caller, info))]
    pub async fn get_or_create_cart(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
        info: DeliveryInfo,
    ) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let restaurant = self.load_restaurant(restaurant_id).await?;

        self.store
            .delete_other_carts(who.user_id, restaurant_id)
            .await?;

        let cart = match self.store.find_cart(who.user_id, restaurant_id).await? {
            Some(mut cart) => {
                if cart.merge_delivery_info(info.delivery_address, info.payment_method, info.note)
                {
                    cart.updated_at = chrono::Utc::now();
                    self.store.update_cart(cart.clone()).await?;
                }
                cart
            }
            None => {
                self.store
                    .create_cart(NewCart {
                        customer_id: who.user_id,
                        restaurant_id,
                        delivery_address: info.delivery_address,
                        payment_method: info.payment_method,
                        note: info.note,
                    })
                    .await?
            }
        };

        self.view(cart, &restaurant).await
    }

    /// Adds a menu item to the customer's cart for its restaurant,
    /// merge-incrementing an existing line for the same item.
    #[tracing::instrument(skip(self, caller, req))]
    pub async fn add_item(&self, caller: Option<Identity>, req: AddCartItem) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let restaurant = self.load_restaurant(req.restaurant_id).await?;

        let menu_item = self
            .store
            .get_menu_item(req.menu_item_id)
            .await?
            .ok_or(Error::MenuItemNotFound(req.menu_item_id))?;
        validate_menu_item(&menu_item, req.restaurant_id, req.quantity)?;

        self.store
            .delete_other_carts(who.user_id, req.restaurant_id)
            .await?;
        let cart = match self.store.find_cart(who.user_id, req.restaurant_id).await? {
            Some(cart) => cart,
            None => {
                self.store
                    .create_cart(NewCart {
                        customer_id: who.user_id,
                        restaurant_id: req.restaurant_id,
                        delivery_address: None,
                        payment_method: None,
                        note: None,
                    })
                    .await?
            }
        };

        self.store
            .add_cart_item(NewCartItem {
                cart_id: cart.id,
                menu_item_id: req.menu_item_id,
                quantity: req.quantity,
                special_instructions: req.special_instructions,
            })
            .await?;

        self.view(cart, &restaurant).await
    }

    /// Changes the quantity (and optionally instructions) of a cart line.
    #[tracing::instrument(skip(self, caller))]
    pub async fn update_item(
        &self,
        caller: Option<Identity>,
        cart_item_id: CartItemId,
        quantity: u32,
        special_instructions: Option<String>,
    ) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        if quantity == 0 {
            return Err(Error::InvalidQuantity(quantity));
        }

        let mut line = self
            .store
            .get_cart_item(cart_item_id)
            .await?
            .ok_or(Error::CartItemNotFound(cart_item_id))?;
        let cart = self.owned_cart(&who, line.cart_id).await?;

        line.quantity = quantity;
        if special_instructions.is_some() {
            line.special_instructions = special_instructions;
        }
        line.updated_at = chrono::Utc::now();
        self.store.update_cart_item(line).await?;

        let restaurant = self.load_restaurant(cart.restaurant_id).await?;
        self.view(cart, &restaurant).await
    }

    /// Removes one line from the cart.
    #[tracing::instrument(skip(self, caller))]
    pub async fn remove_item(
        &self,
        caller: Option<Identity>,
        cart_item_id: CartItemId,
    ) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let line = self
            .store
            .get_cart_item(cart_item_id)
            .await?
            .ok_or(Error::CartItemNotFound(cart_item_id))?;
        let cart = self.owned_cart(&who, line.cart_id).await?;
        self.store.delete_cart_item(cart_item_id).await?;

        let restaurant = self.load_restaurant(cart.restaurant_id).await?;
        self.view(cart, &restaurant).await
    }

    /// Destroys the cart: all of its lines, then the row itself.
    #[tracing::instrument(skip(self, caller))]
    pub async fn clear(&self, caller: Option<Identity>, cart_id: CartId) -> Result<()> {
        let who = require_role(caller, Role::Customer)?;
        self.owned_cart(&who, cart_id).await?;
        self.store.clear_cart_items(cart_id).await?;
        self.store.delete_cart(cart_id).await?;
        Ok(())
    }

    /// Patches delivery details on the cart.
    #[tracing::instrument(skip(self, caller, info))]
    pub async fn update_cart(
        &self,
        caller: Option<Identity>,
        cart_id: CartId,
        info: DeliveryInfo,
    ) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let mut cart = self.owned_cart(&who, cart_id).await?;
        if cart.merge_delivery_info(info.delivery_address, info.payment_method, info.note) {
            cart.updated_at = chrono::Utc::now();
            self.store.update_cart(cart.clone()).await?;
        }

        let restaurant = self.load_restaurant(cart.restaurant_id).await?;
        self.view(cart, &restaurant).await
    }

    /// Drops every cart the customer has and starts a fresh one for the
    /// given restaurant.
    #[tracing::instrument(skip(self, caller))]
    pub async fn switch_restaurant(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let restaurant = self.load_restaurant(restaurant_id).await?;

        self.store.delete_all_carts(who.user_id).await?;
        let cart = self
            .store
            .create_cart(NewCart {
                customer_id: who.user_id,
                restaurant_id,
                delivery_address: None,
                payment_method: None,
                note: None,
            })
            .await?;

        self.view(cart, &restaurant).await
    }

    /// Converts the cart into a `pending` order.
    ///
    /// Checks run in a fixed sequence: ownership, then emptiness, then the
    /// delivery address, then per-item availability (naming the first
    /// offending item). Prices are snapshotted from the live menu at this
    /// moment; the cart is deleted in the same atomic write that creates
    /// the order.
    #[tracing::instrument(skip(self, caller))]
    pub async fn checkout(&self, caller: Option<Identity>, cart_id: CartId) -> Result<OrderView> {
        let who = require_role(caller, Role::Customer)?;
        let cart = self.owned_cart(&who, cart_id).await?;

        let lines = self.store.list_cart_items(cart_id).await?;
        if lines.is_empty() {
            return Err(Error::EmptyCart);
        }
        let delivery_address = cart.delivery_address.clone().ok_or(Error::MissingAddress)?;

        let restaurant = self.load_restaurant(cart.restaurant_id).await?;
        let menu = self
            .load_menu(&lines.iter().map(|l| l.menu_item_id).collect::<Vec<_>>())
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            items.push(validate_order_line(
                &menu,
                cart.restaurant_id,
                line.menu_item_id,
                line.quantity,
                line.special_instructions.clone(),
            )?);
        }

        let totals = compute_totals(
            items.iter().map(|i| LineItem::new(i.unit_price, i.quantity)),
            restaurant.delivery_fee,
        );
        let order = NewOrder {
            customer_id: who.user_id,
            restaurant_id: cart.restaurant_id,
            delivery_address,
            payment_method: cart.payment_method.unwrap_or_default(),
            note: cart.note.clone(),
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            service_fee: totals.service_fee,
            total: totals.total,
        };

        let (order, items) = self
            .store
            .create_order_from_cart(cart_id, order, items)
            .await?;

        metrics::counter!("cart_checkouts_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "cart checked out");
        Ok(OrderView::new(order, items))
    }

    /// The customer's cart for one restaurant, if any.
    pub async fn my_cart(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<Option<CartView>> {
        let who = require_role(caller, Role::Customer)?;
        match self.store.find_cart(who.user_id, restaurant_id).await? {
            Some(cart) => {
                let restaurant = self.load_restaurant(cart.restaurant_id).await?;
                Ok(Some(self.view(cart, &restaurant).await?))
            }
            None => Ok(None),
        }
    }

    /// All of the customer's carts.
    pub async fn my_carts(&self, caller: Option<Identity>) -> Result<Vec<CartView>> {
        let who = require_role(caller, Role::Customer)?;
        let carts = self.store.list_carts(who.user_id).await?;
        let mut views = Vec::with_capacity(carts.len());
        for cart in carts {
            let restaurant = self.load_restaurant(cart.restaurant_id).await?;
            views.push(self.view(cart, &restaurant).await?);
        }
        Ok(views)
    }

    /// A single cart, ownership-checked.
    pub async fn get_cart(&self, caller: Option<Identity>, cart_id: CartId) -> Result<CartView> {
        let who = require_role(caller, Role::Customer)?;
        let cart = self.owned_cart(&who, cart_id).await?;
        let restaurant = self.load_restaurant(cart.restaurant_id).await?;
        self.view(cart, &restaurant).await
    }

    async fn owned_cart(&self, who: &Identity, cart_id: CartId) -> Result<Cart> {
        let cart = self
            .store
            .get_cart(cart_id)
            .await?
            .ok_or(Error::CartNotFound(cart_id))?;
        require_owner(who, cart.customer_id, "cart")?;
        Ok(cart)
    }

    async fn load_restaurant(&self, id: RestaurantId) -> Result<Restaurant> {
        self.store
            .get_restaurant(id)
            .await?
            .ok_or(Error::RestaurantNotFound(id))
    }

    async fn load_menu(&self, ids: &[MenuItemId]) -> Result<BTreeMap<MenuItemId, MenuItem>> {
        let items = self.store.get_menu_items(ids).await?;
        Ok(items.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn view(&self, cart: Cart, restaurant: &Restaurant) -> Result<CartView> {
        let lines = self.store.list_cart_items(cart.id).await?;
        let menu = self
            .load_menu(&lines.iter().map(|l| l.menu_item_id).collect::<Vec<_>>())
            .await?;
        Ok(CartView::assemble(cart, lines, &menu, restaurant.delivery_fee))
    }
}

fn validate_menu_item(
    menu_item: &MenuItem,
    restaurant_id: RestaurantId,
    quantity: u32,
) -> Result<()> {
    if menu_item.restaurant_id != restaurant_id {
        return Err(Error::MenuItemMismatch {
            menu_item: menu_item.id,
            restaurant: restaurant_id,
        });
    }
    if !menu_item.is_available {
        return Err(Error::MenuItemUnavailable {
            name: menu_item.name.clone(),
        });
    }
    if quantity == 0 {
        return Err(Error::InvalidQuantity(quantity));
    }
    Ok(())
}
