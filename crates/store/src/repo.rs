//! Repository traits backing the platform services.
//!
//! One trait per aggregate; a backend implements them all over shared
//! state so that the compound operations (checkout, driver assignment)
//! can be atomic. All implementations must be thread-safe.

use async_trait::async_trait;
use common::{CartId, CartItemId, DriverId, MenuItemId, OrderId, OrderItemId, RestaurantId, UserId};
use domain::{
    Cart, CartItem, DeliveryDriver, MenuItem, NewCart, NewCartItem, NewDriver, NewMenuItem,
    NewOrder, NewOrderItem, NewRestaurant, NewUser, Order, OrderItem, Restaurant, User,
};

use crate::Result;
use crate::query::{DriverFilter, OrderFilter};

/// Account rows, mirrored from the external auth service.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;
}

/// Restaurants and their menus.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_restaurant(&self, restaurant: NewRestaurant) -> Result<Restaurant>;

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>>;

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>>;

    /// Full-row update; errors if the row is gone.
    async fn update_restaurant(&self, restaurant: Restaurant) -> Result<()>;

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem>;

    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>>;

    /// Batch lookup; missing ids are simply absent from the result.
    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>>;

    async fn list_menu_items(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>>;

    async fn update_menu_item(&self, item: MenuItem) -> Result<()>;

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool>;
}

/// Carts and their line items.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn create_cart(&self, cart: NewCart) -> Result<Cart>;

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>>;

    /// Looks up the customer's cart for one restaurant (unique pair).
    async fn find_cart(
        &self,
        customer_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<Option<Cart>>;

    async fn list_carts(&self, customer_id: UserId) -> Result<Vec<Cart>>;

    async fn update_cart(&self, cart: Cart) -> Result<()>;

    async fn delete_cart(&self, id: CartId) -> Result<bool>;

    /// Deletes every cart the customer has for other restaurants. Returns
    /// the number of carts removed.
    async fn delete_other_carts(
        &self,
        customer_id: UserId,
        keep_restaurant: RestaurantId,
    ) -> Result<u64>;

    /// Deletes every cart the customer has. Returns the number removed.
    async fn delete_all_carts(&self, customer_id: UserId) -> Result<u64>;

    /// Inserts a line, merging into an existing `(cart, menu item)` line by
    /// incrementing its quantity. Atomic: concurrent adds of the same item
    /// never produce two lines. Instructions on the payload overwrite the
    /// stored ones when present.
    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem>;

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>>;

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>>;

    async fn update_cart_item(&self, item: CartItem) -> Result<()>;

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool>;

    /// Removes every line from the cart. Returns the number removed.
    async fn clear_cart_items(&self, cart_id: CartId) -> Result<u64>;
}

/// Orders and their line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts an order together with its lines, atomically.
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)>;

    /// Checkout write: inserts the order with its lines and deletes the
    /// source cart in one atomic step, so the cart can never be checked out
    /// twice.
    async fn create_order_from_cart(
        &self,
        cart_id: CartId,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    /// Orders a driver can pick up: `ready` and unassigned, longest-waiting
    /// first.
    async fn list_available_orders(&self, limit: usize) -> Result<Vec<Order>>;

    /// Full-row update (status, totals, cancellation fields).
    async fn update_order(&self, order: Order) -> Result<()>;

    async fn get_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>>;

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>>;

    /// Replaces the order's entire line set and updates the order row in
    /// one atomic step: `kept` lines are written back as given, `added`
    /// payloads get fresh ids, everything else is deleted. Returns the full
    /// stored set. This is the write half of every item mutation, so totals
    /// and lines can never diverge.
    async fn save_order_with_items(
        &self,
        order: Order,
        kept: Vec<OrderItem>,
        added: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>>;
}

/// Driver profiles and the delivery assignment writes.
#[async_trait]
pub trait DriverStore: Send + Sync {
    /// Errors with [`StoreError::DuplicateDriver`](crate::StoreError) when a
    /// profile already exists for the account.
    async fn create_driver(&self, driver: NewDriver) -> Result<DeliveryDriver>;

    async fn get_driver(&self, id: DriverId) -> Result<Option<DeliveryDriver>>;

    async fn find_driver_by_account(&self, account_id: UserId) -> Result<Option<DeliveryDriver>>;

    async fn list_drivers(&self, filter: DriverFilter) -> Result<Vec<DeliveryDriver>>;

    async fn update_driver(&self, driver: DeliveryDriver) -> Result<()>;

    async fn delete_driver(&self, id: DriverId) -> Result<bool>;

    /// Conditional assignment: succeeds only while the order is still
    /// `ready` and unassigned, in which case the order moves to
    /// `delivering` with the driver recorded and the driver's status
    /// flips to `Delivering` — all in one atomic step. Returns false when
    /// another driver won the race.
    async fn assign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool>;

    /// Reverts an in-flight assignment: order back to `ready` and
    /// unassigned, driver back to `Online`. Returns false if the order is
    /// not currently assigned to this driver.
    async fn unassign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool>;

    /// Terminal delivery write: order to `completed`, driver back to
    /// `Online` with `total_deliveries` incremented, atomically. Returns
    /// false if the order is not `delivering` under this driver.
    async fn complete_delivery(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool>;
}

/// Convenience bound for services that touch several aggregates.
pub trait Store:
    UserStore + CatalogStore + CartStore + OrderStore + DriverStore + Clone + Send + Sync + 'static
{
}

impl<T> Store for T where
    T: UserStore + CatalogStore + CartStore + OrderStore + DriverStore + Clone + Send + Sync + 'static
{
}
