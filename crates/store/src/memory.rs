//! In-memory storage backend.
//!
//! Backs the test suites and local development with the same trait surface
//! as the PostgreSQL implementation. All state lives behind a single
//! `RwLock`, so every compound operation (checkout, assignment, item-set
//! replacement) holds one write guard for its whole duration and is
//! therefore atomic with respect to every other operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, CartItemId, DriverId, MenuItemId, OrderId, OrderItemId, RestaurantId, UserId};
use domain::{
    Cart, CartItem, DeliveryDriver, DriverStatus, MenuItem, NewCart, NewCartItem, NewDriver,
    NewMenuItem, NewOrder, NewOrderItem, NewRestaurant, NewUser, Order, OrderItem, OrderStatus,
    Restaurant, User,
};
use tokio::sync::RwLock;

use crate::query::{DriverFilter, DriverSort, OrderFilter, OrderSort};
use crate::repo::{CartStore, CatalogStore, DriverStore, OrderStore, UserStore};
use crate::{Result, StoreError};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    restaurants: BTreeMap<RestaurantId, Restaurant>,
    menu_items: BTreeMap<MenuItemId, MenuItem>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    drivers: BTreeMap<DriverId, DeliveryDriver>,
    next_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn insert_order_items(
        &mut self,
        order_id: OrderId,
        items: Vec<NewOrderItem>,
    ) -> Vec<OrderItem> {
        let now = Utc::now();
        items
            .into_iter()
            .map(|item| {
                let id = OrderItemId::new(self.next_id());
                let row = OrderItem {
                    id,
                    order_id,
                    menu_item_id: item.menu_item_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    special_instructions: item.special_instructions,
                    created_at: now,
                    updated_at: now,
                };
                self.order_items.insert(id, row.clone());
                row
            })
            .collect()
    }

    fn delete_cart_rows(&mut self, cart_id: CartId) {
        self.cart_items.retain(|_, item| item.cart_id != cart_id);
        self.carts.remove(&cart_id);
    }
}

/// In-memory storage backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let id = UserId::new(state.next_id());
        let row = User {
            id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            address: user.address,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_restaurant(&self, restaurant: NewRestaurant) -> Result<Restaurant> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let id = RestaurantId::new(state.next_id());
        let row = Restaurant {
            id,
            owner_id: restaurant.owner_id,
            name: restaurant.name,
            address: restaurant.address,
            cuisine: restaurant.cuisine,
            rating: None,
            opening_hours: restaurant.opening_hours,
            delivery_fee: restaurant.delivery_fee,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.restaurants.insert(id, row.clone());
        Ok(row)
    }

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        Ok(self.state.read().await.restaurants.get(&id).cloned())
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        Ok(self.state.read().await.restaurants.values().cloned().collect())
    }

    async fn update_restaurant(&self, restaurant: Restaurant) -> Result<()> {
        let mut state = self.state.write().await;
        match state.restaurants.get_mut(&restaurant.id) {
            Some(row) => {
                *row = restaurant;
                Ok(())
            }
            None => Err(StoreError::Missing("restaurant")),
        }
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let id = MenuItemId::new(state.next_id());
        let row = MenuItem {
            id,
            restaurant_id: item.restaurant_id,
            name: item.name,
            description: item.description,
            price: item.price,
            category: item.category,
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        state.menu_items.insert(id, row.clone());
        Ok(row)
    }

    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>> {
        Ok(self.state.read().await.menu_items.get(&id).cloned())
    }

    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.menu_items.get(id).cloned())
            .collect())
    }

    async fn list_menu_items(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>> {
        let state = self.state.read().await;
        Ok(state
            .menu_items
            .values()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn update_menu_item(&self, item: MenuItem) -> Result<()> {
        let mut state = self.state.write().await;
        match state.menu_items.get_mut(&item.id) {
            Some(row) => {
                *row = item;
                Ok(())
            }
            None => Err(StoreError::Missing("menu item")),
        }
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool> {
        Ok(self.state.write().await.menu_items.remove(&id).is_some())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn create_cart(&self, cart: NewCart) -> Result<Cart> {
        let mut state = self.state.write().await;
        // One cart per (customer, restaurant); a racing creator gets the
        // row that won.
        if let Some(existing) = state
            .carts
            .values()
            .find(|c| c.customer_id == cart.customer_id && c.restaurant_id == cart.restaurant_id)
        {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let id = CartId::new(state.next_id());
        let row = Cart {
            id,
            customer_id: cart.customer_id,
            restaurant_id: cart.restaurant_id,
            delivery_address: cart.delivery_address,
            payment_method: cart.payment_method,
            note: cart.note,
            created_at: now,
            updated_at: now,
        };
        state.carts.insert(id, row.clone());
        Ok(row)
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>> {
        Ok(self.state.read().await.carts.get(&id).cloned())
    }

    async fn find_cart(
        &self,
        customer_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<Option<Cart>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .values()
            .find(|c| c.customer_id == customer_id && c.restaurant_id == restaurant_id)
            .cloned())
    }

    async fn list_carts(&self, customer_id: UserId) -> Result<Vec<Cart>> {
        let state = self.state.read().await;
        Ok(state
            .carts
            .values()
            .filter(|c| c.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn update_cart(&self, cart: Cart) -> Result<()> {
        let mut state = self.state.write().await;
        match state.carts.get_mut(&cart.id) {
            Some(row) => {
                *row = cart;
                Ok(())
            }
            None => Err(StoreError::Missing("cart")),
        }
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool> {
        let mut state = self.state.write().await;
        let existed = state.carts.contains_key(&id);
        state.delete_cart_rows(id);
        Ok(existed)
    }

    async fn delete_other_carts(
        &self,
        customer_id: UserId,
        keep_restaurant: RestaurantId,
    ) -> Result<u64> {
        let mut state = self.state.write().await;
        let doomed: Vec<CartId> = state
            .carts
            .values()
            .filter(|c| c.customer_id == customer_id && c.restaurant_id != keep_restaurant)
            .map(|c| c.id)
            .collect();
        for id in &doomed {
            state.delete_cart_rows(*id);
        }
        Ok(doomed.len() as u64)
    }

    async fn delete_all_carts(&self, customer_id: UserId) -> Result<u64> {
        let mut state = self.state.write().await;
        let doomed: Vec<CartId> = state
            .carts
            .values()
            .filter(|c| c.customer_id == customer_id)
            .map(|c| c.id)
            .collect();
        for id in &doomed {
            state.delete_cart_rows(*id);
        }
        Ok(doomed.len() as u64)
    }

    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let existing = state
            .cart_items
            .values_mut()
            .find(|i| i.cart_id == item.cart_id && i.menu_item_id == item.menu_item_id);
        if let Some(line) = existing {
            line.quantity += item.quantity;
            if item.special_instructions.is_some() {
                line.special_instructions = item.special_instructions;
            }
            line.updated_at = now;
            return Ok(line.clone());
        }

        let id = CartItemId::new(state.next_id());
        let row = CartItem {
            id,
            cart_id: item.cart_id,
            menu_item_id: item.menu_item_id,
            quantity: item.quantity,
            special_instructions: item.special_instructions,
            created_at: now,
            updated_at: now,
        };
        state.cart_items.insert(id, row.clone());
        Ok(row)
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>> {
        Ok(self.state.read().await.cart_items.get(&id).cloned())
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let state = self.state.read().await;
        Ok(state
            .cart_items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn update_cart_item(&self, item: CartItem) -> Result<()> {
        let mut state = self.state.write().await;
        match state.cart_items.get_mut(&item.id) {
            Some(row) => {
                *row = item;
                Ok(())
            }
            None => Err(StoreError::Missing("cart item")),
        }
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool> {
        Ok(self.state.write().await.cart_items.remove(&id).is_some())
    }

    async fn clear_cart_items(&self, cart_id: CartId) -> Result<u64> {
        let mut state = self.state.write().await;
        let before = state.cart_items.len();
        state.cart_items.retain(|_, i| i.cart_id != cart_id);
        Ok((before - state.cart_items.len()) as u64)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut state = self.state.write().await;
        let (order, items) = insert_order(&mut state, order, items);
        Ok((order, items))
    }

    async fn create_order_from_cart(
        &self,
        cart_id: CartId,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut state = self.state.write().await;
        if !state.carts.contains_key(&cart_id) {
            return Err(StoreError::Missing("cart"));
        }
        let (order, items) = insert_order(&mut state, order, items);
        state.delete_cart_rows(cart_id);
        Ok((order, items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| matches_filter(o, &filter))
            .cloned()
            .collect();

        match filter.sort {
            OrderSort::CreatedAtDesc => orders.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            OrderSort::CreatedAtAsc => orders.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            OrderSort::UpdatedAtAsc => orders.sort_by(|a, b| a.updated_at.cmp(&b.updated_at)),
            OrderSort::TotalDesc => orders.sort_by(|a, b| b.total.cmp(&a.total)),
            OrderSort::TotalAsc => orders.sort_by(|a, b| a.total.cmp(&b.total)),
        }

        let offset = filter.offset.unwrap_or(0);
        let orders = orders.into_iter().skip(offset);
        Ok(match filter.limit {
            Some(limit) => orders.take(limit).collect(),
            None => orders.collect(),
        })
    }

    async fn list_available_orders(&self, limit: usize) -> Result<Vec<Order>> {
        self.list_orders(
            OrderFilter::new()
                .status(OrderStatus::Ready)
                .unassigned()
                .sort(OrderSort::UpdatedAtAsc)
                .limit(limit),
        )
        .await
    }

    async fn update_order(&self, order: Order) -> Result<()> {
        let mut state = self.state.write().await;
        match state.orders.get_mut(&order.id) {
            Some(row) => {
                *row = order;
                Ok(())
            }
            None => Err(StoreError::Missing("order")),
        }
    }

    async fn get_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>> {
        Ok(self.state.read().await.order_items.get(&id).cloned())
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let state = self.state.read().await;
        Ok(state
            .order_items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn save_order_with_items(
        &self,
        order: Order,
        kept: Vec<OrderItem>,
        added: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>> {
        let mut state = self.state.write().await;
        let order_id = order.id;
        if !state.orders.contains_key(&order_id) {
            return Err(StoreError::Missing("order"));
        }

        state.order_items.retain(|_, i| i.order_id != order_id);
        let mut stored: Vec<OrderItem> = kept
            .into_iter()
            .map(|item| {
                state.order_items.insert(item.id, item.clone());
                item
            })
            .collect();
        stored.extend(state.insert_order_items(order_id, added));
        stored.sort_by_key(|i| i.id);

        // Checked above, the entry cannot be gone.
        if let Some(row) = state.orders.get_mut(&order_id) {
            *row = order;
        }
        Ok(stored)
    }
}

fn insert_order(
    state: &mut State,
    order: NewOrder,
    items: Vec<NewOrderItem>,
) -> (Order, Vec<OrderItem>) {
    let now = Utc::now();
    let id = OrderId::new(state.next_id());
    let row = Order {
        id,
        customer_id: order.customer_id,
        restaurant_id: order.restaurant_id,
        driver_id: None,
        status: OrderStatus::Pending,
        delivery_address: order.delivery_address,
        payment_method: order.payment_method,
        note: order.note,
        estimated_time: None,
        cancellation_reason: None,
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        service_fee: order.service_fee,
        total: order.total,
        created_at: now,
        updated_at: now,
    };
    state.orders.insert(id, row.clone());
    let items = state.insert_order_items(id, items);
    (row, items)
}

fn matches_filter(order: &Order, filter: &OrderFilter) -> bool {
    if !filter.statuses.is_empty() && !filter.statuses.contains(&order.status) {
        return false;
    }
    if let Some(id) = filter.restaurant_id
        && order.restaurant_id != id
    {
        return false;
    }
    if let Some(id) = filter.customer_id
        && order.customer_id != id
    {
        return false;
    }
    if let Some(id) = filter.driver_id
        && order.driver_id != Some(id)
    {
        return false;
    }
    if filter.unassigned && order.driver_id.is_some() {
        return false;
    }
    if let Some(pm) = filter.payment_method
        && order.payment_method != pm
    {
        return false;
    }
    if let Some(after) = filter.placed_after
        && order.created_at < after
    {
        return false;
    }
    if let Some(before) = filter.placed_before
        && order.created_at > before
    {
        return false;
    }
    if let Some(min) = filter.min_total
        && order.total < min
    {
        return false;
    }
    if let Some(max) = filter.max_total
        && order.total > max
    {
        return false;
    }
    true
}

#[async_trait]
impl DriverStore for MemoryStore {
    async fn create_driver(&self, driver: NewDriver) -> Result<DeliveryDriver> {
        let mut state = self.state.write().await;
        if state
            .drivers
            .values()
            .any(|d| d.account_id == driver.account_id)
        {
            return Err(StoreError::DuplicateDriver(driver.account_id));
        }
        let now = Utc::now();
        let id = DriverId::new(state.next_id());
        let row = DeliveryDriver {
            id,
            account_id: driver.account_id,
            name: driver.name,
            phone: driver.phone,
            vehicle: driver.vehicle,
            status: DriverStatus::Offline,
            current_location: driver.current_location,
            rating: 0.0,
            total_deliveries: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        state.drivers.insert(id, row.clone());
        Ok(row)
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<DeliveryDriver>> {
        Ok(self.state.read().await.drivers.get(&id).cloned())
    }

    async fn find_driver_by_account(&self, account_id: UserId) -> Result<Option<DeliveryDriver>> {
        let state = self.state.read().await;
        Ok(state
            .drivers
            .values()
            .find(|d| d.account_id == account_id)
            .cloned())
    }

    async fn list_drivers(&self, filter: DriverFilter) -> Result<Vec<DeliveryDriver>> {
        let state = self.state.read().await;
        let mut drivers: Vec<DeliveryDriver> = state
            .drivers
            .values()
            .filter(|d| {
                filter.status.is_none_or(|s| d.status == s)
                    && filter.is_active.is_none_or(|a| d.is_active == a)
                    && filter.min_rating.is_none_or(|r| d.rating >= r)
            })
            .cloned()
            .collect();

        match filter.sort {
            DriverSort::CreatedAtAsc => drivers.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            DriverSort::RatingDesc => {
                drivers.sort_by(|a, b| b.rating.total_cmp(&a.rating));
            }
            DriverSort::TotalDeliveriesDesc => {
                drivers.sort_by(|a, b| b.total_deliveries.cmp(&a.total_deliveries));
            }
        }

        let offset = filter.offset.unwrap_or(0);
        let drivers = drivers.into_iter().skip(offset);
        Ok(match filter.limit {
            Some(limit) => drivers.take(limit).collect(),
            None => drivers.collect(),
        })
    }

    async fn update_driver(&self, driver: DeliveryDriver) -> Result<()> {
        let mut state = self.state.write().await;
        match state.drivers.get_mut(&driver.id) {
            Some(row) => {
                *row = driver;
                Ok(())
            }
            None => Err(StoreError::Missing("driver")),
        }
    }

    async fn delete_driver(&self, id: DriverId) -> Result<bool> {
        Ok(self.state.write().await.drivers.remove(&id).is_some())
    }

    async fn assign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.drivers.contains_key(&driver_id) {
            return Err(StoreError::Missing("driver"));
        }
        let now = Utc::now();
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Err(StoreError::Missing("order"));
        };
        if order.status != OrderStatus::Ready || order.driver_id.is_some() {
            return Ok(false);
        }
        order.status = OrderStatus::Delivering;
        order.driver_id = Some(driver_id);
        order.updated_at = now;

        if let Some(driver) = state.drivers.get_mut(&driver_id) {
            driver.status = DriverStatus::Delivering;
            driver.updated_at = now;
        }
        Ok(true)
    }

    async fn unassign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Err(StoreError::Missing("order"));
        };
        if order.status != OrderStatus::Delivering || order.driver_id != Some(driver_id) {
            return Ok(false);
        }
        order.status = OrderStatus::Ready;
        order.driver_id = None;
        order.updated_at = now;

        if let Some(driver) = state.drivers.get_mut(&driver_id) {
            driver.status = DriverStatus::Online;
            driver.updated_at = now;
        }
        Ok(true)
    }

    async fn complete_delivery(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Err(StoreError::Missing("order"));
        };
        if order.status != OrderStatus::Delivering || order.driver_id != Some(driver_id) {
            return Ok(false);
        }
        order.status = OrderStatus::Completed;
        order.updated_at = now;

        if let Some(driver) = state.drivers.get_mut(&driver_id) {
            driver.status = DriverStatus::Online;
            driver.total_deliveries += 1;
            driver.updated_at = now;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Money, Role};

    async fn seed_customer(store: &MemoryStore) -> User {
        store
            .create_user(NewUser {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                phone: None,
                address: None,
                role: Role::Customer,
            })
            .await
            .unwrap()
    }

    async fn seed_restaurant(store: &MemoryStore) -> Restaurant {
        let owner = store
            .create_user(NewUser {
                name: "Warung".into(),
                email: "warung@example.com".into(),
                phone: None,
                address: None,
                role: Role::Restaurant,
            })
            .await
            .unwrap();
        store
            .create_restaurant(NewRestaurant {
                owner_id: owner.id,
                name: "Warung Sedap".into(),
                address: None,
                cuisine: Some("indonesian".into()),
                opening_hours: None,
                delivery_fee: Money::from_minor(5000),
            })
            .await
            .unwrap()
    }

    fn new_order(customer: UserId, restaurant: RestaurantId) -> NewOrder {
        NewOrder {
            customer_id: customer,
            restaurant_id: restaurant,
            delivery_address: "Jl. Sudirman 5".into(),
            payment_method: domain::PaymentMethod::Cash,
            note: None,
            subtotal: Money::from_minor(55000),
            delivery_fee: Money::from_minor(5000),
            service_fee: Money::from_minor(2750),
            total: Money::from_minor(62750),
        }
    }

    #[tokio::test]
    async fn add_cart_item_merges_duplicate_lines() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let cart = store
            .create_cart(NewCart {
                customer_id: customer.id,
                restaurant_id: restaurant.id,
                delivery_address: None,
                payment_method: None,
                note: None,
            })
            .await
            .unwrap();

        let first = store
            .add_cart_item(NewCartItem {
                cart_id: cart.id,
                menu_item_id: MenuItemId::new(99),
                quantity: 2,
                special_instructions: None,
            })
            .await
            .unwrap();
        let merged = store
            .add_cart_item(NewCartItem {
                cart_id: cart.id,
                menu_item_id: MenuItemId::new(99),
                quantity: 3,
                special_instructions: Some("no peanuts".into()),
            })
            .await
            .unwrap();

        assert_eq!(merged.id, first.id);
        assert_eq!(merged.quantity, 5);
        assert_eq!(merged.special_instructions.as_deref(), Some("no peanuts"));
        assert_eq!(store.list_cart_items(cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_cart_returns_existing_row_on_duplicate() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let payload = NewCart {
            customer_id: customer.id,
            restaurant_id: restaurant.id,
            delivery_address: Some("Jl. Sudirman 5".into()),
            payment_method: None,
            note: None,
        };

        let first = store.create_cart(payload.clone()).await.unwrap();
        let second = store.create_cart(payload).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(store.list_carts(customer.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_other_carts_keeps_target_restaurant() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let r1 = seed_restaurant(&store).await;
        let r2 = seed_restaurant(&store).await;
        for r in [r1.id, r2.id] {
            store
                .create_cart(NewCart {
                    customer_id: customer.id,
                    restaurant_id: r,
                    delivery_address: None,
                    payment_method: None,
                    note: None,
                })
                .await
                .unwrap();
        }

        let removed = store.delete_other_carts(customer.id, r2.id).await.unwrap();
        assert_eq!(removed, 1);
        let remaining = store.list_carts(customer.id).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].restaurant_id, r2.id);
    }

    #[tokio::test]
    async fn checkout_write_removes_cart_and_creates_order() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let cart = store
            .create_cart(NewCart {
                customer_id: customer.id,
                restaurant_id: restaurant.id,
                delivery_address: Some("Jl. Sudirman 5".into()),
                payment_method: None,
                note: None,
            })
            .await
            .unwrap();

        let (order, items) = store
            .create_order_from_cart(
                cart.id,
                new_order(customer.id, restaurant.id),
                vec![NewOrderItem {
                    menu_item_id: MenuItemId::new(1),
                    quantity: 2,
                    unit_price: Money::from_minor(20000),
                    special_instructions: None,
                }],
            )
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(items.len(), 1);
        assert!(store.get_cart(cart.id).await.unwrap().is_none());

        // Second checkout of the same cart fails
        let err = store
            .create_order_from_cart(cart.id, new_order(customer.id, restaurant.id), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing("cart")));
    }

    #[tokio::test]
    async fn save_order_with_items_replaces_line_set() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let (mut order, items) = store
            .create_order(
                new_order(customer.id, restaurant.id),
                vec![
                    NewOrderItem {
                        menu_item_id: MenuItemId::new(1),
                        quantity: 2,
                        unit_price: Money::from_minor(20000),
                        special_instructions: None,
                    },
                    NewOrderItem {
                        menu_item_id: MenuItemId::new(2),
                        quantity: 1,
                        unit_price: Money::from_minor(15000),
                        special_instructions: None,
                    },
                ],
            )
            .await
            .unwrap();

        // Drop the second line, add a third
        order.recompute_totals(&items[..1], Utc::now());
        let stored = store
            .save_order_with_items(
                order.clone(),
                vec![items[0].clone()],
                vec![NewOrderItem {
                    menu_item_id: MenuItemId::new(3),
                    quantity: 1,
                    unit_price: Money::from_minor(8000),
                    special_instructions: None,
                }],
            )
            .await
            .unwrap();

        assert_eq!(stored.len(), 2);
        assert_eq!(store.list_order_items(order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn assign_driver_is_first_wins() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let (mut order, _) = store
            .create_order(new_order(customer.id, restaurant.id), vec![])
            .await
            .unwrap();
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            order.transition_to(next, Utc::now()).unwrap();
        }
        store.update_order(order.clone()).await.unwrap();

        let d1 = store
            .create_driver(NewDriver {
                account_id: UserId::new(100),
                name: "Budi".into(),
                phone: None,
                vehicle: None,
                current_location: None,
            })
            .await
            .unwrap();
        let d2 = store
            .create_driver(NewDriver {
                account_id: UserId::new(101),
                name: "Citra".into(),
                phone: None,
                vehicle: None,
                current_location: None,
            })
            .await
            .unwrap();

        assert!(store.assign_driver(order.id, d1.id).await.unwrap());
        assert!(!store.assign_driver(order.id, d2.id).await.unwrap());

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Delivering);
        assert_eq!(stored.driver_id, Some(d1.id));
        let winner = store.get_driver(d1.id).await.unwrap().unwrap();
        assert_eq!(winner.status, DriverStatus::Delivering);
        let loser = store.get_driver(d2.id).await.unwrap().unwrap();
        assert_eq!(loser.status, DriverStatus::Offline);
    }

    #[tokio::test]
    async fn complete_delivery_increments_counter_and_frees_driver() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;
        let (mut order, _) = store
            .create_order(new_order(customer.id, restaurant.id), vec![])
            .await
            .unwrap();
        for next in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            order.transition_to(next, Utc::now()).unwrap();
        }
        store.update_order(order.clone()).await.unwrap();

        let driver = store
            .create_driver(NewDriver {
                account_id: UserId::new(100),
                name: "Budi".into(),
                phone: None,
                vehicle: None,
                current_location: None,
            })
            .await
            .unwrap();
        assert!(store.assign_driver(order.id, driver.id).await.unwrap());
        assert!(store.complete_delivery(order.id, driver.id).await.unwrap());

        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Completed);
        let driver = store.get_driver(driver.id).await.unwrap().unwrap();
        assert_eq!(driver.status, DriverStatus::Online);
        assert_eq!(driver.total_deliveries, 1);

        // Completing twice is a no-op failure
        assert!(!store.complete_delivery(order.id, driver.id).await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_driver_profile_rejected() {
        let store = MemoryStore::new();
        let payload = NewDriver {
            account_id: UserId::new(100),
            name: "Budi".into(),
            phone: None,
            vehicle: None,
            current_location: None,
        };
        store.create_driver(payload.clone()).await.unwrap();
        let err = store.create_driver(payload).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateDriver(_)));
    }

    #[tokio::test]
    async fn list_available_orders_oldest_first() {
        let store = MemoryStore::new();
        let customer = seed_customer(&store).await;
        let restaurant = seed_restaurant(&store).await;

        let mut ids = Vec::new();
        for _ in 0..3 {
            let (mut order, _) = store
                .create_order(new_order(customer.id, restaurant.id), vec![])
                .await
                .unwrap();
            for next in [
                OrderStatus::Confirmed,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ] {
                order.transition_to(next, Utc::now()).unwrap();
            }
            store.update_order(order.clone()).await.unwrap();
            ids.push(order.id);
        }

        let available = store.list_available_orders(10).await.unwrap();
        assert_eq!(available.len(), 3);
        let listed: Vec<OrderId> = available.iter().map(|o| o.id).collect();
        assert_eq!(listed, ids);

        let limited = store.list_available_orders(2).await.unwrap();
        assert_eq!(limited.len(), 2);
    }
}
