//! PostgreSQL storage backend.
//!
//! Row mapping is done by hand from `PgRow`; enum-like columns are TEXT in
//! the canonical string form of the Rust enums. Compound operations run in
//! a transaction; the assignment writes use conditional UPDATEs checked via
//! `rows_affected`, so two racing drivers can never both win.

use async_trait::async_trait;
use common::{
    CartId, CartItemId, DriverId, MenuItemId, Money, OrderId, OrderItemId, RestaurantId, UserId,
};
use domain::{
    Cart, CartItem, DeliveryDriver, MenuItem, NewCart, NewCartItem, NewDriver, NewMenuItem,
    NewOrder, NewOrderItem, NewRestaurant, NewUser, Order, OrderItem, Restaurant, User,
};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::query::{DriverFilter, DriverSort, OrderFilter, OrderSort};
use crate::repo::{CartStore, CatalogStore, DriverStore, OrderStore, UserStore};
use crate::{Result, StoreError};

const ORDER_COLUMNS: &str = "id, customer_id, restaurant_id, driver_id, status, \
     delivery_address, payment_method, note, estimated_time, cancellation_reason, \
     subtotal, delivery_fee, service_fee, total, created_at, updated_at";

const DRIVER_COLUMNS: &str = "id, account_id, name, phone, vehicle, status, \
     current_location, rating, total_deliveries, is_active, created_at, updated_at";

/// PostgreSQL storage backend.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn parse_enum<T>(value: &str) -> Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(StoreError::Decode)
}

fn row_to_user(row: PgRow) -> Result<User> {
    Ok(User {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        address: row.try_get("address")?,
        role: parse_enum(row.try_get::<String, _>("role")?.as_str())?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_restaurant(row: PgRow) -> Result<Restaurant> {
    Ok(Restaurant {
        id: RestaurantId::new(row.try_get("id")?),
        owner_id: UserId::new(row.try_get("owner_id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        cuisine: row.try_get("cuisine")?,
        rating: row.try_get("rating")?,
        opening_hours: row.try_get("opening_hours")?,
        delivery_fee: Money::from_minor(row.try_get("delivery_fee")?),
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_menu_item(row: PgRow) -> Result<MenuItem> {
    Ok(MenuItem {
        id: MenuItemId::new(row.try_get("id")?),
        restaurant_id: RestaurantId::new(row.try_get("restaurant_id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_minor(row.try_get("price")?),
        category: row.try_get("category")?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart(row: PgRow) -> Result<Cart> {
    let payment_method = row
        .try_get::<Option<String>, _>("payment_method")?
        .map(|s| parse_enum(&s))
        .transpose()?;
    Ok(Cart {
        id: CartId::new(row.try_get("id")?),
        customer_id: UserId::new(row.try_get("customer_id")?),
        restaurant_id: RestaurantId::new(row.try_get("restaurant_id")?),
        delivery_address: row.try_get("delivery_address")?,
        payment_method,
        note: row.try_get("note")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_cart_item(row: PgRow) -> Result<CartItem> {
    Ok(CartItem {
        id: CartItemId::new(row.try_get("id")?),
        cart_id: CartId::new(row.try_get("cart_id")?),
        menu_item_id: MenuItemId::new(row.try_get("menu_item_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        special_instructions: row.try_get("special_instructions")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: PgRow) -> Result<Order> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        customer_id: UserId::new(row.try_get("customer_id")?),
        restaurant_id: RestaurantId::new(row.try_get("restaurant_id")?),
        driver_id: row.try_get::<Option<i64>, _>("driver_id")?.map(DriverId::new),
        status: parse_enum(row.try_get::<String, _>("status")?.as_str())?,
        delivery_address: row.try_get("delivery_address")?,
        payment_method: parse_enum(row.try_get::<String, _>("payment_method")?.as_str())?,
        note: row.try_get("note")?,
        estimated_time: row.try_get("estimated_time")?,
        cancellation_reason: row.try_get("cancellation_reason")?,
        subtotal: Money::from_minor(row.try_get("subtotal")?),
        delivery_fee: Money::from_minor(row.try_get("delivery_fee")?),
        service_fee: Money::from_minor(row.try_get("service_fee")?),
        total: Money::from_minor(row.try_get("total")?),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order_item(row: PgRow) -> Result<OrderItem> {
    Ok(OrderItem {
        id: OrderItemId::new(row.try_get("id")?),
        order_id: OrderId::new(row.try_get("order_id")?),
        menu_item_id: MenuItemId::new(row.try_get("menu_item_id")?),
        quantity: row.try_get::<i32, _>("quantity")? as u32,
        unit_price: Money::from_minor(row.try_get("unit_price")?),
        special_instructions: row.try_get("special_instructions")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_driver(row: PgRow) -> Result<DeliveryDriver> {
    Ok(DeliveryDriver {
        id: DriverId::new(row.try_get("id")?),
        account_id: UserId::new(row.try_get("account_id")?),
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        vehicle: row.try_get("vehicle")?,
        status: parse_enum(row.try_get::<String, _>("status")?.as_str())?,
        current_location: row.try_get("current_location")?,
        rating: row.try_get("rating")?,
        total_deliveries: row.try_get::<i32, _>("total_deliveries")? as u32,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

async fn insert_order_items(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order_id: OrderId,
    items: &[NewOrderItem],
) -> Result<Vec<OrderItem>> {
    let mut stored = Vec::with_capacity(items.len());
    for item in items {
        let row = sqlx::query(
            r#"
            INSERT INTO order_items (order_id, menu_item_id, quantity, unit_price, special_instructions)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, order_id, menu_item_id, quantity, unit_price, special_instructions, created_at, updated_at
            "#,
        )
        .bind(order_id.get())
        .bind(item.menu_item_id.get())
        .bind(item.quantity as i32)
        .bind(item.unit_price.minor())
        .bind(&item.special_instructions)
        .fetch_one(&mut **tx)
        .await?;
        stored.push(row_to_order_item(row)?);
    }
    Ok(stored)
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let row = sqlx::query(
            r#"
            INSERT INTO users (name, email, phone, address, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, address, role, created_at, updated_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.address)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        row_to_user(row)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, phone, address, role, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_user).transpose()
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn create_restaurant(&self, restaurant: NewRestaurant) -> Result<Restaurant> {
        let row = sqlx::query(
            r#"
            INSERT INTO restaurants (owner_id, name, address, cuisine, opening_hours, delivery_fee)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, owner_id, name, address, cuisine, rating, opening_hours,
                      delivery_fee, is_active, created_at, updated_at
            "#,
        )
        .bind(restaurant.owner_id.get())
        .bind(&restaurant.name)
        .bind(&restaurant.address)
        .bind(&restaurant.cuisine)
        .bind(&restaurant.opening_hours)
        .bind(restaurant.delivery_fee.minor())
        .fetch_one(&self.pool)
        .await?;
        row_to_restaurant(row)
    }

    async fn get_restaurant(&self, id: RestaurantId) -> Result<Option<Restaurant>> {
        let row = sqlx::query(
            "SELECT id, owner_id, name, address, cuisine, rating, opening_hours, \
             delivery_fee, is_active, created_at, updated_at \
             FROM restaurants WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_restaurant).transpose()
    }

    async fn list_restaurants(&self) -> Result<Vec<Restaurant>> {
        let rows = sqlx::query(
            "SELECT id, owner_id, name, address, cuisine, rating, opening_hours, \
             delivery_fee, is_active, created_at, updated_at \
             FROM restaurants ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_restaurant).collect()
    }

    async fn update_restaurant(&self, restaurant: Restaurant) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE restaurants
            SET name = $2, address = $3, cuisine = $4, rating = $5, opening_hours = $6,
                delivery_fee = $7, is_active = $8, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(restaurant.id.get())
        .bind(&restaurant.name)
        .bind(&restaurant.address)
        .bind(&restaurant.cuisine)
        .bind(restaurant.rating)
        .bind(&restaurant.opening_hours)
        .bind(restaurant.delivery_fee.minor())
        .bind(restaurant.is_active)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("restaurant"));
        }
        Ok(())
    }

    async fn create_menu_item(&self, item: NewMenuItem) -> Result<MenuItem> {
        let row = sqlx::query(
            r#"
            INSERT INTO menu_items (restaurant_id, name, description, price, category)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, restaurant_id, name, description, price, category, is_available,
                      created_at, updated_at
            "#,
        )
        .bind(item.restaurant_id.get())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.minor())
        .bind(&item.category)
        .fetch_one(&self.pool)
        .await?;
        row_to_menu_item(row)
    }

    async fn get_menu_item(&self, id: MenuItemId) -> Result<Option<MenuItem>> {
        let row = sqlx::query(
            "SELECT id, restaurant_id, name, description, price, category, is_available, \
             created_at, updated_at FROM menu_items WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_menu_item).transpose()
    }

    async fn get_menu_items(&self, ids: &[MenuItemId]) -> Result<Vec<MenuItem>> {
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, description, price, category, is_available, \
             created_at, updated_at FROM menu_items WHERE id = ANY($1)",
        )
        .bind(&raw)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_menu_item).collect()
    }

    async fn list_menu_items(&self, restaurant_id: RestaurantId) -> Result<Vec<MenuItem>> {
        let rows = sqlx::query(
            "SELECT id, restaurant_id, name, description, price, category, is_available, \
             created_at, updated_at FROM menu_items WHERE restaurant_id = $1 ORDER BY id",
        )
        .bind(restaurant_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_menu_item).collect()
    }

    async fn update_menu_item(&self, item: MenuItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE menu_items
            SET name = $2, description = $3, price = $4, category = $5, is_available = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(item.id.get())
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price.minor())
        .bind(&item.category)
        .bind(item.is_available)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("menu item"));
        }
        Ok(())
    }

    async fn delete_menu_item(&self, id: MenuItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn create_cart(&self, cart: NewCart) -> Result<Cart> {
        // One cart per (customer, restaurant); a racing creator loses the
        // insert and picks up the row that won.
        let row = sqlx::query(
            r#"
            INSERT INTO carts (customer_id, restaurant_id, delivery_address, payment_method, note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (customer_id, restaurant_id) DO NOTHING
            RETURNING id, customer_id, restaurant_id, delivery_address, payment_method, note,
                      created_at, updated_at
            "#,
        )
        .bind(cart.customer_id.get())
        .bind(cart.restaurant_id.get())
        .bind(&cart.delivery_address)
        .bind(cart.payment_method.map(|pm| pm.as_str()))
        .bind(&cart.note)
        .fetch_optional(&self.pool)
        .await?;
        match row {
            Some(row) => row_to_cart(row),
            None => self
                .find_cart(cart.customer_id, cart.restaurant_id)
                .await?
                .ok_or(StoreError::Missing("cart")),
        }
    }

    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT id, customer_id, restaurant_id, delivery_address, payment_method, note, \
             created_at, updated_at FROM carts WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_cart).transpose()
    }

    async fn find_cart(
        &self,
        customer_id: UserId,
        restaurant_id: RestaurantId,
    ) -> Result<Option<Cart>> {
        let row = sqlx::query(
            "SELECT id, customer_id, restaurant_id, delivery_address, payment_method, note, \
             created_at, updated_at FROM carts WHERE customer_id = $1 AND restaurant_id = $2",
        )
        .bind(customer_id.get())
        .bind(restaurant_id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_cart).transpose()
    }

    async fn list_carts(&self, customer_id: UserId) -> Result<Vec<Cart>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, restaurant_id, delivery_address, payment_method, note, \
             created_at, updated_at FROM carts WHERE customer_id = $1 ORDER BY id",
        )
        .bind(customer_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_cart).collect()
    }

    async fn update_cart(&self, cart: Cart) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET delivery_address = $2, payment_method = $3, note = $4, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(cart.id.get())
        .bind(&cart.delivery_address)
        .bind(cart.payment_method.map(|pm| pm.as_str()))
        .bind(&cart.note)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("cart"));
        }
        Ok(())
    }

    async fn delete_cart(&self, id: CartId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_other_carts(
        &self,
        customer_id: UserId,
        keep_restaurant: RestaurantId,
    ) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM carts WHERE customer_id = $1 AND restaurant_id <> $2")
                .bind(customer_id.get())
                .bind(keep_restaurant.get())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete_all_carts(&self, customer_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM carts WHERE customer_id = $1")
            .bind(customer_id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem> {
        // The unique (cart_id, menu_item_id) constraint makes the merge
        // atomic under concurrent adds.
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (cart_id, menu_item_id, quantity, special_instructions)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT ON CONSTRAINT unique_cart_menu_item DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity,
                special_instructions = COALESCE(EXCLUDED.special_instructions,
                                                cart_items.special_instructions),
                updated_at = now()
            RETURNING id, cart_id, menu_item_id, quantity, special_instructions,
                      created_at, updated_at
            "#,
        )
        .bind(item.cart_id.get())
        .bind(item.menu_item_id.get())
        .bind(item.quantity as i32)
        .bind(&item.special_instructions)
        .fetch_one(&self.pool)
        .await?;
        row_to_cart_item(row)
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>> {
        let row = sqlx::query(
            "SELECT id, cart_id, menu_item_id, quantity, special_instructions, \
             created_at, updated_at FROM cart_items WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_cart_item).transpose()
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let rows = sqlx::query(
            "SELECT id, cart_id, menu_item_id, quantity, special_instructions, \
             created_at, updated_at FROM cart_items WHERE cart_id = $1 ORDER BY id",
        )
        .bind(cart_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_cart_item).collect()
    }

    async fn update_cart_item(&self, item: CartItem) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $2, special_instructions = $3, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(item.id.get())
        .bind(item.quantity as i32)
        .bind(&item.special_instructions)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("cart item"));
        }
        Ok(())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart_items(&self, cart_id: CartId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OrderStore for PostgresStore {
    async fn create_order(
        &self,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut tx = self.pool.begin().await?;
        let row = insert_order_row(&mut tx, &order).await?;
        let order = row_to_order(row)?;
        let items = insert_order_items(&mut tx, order.id, &items).await?;
        tx.commit().await?;
        Ok((order, items))
    }

    async fn create_order_from_cart(
        &self,
        cart_id: CartId,
        order: NewOrder,
        items: Vec<NewOrderItem>,
    ) -> Result<(Order, Vec<OrderItem>)> {
        let mut tx = self.pool.begin().await?;

        // The delete doubles as the claim on the cart: losing a double
        // checkout race surfaces here instead of creating two orders.
        let deleted = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.get())
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::Missing("cart"));
        }

        let row = insert_order_row(&mut tx, &order).await?;
        let order = row_to_order(row)?;
        let items = insert_order_items(&mut tx, order.id, &items).await?;
        tx.commit().await?;
        Ok((order, items))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        row.map(row_to_order).transpose()
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let mut sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1");
        let mut param = 0;

        if !filter.statuses.is_empty() {
            param += 1;
            sql.push_str(&format!(" AND status = ANY(${param})"));
        }
        if filter.restaurant_id.is_some() {
            param += 1;
            sql.push_str(&format!(" AND restaurant_id = ${param}"));
        }
        if filter.customer_id.is_some() {
            param += 1;
            sql.push_str(&format!(" AND customer_id = ${param}"));
        }
        if filter.driver_id.is_some() {
            param += 1;
            sql.push_str(&format!(" AND driver_id = ${param}"));
        }
        if filter.unassigned {
            sql.push_str(" AND driver_id IS NULL");
        }
        if filter.payment_method.is_some() {
            param += 1;
            sql.push_str(&format!(" AND payment_method = ${param}"));
        }
        if filter.placed_after.is_some() {
            param += 1;
            sql.push_str(&format!(" AND created_at >= ${param}"));
        }
        if filter.placed_before.is_some() {
            param += 1;
            sql.push_str(&format!(" AND created_at <= ${param}"));
        }
        if filter.min_total.is_some() {
            param += 1;
            sql.push_str(&format!(" AND total >= ${param}"));
        }
        if filter.max_total.is_some() {
            param += 1;
            sql.push_str(&format!(" AND total <= ${param}"));
        }

        sql.push_str(match filter.sort {
            OrderSort::CreatedAtDesc => " ORDER BY created_at DESC",
            OrderSort::CreatedAtAsc => " ORDER BY created_at ASC",
            OrderSort::UpdatedAtAsc => " ORDER BY updated_at ASC",
            OrderSort::TotalDesc => " ORDER BY total DESC",
            OrderSort::TotalAsc => " ORDER BY total ASC",
        });
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let mut query = sqlx::query(&sql);
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> =
                filter.statuses.iter().map(|s| s.as_str().to_string()).collect();
            query = query.bind(statuses);
        }
        if let Some(id) = filter.restaurant_id {
            query = query.bind(id.get());
        }
        if let Some(id) = filter.customer_id {
            query = query.bind(id.get());
        }
        if let Some(id) = filter.driver_id {
            query = query.bind(id.get());
        }
        if let Some(pm) = filter.payment_method {
            query = query.bind(pm.as_str());
        }
        if let Some(after) = filter.placed_after {
            query = query.bind(after);
        }
        if let Some(before) = filter.placed_before {
            query = query.bind(before);
        }
        if let Some(min) = filter.min_total {
            query = query.bind(min.minor());
        }
        if let Some(max) = filter.max_total {
            query = query.bind(max.minor());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn list_available_orders(&self, limit: usize) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status = 'ready' AND driver_id IS NULL \
             ORDER BY updated_at ASC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order).collect()
    }

    async fn update_order(&self, order: Order) -> Result<()> {
        let result = update_order_row(&self.pool, &order).await?;
        if result == 0 {
            return Err(StoreError::Missing("order"));
        }
        Ok(())
    }

    async fn get_order_item(&self, id: OrderItemId) -> Result<Option<OrderItem>> {
        let row = sqlx::query(
            "SELECT id, order_id, menu_item_id, quantity, unit_price, special_instructions, \
             created_at, updated_at FROM order_items WHERE id = $1",
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_order_item).transpose()
    }

    async fn list_order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            "SELECT id, order_id, menu_item_id, quantity, unit_price, special_instructions, \
             created_at, updated_at FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order_id.get())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_order_item).collect()
    }

    async fn save_order_with_items(
        &self,
        order: Order,
        kept: Vec<OrderItem>,
        added: Vec<NewOrderItem>,
    ) -> Result<Vec<OrderItem>> {
        let mut tx = self.pool.begin().await?;

        let updated = update_order_row(&mut *tx, &order).await?;
        if updated == 0 {
            return Err(StoreError::Missing("order"));
        }

        let kept_ids: Vec<i64> = kept.iter().map(|i| i.id.get()).collect();
        sqlx::query("DELETE FROM order_items WHERE order_id = $1 AND NOT (id = ANY($2))")
            .bind(order.id.get())
            .bind(&kept_ids)
            .execute(&mut *tx)
            .await?;

        for item in &kept {
            sqlx::query(
                r#"
                UPDATE order_items
                SET quantity = $2, special_instructions = $3, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(item.id.get())
            .bind(item.quantity as i32)
            .bind(&item.special_instructions)
            .execute(&mut *tx)
            .await?;
        }
        insert_order_items(&mut tx, order.id, &added).await?;

        let rows = sqlx::query(
            "SELECT id, order_id, menu_item_id, quantity, unit_price, special_instructions, \
             created_at, updated_at FROM order_items WHERE order_id = $1 ORDER BY id",
        )
        .bind(order.id.get())
        .fetch_all(&mut *tx)
        .await?;
        let stored: Result<Vec<OrderItem>> = rows.into_iter().map(row_to_order_item).collect();
        let stored = stored?;

        tx.commit().await?;
        Ok(stored)
    }
}

async fn insert_order_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    order: &NewOrder,
) -> Result<PgRow> {
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO orders (customer_id, restaurant_id, delivery_address, payment_method,
                            note, subtotal, delivery_fee, service_fee, total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING {ORDER_COLUMNS}
        "#
    ))
    .bind(order.customer_id.get())
    .bind(order.restaurant_id.get())
    .bind(&order.delivery_address)
    .bind(order.payment_method.as_str())
    .bind(&order.note)
    .bind(order.subtotal.minor())
    .bind(order.delivery_fee.minor())
    .bind(order.service_fee.minor())
    .bind(order.total.minor())
    .fetch_one(&mut **tx)
    .await?;
    Ok(row)
}

async fn update_order_row<'a, E>(executor: E, order: &Order) -> Result<u64>
where
    E: sqlx::PgExecutor<'a>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET driver_id = $2, status = $3, delivery_address = $4, payment_method = $5,
            note = $6, estimated_time = $7, cancellation_reason = $8,
            subtotal = $9, delivery_fee = $10, service_fee = $11, total = $12,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(order.id.get())
    .bind(order.driver_id.map(|d| d.get()))
    .bind(order.status.as_str())
    .bind(&order.delivery_address)
    .bind(order.payment_method.as_str())
    .bind(&order.note)
    .bind(&order.estimated_time)
    .bind(&order.cancellation_reason)
    .bind(order.subtotal.minor())
    .bind(order.delivery_fee.minor())
    .bind(order.service_fee.minor())
    .bind(order.total.minor())
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl DriverStore for PostgresStore {
    async fn create_driver(&self, driver: NewDriver) -> Result<DeliveryDriver> {
        let account_id = driver.account_id;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO delivery_drivers (account_id, name, phone, vehicle, current_location)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {DRIVER_COLUMNS}
            "#
        ))
        .bind(driver.account_id.get())
        .bind(&driver.name)
        .bind(&driver.phone)
        .bind(&driver.vehicle)
        .bind(&driver.current_location)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_driver_account")
            {
                return StoreError::DuplicateDriver(account_id);
            }
            StoreError::Database(e)
        })?;
        row_to_driver(row)
    }

    async fn get_driver(&self, id: DriverId) -> Result<Option<DeliveryDriver>> {
        let row = sqlx::query(&format!(
            "SELECT {DRIVER_COLUMNS} FROM delivery_drivers WHERE id = $1"
        ))
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_driver).transpose()
    }

    async fn find_driver_by_account(&self, account_id: UserId) -> Result<Option<DeliveryDriver>> {
        let row = sqlx::query(&format!(
            "SELECT {DRIVER_COLUMNS} FROM delivery_drivers WHERE account_id = $1"
        ))
        .bind(account_id.get())
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_driver).transpose()
    }

    async fn list_drivers(&self, filter: DriverFilter) -> Result<Vec<DeliveryDriver>> {
        let mut sql = format!("SELECT {DRIVER_COLUMNS} FROM delivery_drivers WHERE 1=1");
        let mut param = 0;

        if filter.status.is_some() {
            param += 1;
            sql.push_str(&format!(" AND status = ${param}"));
        }
        if filter.is_active.is_some() {
            param += 1;
            sql.push_str(&format!(" AND is_active = ${param}"));
        }
        if filter.min_rating.is_some() {
            param += 1;
            sql.push_str(&format!(" AND rating >= ${param}"));
        }

        sql.push_str(match filter.sort {
            DriverSort::CreatedAtAsc => " ORDER BY created_at ASC",
            DriverSort::RatingDesc => " ORDER BY rating DESC",
            DriverSort::TotalDeliveriesDesc => " ORDER BY total_deliveries DESC",
        });
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(active) = filter.is_active {
            query = query.bind(active);
        }
        if let Some(rating) = filter.min_rating {
            query = query.bind(rating);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.into_iter().map(row_to_driver).collect()
    }

    async fn update_driver(&self, driver: DeliveryDriver) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE delivery_drivers
            SET name = $2, phone = $3, vehicle = $4, status = $5, current_location = $6,
                rating = $7, total_deliveries = $8, is_active = $9, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(driver.id.get())
        .bind(&driver.name)
        .bind(&driver.phone)
        .bind(&driver.vehicle)
        .bind(driver.status.as_str())
        .bind(&driver.current_location)
        .bind(driver.rating)
        .bind(driver.total_deliveries as i32)
        .bind(driver.is_active)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing("driver"));
        }
        Ok(())
    }

    async fn delete_driver(&self, id: DriverId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM delivery_drivers WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn assign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // The WHERE clause carries the whole race: only one of two
        // concurrent assignments can match a ready, unassigned row.
        let claimed = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'delivering', driver_id = $2, updated_at = now()
            WHERE id = $1 AND status = 'ready' AND driver_id IS NULL
            "#,
        )
        .bind(order_id.get())
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
                .bind(order_id.get())
                .fetch_optional(&mut *tx)
                .await?;
            return match exists {
                Some(_) => Ok(false),
                None => Err(StoreError::Missing("order")),
            };
        }

        let flipped = sqlx::query(
            "UPDATE delivery_drivers SET status = 'Delivering', updated_at = now() WHERE id = $1",
        )
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() == 0 {
            return Err(StoreError::Missing("driver"));
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn unassign_driver(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let reverted = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'ready', driver_id = NULL, updated_at = now()
            WHERE id = $1 AND status = 'delivering' AND driver_id = $2
            "#,
        )
        .bind(order_id.get())
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;
        if reverted.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE delivery_drivers SET status = 'Online', updated_at = now() WHERE id = $1",
        )
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn complete_delivery(&self, order_id: OrderId, driver_id: DriverId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let completed = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'completed', updated_at = now()
            WHERE id = $1 AND status = 'delivering' AND driver_id = $2
            "#,
        )
        .bind(order_id.get())
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;
        if completed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE delivery_drivers
            SET status = 'Online', total_deliveries = total_deliveries + 1, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(driver_id.get())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}
