//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and truncate between tests,
//! so they are serialized. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration
//! ```

use std::sync::Arc;

use common::{Money, UserId};
use domain::{
    DriverStatus, NewCart, NewCartItem, NewDriver, NewMenuItem, NewOrder, NewOrderItem,
    NewRestaurant, OrderStatus, PaymentMethod,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CartStore, CatalogStore, DriverStore, OrderFilter, OrderSort, OrderStore, PostgresStore,
    StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/20250301000001_create_platform_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE order_items, orders, cart_items, carts, delivery_drivers, menu_items, \
         restaurants, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresStore::new(pool)
}

async fn seed_restaurant(store: &PostgresStore) -> (domain::Restaurant, Vec<domain::MenuItem>) {
    let restaurant = store
        .create_restaurant(NewRestaurant {
            owner_id: UserId::new(200),
            name: "Warung Tekno".into(),
            address: None,
            cuisine: Some("Indonesian".into()),
            opening_hours: None,
            delivery_fee: Money::from_minor(5000),
        })
        .await
        .unwrap();
    let mut items = Vec::new();
    for (name, price) in [("Nasi Goreng", 20000), ("Es Teh", 15000)] {
        items.push(
            store
                .create_menu_item(NewMenuItem {
                    restaurant_id: restaurant.id,
                    name: name.into(),
                    description: None,
                    price: Money::from_minor(price),
                    category: None,
                })
                .await
                .unwrap(),
        );
    }
    (restaurant, items)
}

fn new_order(restaurant: &domain::Restaurant) -> NewOrder {
    NewOrder {
        customer_id: UserId::new(100),
        restaurant_id: restaurant.id,
        delivery_address: "Jl. Sudirman 5".into(),
        payment_method: PaymentMethod::Cash,
        note: None,
        subtotal: Money::from_minor(55000),
        delivery_fee: Money::from_minor(5000),
        service_fee: Money::from_minor(2750),
        total: Money::from_minor(62750),
    }
}

fn order_lines(items: &[domain::MenuItem]) -> Vec<NewOrderItem> {
    vec![
        NewOrderItem {
            menu_item_id: items[0].id,
            quantity: 2,
            unit_price: items[0].price,
            special_instructions: None,
        },
        NewOrderItem {
            menu_item_id: items[1].id,
            quantity: 1,
            unit_price: items[1].price,
            special_instructions: Some("less sugar".into()),
        },
    ]
}

#[tokio::test]
#[serial]
async fn restaurant_and_menu_roundtrip() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let loaded = store.get_restaurant(restaurant.id).await.unwrap().unwrap();
    assert_eq!(loaded.name, "Warung Tekno");
    assert_eq!(loaded.delivery_fee, Money::from_minor(5000));
    assert!(loaded.is_active);

    let menu = store.list_menu_items(restaurant.id).await.unwrap();
    assert_eq!(menu.len(), 2);

    let mut item = items[0].clone();
    item.is_available = false;
    item.price = Money::from_minor(22000);
    store.update_menu_item(item.clone()).await.unwrap();
    let back = store.get_menu_item(item.id).await.unwrap().unwrap();
    assert!(!back.is_available);
    assert_eq!(back.price, Money::from_minor(22000));

    assert!(store.delete_menu_item(item.id).await.unwrap());
    assert!(store.get_menu_item(item.id).await.unwrap().is_none());
}

#[tokio::test]
#[serial]
async fn add_cart_item_merges_on_conflict() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let cart = store
        .create_cart(NewCart {
            customer_id: UserId::new(100),
            restaurant_id: restaurant.id,
            delivery_address: None,
            payment_method: None,
            note: None,
        })
        .await
        .unwrap();

    for _ in 0..2 {
        store
            .add_cart_item(NewCartItem {
                cart_id: cart.id,
                menu_item_id: items[0].id,
                quantity: 2,
                special_instructions: None,
            })
            .await
            .unwrap();
    }

    let lines = store.list_cart_items(cart.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 4);
}

#[tokio::test]
#[serial]
async fn create_cart_reuses_existing_row() {
    let store = get_test_store().await;
    let (restaurant, _) = seed_restaurant(&store).await;

    let payload = NewCart {
        customer_id: UserId::new(100),
        restaurant_id: restaurant.id,
        delivery_address: Some("Jl. Sudirman 5".into()),
        payment_method: None,
        note: None,
    };
    let first = store.create_cart(payload.clone()).await.unwrap();
    let second = store.create_cart(payload).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(
        store.list_carts(UserId::new(100)).await.unwrap().len(),
        1
    );
}

#[tokio::test]
#[serial]
async fn checkout_consumes_cart_exactly_once() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let cart = store
        .create_cart(NewCart {
            customer_id: UserId::new(100),
            restaurant_id: restaurant.id,
            delivery_address: Some("Jl. Sudirman 5".into()),
            payment_method: None,
            note: None,
        })
        .await
        .unwrap();

    let (order, stored) = store
        .create_order_from_cart(cart.id, new_order(&restaurant), order_lines(&items))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Money::from_minor(62750));
    assert_eq!(stored.len(), 2);
    assert!(store.get_cart(cart.id).await.unwrap().is_none());

    // the cart row is gone, so a second checkout cannot happen
    let err = store
        .create_order_from_cart(cart.id, new_order(&restaurant), order_lines(&items))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Missing("cart")));
}

#[tokio::test]
#[serial]
async fn assign_driver_is_conditional() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let (mut order, _) = store
        .create_order(new_order(&restaurant), order_lines(&items))
        .await
        .unwrap();
    order.status = OrderStatus::Ready;
    store.update_order(order.clone()).await.unwrap();

    let mut drivers = Vec::new();
    for n in 0..2 {
        let mut d = store
            .create_driver(NewDriver {
                account_id: UserId::new(300 + n),
                name: format!("Driver {n}"),
                phone: None,
                vehicle: None,
                current_location: None,
            })
            .await
            .unwrap();
        d.status = DriverStatus::Online;
        store.update_driver(d.clone()).await.unwrap();
        drivers.push(d);
    }

    assert!(store.assign_driver(order.id, drivers[0].id).await.unwrap());
    // second claim loses
    assert!(!store.assign_driver(order.id, drivers[1].id).await.unwrap());

    let assigned = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(assigned.status, OrderStatus::Delivering);
    assert_eq!(assigned.driver_id, Some(drivers[0].id));
    let winner = store.get_driver(drivers[0].id).await.unwrap().unwrap();
    assert_eq!(winner.status, DriverStatus::Delivering);
    let loser = store.get_driver(drivers[1].id).await.unwrap().unwrap();
    assert_eq!(loser.status, DriverStatus::Online);
}

#[tokio::test]
#[serial]
async fn complete_delivery_frees_driver_and_counts() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let (mut order, _) = store
        .create_order(new_order(&restaurant), order_lines(&items))
        .await
        .unwrap();
    order.status = OrderStatus::Ready;
    store.update_order(order.clone()).await.unwrap();

    let mut driver = store
        .create_driver(NewDriver {
            account_id: UserId::new(300),
            name: "Budi".into(),
            phone: None,
            vehicle: None,
            current_location: None,
        })
        .await
        .unwrap();
    driver.status = DriverStatus::Online;
    store.update_driver(driver.clone()).await.unwrap();

    assert!(store.assign_driver(order.id, driver.id).await.unwrap());
    assert!(store.complete_delivery(order.id, driver.id).await.unwrap());

    let done = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(done.status, OrderStatus::Completed);
    let driver = store.get_driver(driver.id).await.unwrap().unwrap();
    assert_eq!(driver.status, DriverStatus::Online);
    assert_eq!(driver.total_deliveries, 1);

    // completing twice is a no-op failure, not a double count
    assert!(!store.complete_delivery(order.id, driver.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn duplicate_driver_account_rejected() {
    let store = get_test_store().await;

    let payload = NewDriver {
        account_id: UserId::new(300),
        name: "Budi".into(),
        phone: None,
        vehicle: None,
        current_location: None,
    };
    store.create_driver(payload.clone()).await.unwrap();
    let err = store.create_driver(payload).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateDriver(id) if id == UserId::new(300)));
}

#[tokio::test]
#[serial]
async fn list_orders_filters_and_sorts() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let mut ids = Vec::new();
    for total in [30000i64, 10000, 20000] {
        let mut payload = new_order(&restaurant);
        payload.total = Money::from_minor(total);
        let (order, _) = store
            .create_order(payload, order_lines(&items))
            .await
            .unwrap();
        ids.push(order.id);
    }
    let mut second = store.get_order(ids[1]).await.unwrap().unwrap();
    second.status = OrderStatus::Completed;
    store.update_order(second).await.unwrap();

    let completed = store
        .list_orders(
            OrderFilter::new()
                .restaurant(restaurant.id)
                .status(OrderStatus::Completed),
        )
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, ids[1]);

    let by_total = store
        .list_orders(
            OrderFilter::new()
                .restaurant(restaurant.id)
                .sort(OrderSort::TotalDesc)
                .limit(2),
        )
        .await
        .unwrap();
    assert_eq!(by_total.len(), 2);
    assert_eq!(by_total[0].total, Money::from_minor(30000));
    assert_eq!(by_total[1].total, Money::from_minor(20000));

    let none = store
        .list_orders(OrderFilter::new().customer(UserId::new(999)))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
#[serial]
async fn save_order_with_items_replaces_line_set() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let (order, stored) = store
        .create_order(new_order(&restaurant), order_lines(&items))
        .await
        .unwrap();

    // keep the first line at a new quantity, drop the second, add a fresh one
    let mut kept = vec![stored[0].clone()];
    kept[0].quantity = 5;
    let added = vec![NewOrderItem {
        menu_item_id: items[1].id,
        quantity: 3,
        unit_price: items[1].price,
        special_instructions: None,
    }];

    let saved = store
        .save_order_with_items(order.clone(), kept, added)
        .await
        .unwrap();
    assert_eq!(saved.len(), 2);

    let reloaded = store.list_order_items(order.id).await.unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.iter().any(|i| i.id == stored[0].id && i.quantity == 5));
    assert!(!reloaded.iter().any(|i| i.id == stored[1].id));
}

#[tokio::test]
#[serial]
async fn available_orders_are_ready_unassigned_oldest_first() {
    let store = get_test_store().await;
    let (restaurant, items) = seed_restaurant(&store).await;

    let mut ready_ids = Vec::new();
    for n in 0..3 {
        let (mut order, _) = store
            .create_order(new_order(&restaurant), order_lines(&items))
            .await
            .unwrap();
        if n < 2 {
            order.status = OrderStatus::Ready;
            store.update_order(order.clone()).await.unwrap();
            ready_ids.push(order.id);
        }
    }

    let available = store.list_available_orders(10).await.unwrap();
    assert_eq!(available.len(), 2);
    assert!(available.iter().all(|o| o.status == OrderStatus::Ready));
    assert!(available.iter().all(|o| o.driver_id.is_none()));
}
