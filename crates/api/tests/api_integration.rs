//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{CatalogStore, MemoryStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new();
    let state = Arc::new(api::AppState::new(store.clone()));
    let app = api::create_app(state, get_metrics_handle());
    (app, store)
}

/// Seeds one restaurant (owner account 200) with two dishes and returns
/// (restaurant_id, menu_item_ids).
async fn seed(store: &MemoryStore) -> (i64, Vec<i64>) {
    let restaurant = store
        .create_restaurant(domain::NewRestaurant {
            owner_id: common::UserId::new(200),
            name: "Warung Tekno".into(),
            address: None,
            cuisine: None,
            opening_hours: None,
            delivery_fee: common::Money::from_minor(5000),
        })
        .await
        .unwrap();
    let mut ids = Vec::new();
    for (name, price) in [("Nasi Goreng", 20000), ("Es Teh", 15000)] {
        let item = store
            .create_menu_item(domain::NewMenuItem {
                restaurant_id: restaurant.id,
                name: name.into(),
                description: None,
                price: common::Money::from_minor(price),
                category: None,
            })
            .await
            .unwrap();
        ids.push(item.id.get());
    }
    (restaurant.id.get(), ids)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_anonymous_request_is_unauthorized() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/carts", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let json = json_body(response).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn test_cart_checkout_flow() {
    let (app, store) = setup();
    let (restaurant_id, menu_ids) = seed(&store).await;

    // build a cart with a delivery address
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/carts",
            Some("Customer:100"),
            Some(serde_json::json!({
                "restaurant_id": restaurant_id,
                "delivery_address": "Jl. Sudirman 5",
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = json_body(response).await;
    let cart_id = cart["id"].as_i64().unwrap();

    for (menu_item_id, quantity) in [(menu_ids[0], 2), (menu_ids[1], 1)] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/carts/items",
                Some("Customer:100"),
                Some(serde_json::json!({
                    "restaurant_id": restaurant_id,
                    "menu_item_id": menu_item_id,
                    "quantity": quantity,
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/carts/{cart_id}/checkout"),
            Some("Customer:100"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], 55000);
    assert_eq!(order["service_fee"], 2750);
    assert_eq!(order["delivery_fee"], 5000);
    assert_eq!(order["total"], 62750);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    // the cart is consumed
    let response = app
        .oneshot(request("GET", "/carts", Some("Customer:100"), None))
        .await
        .unwrap();
    let carts = json_body(response).await;
    assert!(carts.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_empty_cart_is_bad_request() {
    let (app, store) = setup();
    let (restaurant_id, _) = seed(&store).await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/carts",
            Some("Customer:100"),
            Some(serde_json::json!({
                "restaurant_id": restaurant_id,
                "delivery_address": "Jl. Sudirman 5",
            })),
        ))
        .await
        .unwrap();
    let cart = json_body(response).await;
    let cart_id = cart["id"].as_i64().unwrap();

    let response = app
        .oneshot(request(
            "POST",
            &format!("/carts/{cart_id}/checkout"),
            Some("Customer:100"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["code"], "EMPTY_CART");
}

#[tokio::test]
async fn test_status_transitions_and_role_gating() {
    let (app, store) = setup();
    let (restaurant_id, menu_ids) = seed(&store).await;

    // place an order directly
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/orders",
            Some("Customer:100"),
            Some(serde_json::json!({
                "restaurant_id": restaurant_id,
                "delivery_address": "Jl. Sudirman 5",
                "items": [
                    {"menu_item_id": menu_ids[0], "quantity": 2},
                    {"menu_item_id": menu_ids[1], "quantity": 1},
                ],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let order = json_body(response).await;
    let order_id = order["id"].as_i64().unwrap();

    // customer cannot confirm
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/confirm"),
            Some("Customer:100"),
            Some(serde_json::json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // owner confirms and walks the kitchen statuses
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/confirm"),
            Some("Restaurant:200"),
            Some(serde_json::json!({"estimated_time": "30 min"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let confirmed = json_body(response).await;
    assert_eq!(confirmed["status"], "confirmed");

    for status in ["preparing", "ready"] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/orders/{order_id}/status"),
                Some("Restaurant:200"),
                Some(serde_json::json!({"status": status})),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // a restaurant cannot set driver-owned statuses
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/status"),
            Some("Restaurant:200"),
            Some(serde_json::json!({"status": "delivering"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // driver registers, goes online, accepts, completes
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/drivers",
            Some("Driver:300"),
            Some(serde_json::json!({"name": "Budi"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    app.clone()
        .oneshot(request("POST", "/drivers/me/online", Some("Driver:300"), None))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "GET",
            "/deliveries/available",
            Some("Driver:300"),
            None,
        ))
        .await
        .unwrap();
    let available = json_body(response).await;
    assert_eq!(available.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/deliveries/{order_id}/accept"),
            Some("Driver:300"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let accepted = json_body(response).await;
    assert_eq!(accepted["status"], "delivering");

    // a second accept conflicts
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/deliveries/{order_id}/accept"),
            Some("Driver:300"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(request(
            "POST",
            &format!("/deliveries/{order_id}/complete"),
            Some("Driver:300"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let done = json_body(response).await;
    assert_eq!(done["status"], "completed");
}

#[tokio::test]
async fn test_order_not_found() {
    let (app, _) = setup();

    let response = app
        .oneshot(request("GET", "/orders/999", Some("Customer:100"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["code"], "ORDER_NOT_FOUND");
}

#[tokio::test]
async fn test_catalog_crud_via_api() {
    let (app, _) = setup();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/restaurants",
            Some("Restaurant:200"),
            Some(serde_json::json!({
                "name": "Bakso Pak Min",
                "delivery_fee": 3000,
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let restaurant = json_body(response).await;
    let restaurant_id = restaurant["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/restaurants/{restaurant_id}/menu"),
            Some("Restaurant:200"),
            Some(serde_json::json!({"name": "Bakso", "price": 12000})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // another restaurant account cannot modify it
    let response = app
        .clone()
        .oneshot(request(
            "PATCH",
            &format!("/restaurants/{restaurant_id}"),
            Some("Restaurant:999"),
            Some(serde_json::json!({"name": "Hijacked"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/restaurants/{restaurant_id}/menu"),
            Some("Customer:100"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let menu = json_body(response).await;
    assert_eq!(menu.as_array().unwrap().len(), 1);
}
