//! HTTP API server with observability for the delivery platform.
//!
//! Exposes REST endpoints for carts, orders, drivers, and the restaurant
//! catalog, with structured logging (tracing) and Prometheus metrics. The
//! router is generic over the storage backend so tests can run against the
//! in-memory store.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use metrics_exporter_prometheus::PrometheusHandle;
use services::{CartService, CatalogService, DriverService, OrderService};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub carts: CartService<S>,
    pub orders: OrderService<S>,
    pub drivers: DriverService<S>,
    pub catalog: CatalogService<S>,
}

impl<S: Store> AppState<S> {
    pub fn new(store: S) -> Self {
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            drivers: DriverService::new(store.clone()),
            catalog: CatalogService::new(store),
        }
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // carts
        .route("/carts", post(routes::carts::get_or_create::<S>))
        .route("/carts", get(routes::carts::my_carts::<S>))
        .route("/carts/switch", post(routes::carts::switch_restaurant::<S>))
        .route("/carts/items", post(routes::carts::add_item::<S>))
        .route("/carts/{id}", get(routes::carts::get::<S>))
        .route("/carts/{id}", patch(routes::carts::update::<S>))
        .route("/carts/{id}/items", delete(routes::carts::clear::<S>))
        .route("/carts/{id}/checkout", post(routes::carts::checkout::<S>))
        .route("/cart-items/{id}", patch(routes::carts::update_item::<S>))
        .route("/cart-items/{id}", delete(routes::carts::remove_item::<S>))
        // orders
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/mine", get(routes::orders::mine::<S>))
        .route("/orders/active", get(routes::orders::active::<S>))
        .route("/orders/history", get(routes::orders::history::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/confirm", post(routes::orders::confirm::<S>))
        .route("/orders/{id}/status", post(routes::orders::set_status::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .route("/orders/{id}/reject", post(routes::orders::reject::<S>))
        .route("/orders/{id}/items", post(routes::orders::add_item::<S>))
        .route(
            "/orders/{id}/items/bulk-add",
            post(routes::orders::bulk_add_items::<S>),
        )
        .route(
            "/orders/{id}/items/bulk-remove",
            post(routes::orders::bulk_remove_items::<S>),
        )
        .route(
            "/orders/{id}/items/quantities",
            post(routes::orders::bulk_update_quantities::<S>),
        )
        .route(
            "/orders/{id}/items/{item_id}",
            patch(routes::orders::update_item::<S>),
        )
        .route(
            "/orders/{id}/items/{item_id}",
            delete(routes::orders::remove_item::<S>),
        )
        .route(
            "/orders/{id}/assign",
            post(routes::drivers::assign_to_order::<S>),
        )
        .route(
            "/orders/{id}/unassign",
            post(routes::drivers::unassign_from_order::<S>),
        )
        // restaurant-side order views
        .route(
            "/restaurants/{id}/orders/pending",
            get(routes::orders::pending_for_restaurant::<S>),
        )
        .route(
            "/restaurants/{id}/orders/stats",
            get(routes::orders::stats::<S>),
        )
        // catalog
        .route("/restaurants", post(routes::catalog::create_restaurant::<S>))
        .route("/restaurants", get(routes::catalog::list_restaurants::<S>))
        .route(
            "/restaurants/mine",
            get(routes::catalog::my_restaurants::<S>),
        )
        .route("/restaurants/{id}", get(routes::catalog::get_restaurant::<S>))
        .route(
            "/restaurants/{id}",
            patch(routes::catalog::update_restaurant::<S>),
        )
        .route(
            "/restaurants/{id}/menu",
            post(routes::catalog::create_menu_item::<S>),
        )
        .route(
            "/restaurants/{id}/menu",
            get(routes::catalog::list_menu::<S>),
        )
        .route("/menu-items/{id}", get(routes::catalog::get_menu_item::<S>))
        .route(
            "/menu-items/{id}",
            patch(routes::catalog::update_menu_item::<S>),
        )
        .route(
            "/menu-items/{id}",
            delete(routes::catalog::delete_menu_item::<S>),
        )
        // drivers and deliveries
        .route("/drivers", post(routes::drivers::create_profile::<S>))
        .route("/drivers", get(routes::drivers::list::<S>))
        .route("/drivers/me", get(routes::drivers::me::<S>))
        .route("/drivers/me", patch(routes::drivers::update_me::<S>))
        .route("/drivers/me", delete(routes::drivers::delete_me::<S>))
        .route("/drivers/me/online", post(routes::drivers::go_online::<S>))
        .route("/drivers/me/offline", post(routes::drivers::go_offline::<S>))
        .route(
            "/drivers/me/location",
            patch(routes::drivers::update_location::<S>),
        )
        .route("/drivers/me/stats", get(routes::drivers::my_stats::<S>))
        .route(
            "/drivers/status",
            post(routes::drivers::bulk_update_status::<S>),
        )
        .route("/drivers/{id}", get(routes::drivers::get::<S>))
        .route(
            "/drivers/{id}/active",
            post(routes::drivers::toggle_active::<S>),
        )
        .route(
            "/deliveries/available",
            get(routes::drivers::available_orders::<S>),
        )
        .route(
            "/deliveries/active",
            get(routes::drivers::active_delivery::<S>),
        )
        .route(
            "/deliveries/history",
            get(routes::drivers::delivery_history::<S>),
        )
        .route(
            "/deliveries/{id}/accept",
            post(routes::drivers::accept_order::<S>),
        )
        .route(
            "/deliveries/{id}/start",
            post(routes::drivers::start_delivery::<S>),
        )
        .route(
            "/deliveries/{id}/complete",
            post(routes::drivers::complete_delivery::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
