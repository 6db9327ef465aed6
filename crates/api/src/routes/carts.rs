//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{CartId, CartItemId, RestaurantId};
use serde::Deserialize;
use services::{AddCartItem, CartView, DeliveryInfo, OrderView};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateCartRequest {
    pub restaurant_id: i64,
    #[serde(flatten)]
    pub delivery: DeliveryInfo,
}

#[derive(Deserialize)]
pub struct SwitchRestaurantRequest {
    pub restaurant_id: i64,
}

#[derive(Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: u32,
    pub special_instructions: Option<String>,
}

/// POST /carts — get or create the caller's cart for a restaurant.
pub async fn get_or_create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateCartRequest>,
) -> Result<Json<CartView>, ApiError> {
    let view = state
        .carts
        .get_or_create_cart(caller, RestaurantId::new(req.restaurant_id), req.delivery)
        .await?;
    Ok(Json(view))
}

/// GET /carts — all of the caller's carts.
pub async fn my_carts<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<CartView>>, ApiError> {
    Ok(Json(state.carts.my_carts(caller).await?))
}

/// GET /carts/:id — one cart, ownership-checked.
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.get_cart(caller, CartId::new(id)).await?))
}

/// PATCH /carts/:id — update delivery details.
pub async fn update<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(info): Json<DeliveryInfo>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(
        state.carts.update_cart(caller, CartId::new(id), info).await?,
    ))
}

/// POST /carts/items — add a menu item to the caller's cart.
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<AddCartItem>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.carts.add_item(caller, req).await?))
}

/// PATCH /cart-items/:id — change quantity or instructions on a line.
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(
        state
            .carts
            .update_item(
                caller,
                CartItemId::new(id),
                req.quantity,
                req.special_instructions,
            )
            .await?,
    ))
}

/// DELETE /cart-items/:id — remove a line.
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(
        state.carts.remove_item(caller, CartItemId::new(id)).await?,
    ))
}

/// DELETE /carts/:id/items — destroy the cart and everything in it.
pub async fn clear<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.carts.clear(caller, CartId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /carts/switch — drop all carts and start one at another restaurant.
pub async fn switch_restaurant<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<SwitchRestaurantRequest>,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(
        state
            .carts
            .switch_restaurant(caller, RestaurantId::new(req.restaurant_id))
            .await?,
    ))
}

/// POST /carts/:id/checkout — convert the cart into a pending order.
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let view = state.carts.checkout(caller, CartId::new(id)).await?;
    Ok((StatusCode::CREATED, Json(view)))
}
