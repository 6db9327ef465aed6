//! Restaurant and menu endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{MenuItemId, RestaurantId};
use domain::{MenuItem, Restaurant};
use services::{MenuItemPatch, NewMenuItemRequest, NewRestaurantRequest, RestaurantPatch};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// POST /restaurants — open a restaurant owned by the caller.
pub async fn create_restaurant<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<NewRestaurantRequest>,
) -> Result<(StatusCode, Json<Restaurant>), ApiError> {
    let restaurant = state.catalog.create_restaurant(caller, req).await?;
    Ok((StatusCode::CREATED, Json(restaurant)))
}

/// GET /restaurants — all restaurants.
pub async fn list_restaurants<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    Ok(Json(state.catalog.list_restaurants(caller).await?))
}

/// GET /restaurants/mine — restaurants owned by the caller.
pub async fn my_restaurants<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<Restaurant>>, ApiError> {
    Ok(Json(state.catalog.my_restaurants(caller).await?))
}

/// GET /restaurants/:id — one restaurant.
pub async fn get_restaurant<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Restaurant>, ApiError> {
    Ok(Json(
        state
            .catalog
            .get_restaurant(caller, RestaurantId::new(id))
            .await?,
    ))
}

/// PATCH /restaurants/:id — owner-gated partial update.
pub async fn update_restaurant<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<RestaurantPatch>,
) -> Result<Json<Restaurant>, ApiError> {
    Ok(Json(
        state
            .catalog
            .update_restaurant(caller, RestaurantId::new(id), patch)
            .await?,
    ))
}

/// POST /restaurants/:id/menu — add a dish.
pub async fn create_menu_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<NewMenuItemRequest>,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let item = state
        .catalog
        .create_menu_item(caller, RestaurantId::new(id), req)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// GET /restaurants/:id/menu — the full menu.
pub async fn list_menu<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<MenuItem>>, ApiError> {
    Ok(Json(
        state.catalog.list_menu(caller, RestaurantId::new(id)).await?,
    ))
}

/// GET /menu-items/:id — one dish.
pub async fn get_menu_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<MenuItem>, ApiError> {
    Ok(Json(
        state
            .catalog
            .get_menu_item(caller, MenuItemId::new(id))
            .await?,
    ))
}

/// PATCH /menu-items/:id — owner-gated partial update.
pub async fn update_menu_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(patch): Json<MenuItemPatch>,
) -> Result<Json<MenuItem>, ApiError> {
    Ok(Json(
        state
            .catalog
            .update_menu_item(caller, MenuItemId::new(id), patch)
            .await?,
    ))
}

/// DELETE /menu-items/:id — remove a dish.
pub async fn delete_menu_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state
        .catalog
        .delete_menu_item(caller, MenuItemId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
