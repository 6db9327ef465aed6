//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{OrderId, OrderItemId, RestaurantId};
use domain::OrderStatus;
use serde::{Deserialize, Serialize};
use services::{
    BulkQuantityUpdate, CreateOrderRequest, OrderLineRequest, OrderListRequest, OrderStats,
    OrderView, SkippedLine,
};
use store::Store;

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ConfirmRequest {
    pub estimated_time: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub reason: String,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<u32>,
    pub special_instructions: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkAddRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Deserialize)]
pub struct BulkRemoveRequest {
    pub order_item_ids: Vec<i64>,
}

#[derive(Deserialize)]
pub struct BulkQuantitiesRequest {
    pub updates: Vec<BulkQuantityUpdate>,
}

#[derive(Serialize)]
pub struct BulkAddResponse {
    #[serde(flatten)]
    pub order: OrderView,
    pub skipped: Vec<SkippedLine>,
}

/// POST /orders — place an order directly, without a cart.
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let view = state.orders.create_order(caller, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /orders — restaurant-side listing with filters.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(req): Query<OrderListRequest>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.list_orders(caller, req).await?))
}

/// GET /orders/mine — the customer's orders.
pub async fn mine<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(
        state.orders.my_orders(caller, page.limit, page.offset).await?,
    ))
}

/// GET /orders/active — the customer's in-flight orders.
pub async fn active<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.active_orders(caller).await?))
}

/// GET /orders/history — the customer's finished orders.
pub async fn history<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(state.orders.order_history(caller).await?))
}

/// GET /orders/:id — one order, visibility depends on the caller's role.
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(state.orders.get_order(caller, OrderId::new(id)).await?))
}

/// GET /restaurants/:id/orders/pending — orders awaiting confirmation.
pub async fn pending_for_restaurant<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(
        state
            .orders
            .pending_orders(caller, RestaurantId::new(id))
            .await?,
    ))
}

/// GET /restaurants/:id/orders/stats — aggregate order figures.
pub async fn stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderStats>, ApiError> {
    Ok(Json(
        state
            .orders
            .order_stats(caller, RestaurantId::new(id))
            .await?,
    ))
}

/// POST /orders/:id/confirm — restaurant accepts a pending order.
pub async fn confirm<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<ConfirmRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .confirm_order(caller, OrderId::new(id), req.estimated_time)
            .await?,
    ))
}

/// POST /orders/:id/status — role-gated status transition.
pub async fn set_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .update_order_status(caller, OrderId::new(id), req.status)
            .await?,
    ))
}

/// POST /orders/:id/cancel — customer cancels a pending order.
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .cancel_order(caller, OrderId::new(id), req.reason)
            .await?,
    ))
}

/// POST /orders/:id/reject — restaurant rejects with a reason.
pub async fn reject<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<RejectRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .reject_order(caller, OrderId::new(id), req.reason)
            .await?,
    ))
}

/// POST /orders/:id/items — add a line to a pending order.
pub async fn add_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(line): Json<OrderLineRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state.orders.add_item(caller, OrderId::new(id), line).await?,
    ))
}

/// PATCH /orders/:id/items/:item_id — change a line.
pub async fn update_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .update_item(
                caller,
                OrderId::new(id),
                OrderItemId::new(item_id),
                req.quantity,
                req.special_instructions,
            )
            .await?,
    ))
}

/// DELETE /orders/:id/items/:item_id — remove a line.
pub async fn remove_item<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path((id, item_id)): Path<(i64, i64)>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .remove_item(caller, OrderId::new(id), OrderItemId::new(item_id))
            .await?,
    ))
}

/// POST /orders/:id/items/bulk-add — add several lines, skipping bad ones.
pub async fn bulk_add_items<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<BulkAddRequest>,
) -> Result<Json<BulkAddResponse>, ApiError> {
    let (order, skipped) = state
        .orders
        .bulk_add_items(caller, OrderId::new(id), req.items)
        .await?;
    Ok(Json(BulkAddResponse { order, skipped }))
}

/// POST /orders/:id/items/bulk-remove — remove several lines.
pub async fn bulk_remove_items<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<BulkRemoveRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let ids = req
        .order_item_ids
        .into_iter()
        .map(OrderItemId::new)
        .collect();
    Ok(Json(
        state
            .orders
            .bulk_remove_items(caller, OrderId::new(id), ids)
            .await?,
    ))
}

/// POST /orders/:id/items/quantities — apply several quantity changes.
pub async fn bulk_update_quantities<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<BulkQuantitiesRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .orders
            .bulk_update_quantities(caller, OrderId::new(id), req.updates)
            .await?,
    ))
}
