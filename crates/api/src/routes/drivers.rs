//! Driver profile and delivery endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::{DriverId, OrderId};
use domain::{DeliveryDriver, DriverStatus};
use serde::Deserialize;
use services::{DriverProfilePatch, DriverStats, NewDriverProfile, OrderView};
use store::{DriverFilter, Store};

use crate::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct LocationRequest {
    pub location: String,
}

#[derive(Deserialize)]
pub struct DriverListQuery {
    pub status: Option<DriverStatus>,
    pub is_active: Option<bool>,
    pub min_rating: Option<f64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Deserialize)]
pub struct ToggleActiveRequest {
    pub is_active: bool,
}

#[derive(Deserialize)]
pub struct AssignRequest {
    pub driver_id: i64,
}

#[derive(Deserialize)]
pub struct BulkStatusRequest {
    pub driver_ids: Vec<i64>,
    pub status: DriverStatus,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
}

/// POST /drivers — register the calling account as a driver.
pub async fn create_profile<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<NewDriverProfile>,
) -> Result<(StatusCode, Json<DeliveryDriver>), ApiError> {
    let driver = state.drivers.create_profile(caller, req).await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

/// GET /drivers/me — the caller's profile.
pub async fn me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(state.drivers.my_profile(caller).await?))
}

/// PATCH /drivers/me — update the caller's profile.
pub async fn update_me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(patch): Json<DriverProfilePatch>,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(state.drivers.update_profile(caller, patch).await?))
}

/// DELETE /drivers/me — delete the caller's profile.
pub async fn delete_me<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<StatusCode, ApiError> {
    state.drivers.delete_profile(caller).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /drivers/me/online — start accepting deliveries.
pub async fn go_online<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(state.drivers.go_online(caller).await?))
}

/// POST /drivers/me/offline — stop accepting deliveries.
pub async fn go_offline<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(state.drivers.go_offline(caller).await?))
}

/// PATCH /drivers/me/location — update the reported location.
pub async fn update_location<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<LocationRequest>,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(
        state.drivers.update_location(caller, req.location).await?,
    ))
}

/// GET /drivers/me/stats — the caller's delivery figures.
pub async fn my_stats<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<DriverStats>, ApiError> {
    Ok(Json(state.drivers.my_stats(caller).await?))
}

/// GET /deliveries/available — ready, unassigned orders.
pub async fn available_orders<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(
        state.drivers.available_orders(caller, page.limit).await?,
    ))
}

/// POST /deliveries/:id/accept — claim a ready order.
pub async fn accept_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state.drivers.accept_order(caller, OrderId::new(id)).await?,
    ))
}

/// POST /deliveries/:id/start — re-affirm an in-progress delivery.
pub async fn start_delivery<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .drivers
            .start_delivery(caller, OrderId::new(id))
            .await?,
    ))
}

/// POST /deliveries/:id/complete — finish the caller's delivery.
pub async fn complete_delivery<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .drivers
            .complete_delivery(caller, OrderId::new(id))
            .await?,
    ))
}

/// GET /deliveries/active — the caller's in-flight delivery.
pub async fn active_delivery<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Option<OrderView>>, ApiError> {
    Ok(Json(state.drivers.my_active_delivery(caller).await?))
}

/// GET /deliveries/history — the caller's completed deliveries.
pub async fn delivery_history<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    Ok(Json(
        state
            .drivers
            .my_delivery_history(caller, page.limit)
            .await?,
    ))
}

/// GET /drivers — platform-side driver listing.
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Query(q): Query<DriverListQuery>,
) -> Result<Json<Vec<DeliveryDriver>>, ApiError> {
    let filter = DriverFilter {
        status: q.status,
        is_active: q.is_active,
        min_rating: q.min_rating,
        limit: q.limit,
        offset: q.offset,
        ..Default::default()
    };
    Ok(Json(state.drivers.list_drivers(caller, filter).await?))
}

/// GET /drivers/:id — one driver profile.
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(
        state.drivers.get_driver(caller, DriverId::new(id)).await?,
    ))
}

/// POST /drivers/:id/active — activate or deactivate a driver.
pub async fn toggle_active<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<ToggleActiveRequest>,
) -> Result<Json<DeliveryDriver>, ApiError> {
    Ok(Json(
        state
            .drivers
            .toggle_driver_active(caller, DriverId::new(id), req.is_active)
            .await?,
    ))
}

/// POST /orders/:id/assign — dispatcher-style manual assignment.
pub async fn assign_to_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
    Json(req): Json<AssignRequest>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .drivers
            .assign_driver_to_order(caller, OrderId::new(id), DriverId::new(req.driver_id))
            .await?,
    ))
}

/// POST /orders/:id/unassign — revert an in-flight assignment.
pub async fn unassign_from_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<OrderView>, ApiError> {
    Ok(Json(
        state
            .drivers
            .remove_driver_from_order(caller, OrderId::new(id))
            .await?,
    ))
}

/// POST /drivers/status — force a status on several drivers.
pub async fn bulk_update_status<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    AuthUser(caller): AuthUser,
    Json(req): Json<BulkStatusRequest>,
) -> Result<Json<Vec<DeliveryDriver>>, ApiError> {
    let ids = req.driver_ids.into_iter().map(DriverId::new).collect();
    Ok(Json(
        state
            .drivers
            .bulk_update_driver_status(caller, ids, req.status)
            .await?,
    ))
}
