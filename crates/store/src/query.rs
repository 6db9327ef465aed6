//! Filter and sort parameters for list queries.

use chrono::{DateTime, Utc};
use common::{DriverId, Money, RestaurantId, UserId};
use domain::{DriverStatus, OrderStatus, PaymentMethod};

/// Sort order for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderSort {
    /// Newest first.
    #[default]
    CreatedAtDesc,
    /// Oldest first.
    CreatedAtAsc,
    /// Longest-waiting first (used by the available-orders feed).
    UpdatedAtAsc,
    TotalDesc,
    TotalAsc,
}

/// Query parameters for listing orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Match any of these statuses; empty means all.
    pub statuses: Vec<OrderStatus>,
    pub restaurant_id: Option<RestaurantId>,
    pub customer_id: Option<UserId>,
    pub driver_id: Option<DriverId>,
    /// Only orders with no driver assigned.
    pub unassigned: bool,
    pub payment_method: Option<PaymentMethod>,
    pub placed_after: Option<DateTime<Utc>>,
    pub placed_before: Option<DateTime<Utc>>,
    pub min_total: Option<Money>,
    pub max_total: Option<Money>,
    pub sort: OrderSort,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn statuses(mut self, statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        self.statuses.extend(statuses);
        self
    }

    pub fn restaurant(mut self, id: RestaurantId) -> Self {
        self.restaurant_id = Some(id);
        self
    }

    pub fn customer(mut self, id: UserId) -> Self {
        self.customer_id = Some(id);
        self
    }

    pub fn driver(mut self, id: DriverId) -> Self {
        self.driver_id = Some(id);
        self
    }

    pub fn unassigned(mut self) -> Self {
        self.unassigned = true;
        self
    }

    pub fn sort(mut self, sort: OrderSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Sort order for driver listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DriverSort {
    #[default]
    CreatedAtAsc,
    RatingDesc,
    TotalDeliveriesDesc,
}

/// Query parameters for listing drivers.
#[derive(Debug, Clone, Default)]
pub struct DriverFilter {
    pub status: Option<DriverStatus>,
    pub is_active: Option<bool>,
    pub min_rating: Option<f64>,
    pub sort: DriverSort,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl DriverFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: DriverStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    pub fn min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    pub fn sort(mut self, sort: DriverSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}
