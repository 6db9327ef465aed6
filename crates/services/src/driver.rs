//! Driver-side operations: profile management, availability, and the
//! delivery lifecycle from accepting a ready order to completing it.

use chrono::Utc;
use common::{DriverId, OrderId, Role};
use domain::access::{require_owner, require_role};
use domain::{DeliveryDriver, DriverStatus, Error, Identity, NewDriver, Order, Result};
use serde::Deserialize;
use store::{DriverFilter, OrderFilter, OrderSort, Store};

use crate::views::{DriverStats, OrderView};

/// Payload for registering as a driver. The profile is linked to the
/// calling account; one profile per account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewDriverProfile {
    pub name: String,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
    pub current_location: Option<String>,
}

/// Partial update to a driver profile. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub vehicle: Option<String>,
}

/// Driver operations.
#[derive(Clone)]
pub struct DriverService<S> {
    store: S,
}

impl<S: Store> DriverService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers the calling account as a driver. New profiles start
    /// offline with no deliveries.
    #[tracing::instrument(skip(self, caller, profile))]
    pub async fn create_profile(
        &self,
        caller: Option<Identity>,
        profile: NewDriverProfile,
    ) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self
            .store
            .create_driver(NewDriver {
                account_id: who.user_id,
                name: profile.name,
                phone: profile.phone,
                vehicle: profile.vehicle,
                current_location: profile.current_location,
            })
            .await?;
        tracing::info!(driver_id = %driver.id, "driver profile created");
        Ok(driver)
    }

    /// The calling driver's own profile.
    pub async fn my_profile(&self, caller: Option<Identity>) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        self.profile_of(&who).await
    }

    /// Updates name, phone, or vehicle on the caller's profile.
    #[tracing::instrument(skip(self, caller, patch))]
    pub async fn update_profile(
        &self,
        caller: Option<Identity>,
        patch: DriverProfilePatch,
    ) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        let mut driver = self.profile_of(&who).await?;
        if let Some(name) = patch.name {
            driver.name = name;
        }
        if patch.phone.is_some() {
            driver.phone = patch.phone;
        }
        if patch.vehicle.is_some() {
            driver.vehicle = patch.vehicle;
        }
        driver.updated_at = Utc::now();
        self.store.update_driver(driver.clone()).await?;
        Ok(driver)
    }

    /// Deletes the caller's profile. Rejected mid-delivery.
    #[tracing::instrument(skip(self, caller))]
    pub async fn delete_profile(&self, caller: Option<Identity>) -> Result<()> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        if driver.status == DriverStatus::Delivering {
            return Err(Error::DriverDelivering);
        }
        self.store.delete_driver(driver.id).await?;
        Ok(())
    }

    /// Marks the caller available for deliveries.
    #[tracing::instrument(skip(self, caller))]
    pub async fn go_online(&self, caller: Option<Identity>) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        let mut driver = self.profile_of(&who).await?;
        driver.go_online(Utc::now())?;
        self.store.update_driver(driver.clone()).await?;
        Ok(driver)
    }

    /// Marks the caller unavailable. Rejected mid-delivery.
    #[tracing::instrument(skip(self, caller))]
    pub async fn go_offline(&self, caller: Option<Identity>) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        let mut driver = self.profile_of(&who).await?;
        driver.go_offline(Utc::now())?;
        self.store.update_driver(driver.clone()).await?;
        Ok(driver)
    }

    /// Updates the caller's reported location.
    pub async fn update_location(
        &self,
        caller: Option<Identity>,
        location: String,
    ) -> Result<DeliveryDriver> {
        let who = require_role(caller, Role::Driver)?;
        let mut driver = self.profile_of(&who).await?;
        driver.current_location = Some(location);
        driver.updated_at = Utc::now();
        self.store.update_driver(driver.clone()).await?;
        Ok(driver)
    }

    /// Ready, unassigned orders a driver could accept, oldest first.
    pub async fn available_orders(
        &self,
        caller: Option<Identity>,
        limit: Option<usize>,
    ) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        if !driver.is_active {
            return Err(Error::DriverNotAvailable);
        }
        let orders = self
            .store
            .list_available_orders(limit.unwrap_or(50))
            .await?;
        self.with_items(orders).await
    }

    /// Accepts a ready order. The assignment is a conditional write;
    /// exactly one of several racing drivers wins, the rest get
    /// [`Error::OrderAlreadyAssigned`].
    #[tracing::instrument(skip(self, caller))]
    pub async fn accept_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        if !driver.is_active || !driver.status.can_accept_delivery() {
            return Err(Error::DriverNotAvailable);
        }
        let order = self.load_order(order_id).await?;
        if order.driver_id.is_some() {
            return Err(Error::OrderAlreadyAssigned(order_id));
        }
        if !order.status.can_accept_for_delivery() {
            return Err(Error::OrderNotReady(order.status));
        }

        if !self.store.assign_driver(order_id, driver.id).await? {
            metrics::counter!("assignment_conflicts_total").increment(1);
            return Err(Error::OrderAlreadyAssigned(order_id));
        }
        metrics::counter!("orders_assigned_total").increment(1);
        tracing::info!(order_id = %order_id, driver_id = %driver.id, "delivery accepted");

        let order = self.load_order(order_id).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Re-affirms that the caller is underway on their assigned delivery.
    /// The order is already `delivering` from the accept; this just bumps
    /// the activity stamp.
    #[tracing::instrument(skip(self, caller))]
    pub async fn start_delivery(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        let mut order = self.load_order(order_id).await?;
        if order.driver_id != Some(driver.id) {
            return Err(Error::forbidden(
                "you can only start your own deliveries".to_string(),
            ));
        }
        if order.status != domain::OrderStatus::Delivering {
            return Err(Error::InvalidOrderStatus {
                status: order.status,
                action: "delivering",
            });
        }
        order.updated_at = Utc::now();
        self.store.update_order(order.clone()).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Marks the caller's assigned delivery as completed. Frees the driver
    /// back to online and bumps the delivery counter in the same write.
    #[tracing::instrument(skip(self, caller))]
    pub async fn complete_delivery(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        let order = self.load_order(order_id).await?;
        if order.driver_id != Some(driver.id) {
            return Err(Error::forbidden(
                "you can only complete your own deliveries".to_string(),
            ));
        }
        if !self.store.complete_delivery(order_id, driver.id).await? {
            return Err(Error::InvalidOrderStatus {
                status: order.status,
                action: "completed",
            });
        }
        metrics::counter!("deliveries_completed_total").increment(1);
        tracing::info!(order_id = %order_id, driver_id = %driver.id, "delivery completed");

        let order = self.load_order(order_id).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// The caller's in-flight delivery, if any.
    pub async fn my_active_delivery(
        &self,
        caller: Option<Identity>,
    ) -> Result<Option<OrderView>> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        let mut orders = self
            .store
            .list_orders(
                OrderFilter::new()
                    .driver(driver.id)
                    .status(domain::OrderStatus::Delivering),
            )
            .await?;
        match orders.pop() {
            Some(order) => {
                let items = self.store.list_order_items(order.id).await?;
                Ok(Some(OrderView::new(order, items)))
            }
            None => Ok(None),
        }
    }

    /// The caller's completed deliveries, newest first.
    pub async fn my_delivery_history(
        &self,
        caller: Option<Identity>,
        limit: Option<usize>,
    ) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        let mut filter = OrderFilter::new()
            .driver(driver.id)
            .status(domain::OrderStatus::Completed)
            .sort(OrderSort::CreatedAtDesc);
        filter.limit = limit;
        let orders = self.store.list_orders(filter).await?;
        self.with_items(orders).await
    }

    /// Delivery figures for the calling driver.
    pub async fn my_stats(&self, caller: Option<Identity>) -> Result<DriverStats> {
        let who = require_role(caller, Role::Driver)?;
        let driver = self.profile_of(&who).await?;
        let completed = self
            .store
            .list_orders(
                OrderFilter::new()
                    .driver(driver.id)
                    .status(domain::OrderStatus::Completed),
            )
            .await?;
        Ok(DriverStats::from_driver(&driver, &completed))
    }

    /// Platform-side driver listing with filters.
    pub async fn list_drivers(
        &self,
        caller: Option<Identity>,
        filter: DriverFilter,
    ) -> Result<Vec<DeliveryDriver>> {
        require_role(caller, Role::Restaurant)?;
        Ok(self.store.list_drivers(filter).await?)
    }

    /// Loads one driver profile by id.
    pub async fn get_driver(
        &self,
        caller: Option<Identity>,
        driver_id: DriverId,
    ) -> Result<DeliveryDriver> {
        require_role(caller, Role::Restaurant)?;
        self.store
            .get_driver(driver_id)
            .await?
            .ok_or(Error::DriverNotFound)
    }

    /// Activates or deactivates a driver. Deactivated drivers keep their
    /// profile but cannot see or accept orders.
    #[tracing::instrument(skip(self, caller))]
    pub async fn toggle_driver_active(
        &self,
        caller: Option<Identity>,
        driver_id: DriverId,
        is_active: bool,
    ) -> Result<DeliveryDriver> {
        require_role(caller, Role::Restaurant)?;
        let mut driver = self
            .store
            .get_driver(driver_id)
            .await?
            .ok_or(Error::DriverNotFound)?;
        driver.is_active = is_active;
        driver.updated_at = Utc::now();
        self.store.update_driver(driver.clone()).await?;
        Ok(driver)
    }

    /// Dispatcher-style manual assignment. The driver must be online and
    /// active; the same first-wins conditional write applies.
    #[tracing::instrument(skip(self, caller))]
    pub async fn assign_driver_to_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        driver_id: DriverId,
    ) -> Result<OrderView> {
        require_role(caller, Role::Restaurant)?;
        let driver = self
            .store
            .get_driver(driver_id)
            .await?
            .ok_or(Error::DriverNotFound)?;
        if !driver.is_active || !driver.status.can_accept_delivery() {
            return Err(Error::DriverNotAvailable);
        }
        let order = self.load_order(order_id).await?;
        if !order.status.can_accept_for_delivery() {
            return Err(Error::OrderNotReady(order.status));
        }
        if !self.store.assign_driver(order_id, driver_id).await? {
            return Err(Error::OrderAlreadyAssigned(order_id));
        }
        metrics::counter!("orders_assigned_total").increment(1);

        let order = self.load_order(order_id).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Reverts an assignment: the order returns to the ready pool and the
    /// driver goes back online.
    #[tracing::instrument(skip(self, caller))]
    pub async fn remove_driver_from_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
    ) -> Result<OrderView> {
        require_role(caller, Role::Restaurant)?;
        let order = self.load_order(order_id).await?;
        let Some(driver_id) = order.driver_id else {
            return Err(Error::InvalidOrderStatus {
                status: order.status,
                action: "unassigned",
            });
        };
        if !self.store.unassign_driver(order_id, driver_id).await? {
            return Err(Error::InvalidOrderStatus {
                status: order.status,
                action: "unassigned",
            });
        }
        let order = self.load_order(order_id).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Forces a status on several drivers at once. Drivers mid-delivery
    /// are skipped rather than failing the batch.
    #[tracing::instrument(skip(self, caller, driver_ids))]
    pub async fn bulk_update_driver_status(
        &self,
        caller: Option<Identity>,
        driver_ids: Vec<DriverId>,
        status: DriverStatus,
    ) -> Result<Vec<DeliveryDriver>> {
        require_role(caller, Role::Restaurant)?;
        let mut updated = Vec::new();
        for driver_id in driver_ids {
            let Some(mut driver) = self.store.get_driver(driver_id).await? else {
                continue;
            };
            if driver.status == DriverStatus::Delivering {
                continue;
            }
            driver.status = status;
            driver.updated_at = Utc::now();
            self.store.update_driver(driver.clone()).await?;
            updated.push(driver);
        }
        Ok(updated)
    }

    async fn profile_of(&self, who: &Identity) -> Result<DeliveryDriver> {
        let driver = self
            .store
            .find_driver_by_account(who.user_id)
            .await?
            .ok_or(Error::DriverNotFound)?;
        require_owner(who, driver.account_id, "driver profile")?;
        Ok(driver)
    }

    async fn load_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or(Error::OrderNotFound(id))
    }

    async fn with_items(&self, orders: Vec<Order>) -> Result<Vec<OrderView>> {
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.store.list_order_items(order.id).await?;
            views.push(OrderView::new(order, items));
        }
        Ok(views)
    }
}
