//! Order operations: direct creation, the status lifecycle, and item
//! mutation on pending orders.

use std::collections::BTreeMap;

use chrono::Utc;
use common::{MenuItemId, OrderId, OrderItemId, RestaurantId, Role};
use domain::access::{require_identity, require_owner, require_role};
use domain::{
    Error, Identity, MenuItem, NewOrder, NewOrderItem, Order, OrderItem, OrderStatus,
    PaymentMethod, Restaurant, Result, compute_totals, pricing::LineItem,
};
use serde::{Deserialize, Serialize};
use store::{OrderFilter, OrderSort, Store};

use crate::views::{OrderStats, OrderView};

/// One requested order line.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLineRequest {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub special_instructions: Option<String>,
}

/// Request to place an order directly, without a cart.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub restaurant_id: RestaurantId,
    pub delivery_address: String,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub items: Vec<OrderLineRequest>,
}

/// Restaurant-side order listing parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderListRequest {
    pub restaurant_id: RestaurantId,
    #[serde(default)]
    pub statuses: Vec<OrderStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub placed_after: Option<chrono::DateTime<Utc>>,
    pub placed_before: Option<chrono::DateTime<Utc>>,
    pub min_total: Option<common::Money>,
    pub max_total: Option<common::Money>,
    pub newest_first: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// One quantity change in a bulk update.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkQuantityUpdate {
    pub order_item_id: OrderItemId,
    pub quantity: u32,
}

/// A line a bulk add could not place, with the reason code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub menu_item_id: MenuItemId,
    pub reason: &'static str,
}

/// Order operations.
#[derive(Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Places an order directly from request lines, with the same
    /// validation and pricing as cart checkout.
    #[tracing::instrument(skip(self, caller, req))]
    pub async fn create_order(
        &self,
        caller: Option<Identity>,
        req: CreateOrderRequest,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Customer)?;
        let restaurant = self.load_restaurant(req.restaurant_id).await?;
        if req.items.is_empty() {
            return Err(Error::EmptyCart);
        }
        if req.delivery_address.trim().is_empty() {
            return Err(Error::MissingAddress);
        }

        let ids: Vec<MenuItemId> = req.items.iter().map(|l| l.menu_item_id).collect();
        let menu = self.load_menu(&ids).await?;
        let mut items = Vec::with_capacity(req.items.len());
        for line in &req.items {
            items.push(validate_order_line(
                &menu,
                req.restaurant_id,
                line.menu_item_id,
                line.quantity,
                line.special_instructions.clone(),
            )?);
        }

        let totals = compute_totals(
            items.iter().map(|i| LineItem::new(i.unit_price, i.quantity)),
            restaurant.delivery_fee,
        );
        let order = NewOrder {
            customer_id: who.user_id,
            restaurant_id: req.restaurant_id,
            delivery_address: req.delivery_address,
            payment_method: req.payment_method.unwrap_or_default(),
            note: req.note,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            service_fee: totals.service_fee,
            total: totals.total,
        };

        let (order, items) = self.store.create_order(order, items).await?;
        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total, "order placed");
        Ok(OrderView::new(order, items))
    }

    /// Loads one order; customers see only their own, restaurants only
    /// orders for a restaurant they own, drivers only orders assigned to
    /// them.
    pub async fn get_order(&self, caller: Option<Identity>, order_id: OrderId) -> Result<OrderView> {
        let who = require_identity(caller)?;
        let order = self.load_order(order_id).await?;
        self.authorize_read(&who, &order).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// The customer's orders, newest first.
    pub async fn my_orders(
        &self,
        caller: Option<Identity>,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Customer)?;
        let mut filter = OrderFilter::new().customer(who.user_id);
        filter.limit = limit;
        filter.offset = offset;
        self.views_for(filter).await
    }

    /// The customer's in-flight orders.
    pub async fn active_orders(&self, caller: Option<Identity>) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Customer)?;
        self.views_for(
            OrderFilter::new()
                .customer(who.user_id)
                .statuses(OrderStatus::ACTIVE),
        )
        .await
    }

    /// The customer's finished orders.
    pub async fn order_history(&self, caller: Option<Identity>) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Customer)?;
        self.views_for(
            OrderFilter::new()
                .customer(who.user_id)
                .statuses(OrderStatus::TERMINAL),
        )
        .await
    }

    /// Pending orders awaiting confirmation at a restaurant.
    pub async fn pending_orders(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Restaurant)?;
        let restaurant = self.load_restaurant(restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;
        self.views_for(
            OrderFilter::new()
                .restaurant(restaurant_id)
                .status(OrderStatus::Pending)
                .sort(OrderSort::CreatedAtAsc),
        )
        .await
    }

    /// Restaurant-side order listing with filters and paging.
    #[tracing::instrument(skip(self, caller, req))]
    pub async fn list_orders(
        &self,
        caller: Option<Identity>,
        req: OrderListRequest,
    ) -> Result<Vec<OrderView>> {
        let who = require_role(caller, Role::Restaurant)?;
        let restaurant = self.load_restaurant(req.restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;

        let mut filter = OrderFilter::new()
            .restaurant(req.restaurant_id)
            .statuses(req.statuses);
        filter.payment_method = req.payment_method;
        filter.placed_after = req.placed_after;
        filter.placed_before = req.placed_before;
        filter.min_total = req.min_total;
        filter.max_total = req.max_total;
        filter.sort = match req.newest_first {
            Some(false) => OrderSort::CreatedAtAsc,
            _ => OrderSort::CreatedAtDesc,
        };
        filter.limit = req.limit;
        filter.offset = req.offset;
        self.views_for(filter).await
    }

    /// Aggregate figures over a restaurant's orders.
    pub async fn order_stats(
        &self,
        caller: Option<Identity>,
        restaurant_id: RestaurantId,
    ) -> Result<OrderStats> {
        let who = require_role(caller, Role::Restaurant)?;
        let restaurant = self.load_restaurant(restaurant_id).await?;
        require_owner(&who, restaurant.owner_id, "restaurant")?;
        let orders = self
            .store
            .list_orders(OrderFilter::new().restaurant(restaurant_id))
            .await?;
        Ok(OrderStats::from_orders(&orders))
    }

    /// Restaurant accepts a pending order, optionally with a time estimate.
    #[tracing::instrument(skip(self, caller))]
    pub async fn confirm_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        estimated_time: Option<String>,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Restaurant)?;
        let mut order = self.load_order(order_id).await?;
        self.require_restaurant_owner(&who, &order).await?;

        order.confirm(estimated_time, Utc::now())?;
        self.store.update_order(order.clone()).await?;
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Generic status update, gated by role and the transition table.
    ///
    /// Restaurants walk `confirmed → preparing → ready`; drivers set
    /// `delivering` (equivalent to accepting) and `completed`. Everything
    /// else is rejected before any state changes.
    #[tracing::instrument(skip(self, caller))]
    pub async fn update_order_status(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        new_status: OrderStatus,
    ) -> Result<OrderView> {
        let who = require_identity(caller)?;
        let order = self.load_order(order_id).await?;

        let Some(required_role) = new_status.settable_by() else {
            return Err(Error::InvalidOrderStatus {
                status: order.status,
                action: new_status.as_str(),
            });
        };
        if who.role != required_role {
            return Err(Error::forbidden(format!(
                "only {required_role} accounts may set status {new_status}"
            )));
        }

        match required_role {
            Role::Restaurant => {
                self.require_restaurant_owner(&who, &order).await?;
                let mut order = order;
                order.transition_to(new_status, Utc::now())?;
                self.store.update_order(order.clone()).await?;
                let items = self.store.list_order_items(order_id).await?;
                Ok(OrderView::new(order, items))
            }
            Role::Driver => {
                let driver = self
                    .store
                    .find_driver_by_account(who.user_id)
                    .await?
                    .ok_or(Error::DriverNotFound)?;
                match new_status {
                    OrderStatus::Delivering => {
                        if !driver.is_active || !driver.status.can_accept_delivery() {
                            return Err(Error::DriverNotAvailable);
                        }
                        if !order.status.can_accept_for_delivery() {
                            return Err(Error::OrderNotReady(order.status));
                        }
                        if !self.store.assign_driver(order_id, driver.id).await? {
                            return Err(Error::OrderAlreadyAssigned(order_id));
                        }
                    }
                    OrderStatus::Completed => {
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
                    }
                    // settable_by limits driver targets to the two above
                    other => {
                        return Err(Error::InvalidOrderStatus {
                            status: order.status,
                            action: other.as_str(),
                        });
                    }
                }
                let order = self.load_order(order_id).await?;
                let items = self.store.list_order_items(order_id).await?;
                Ok(OrderView::new(order, items))
            }
            Role::Customer => Err(Error::forbidden(
                "customers cannot set order status directly".to_string(),
            )),
        }
    }

    /// Customer cancels a still-pending order.
    #[tracing::instrument(skip(self, caller, reason))]
    pub async fn cancel_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        reason: Option<String>,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Customer)?;
        let mut order = self.load_order(order_id).await?;
        require_owner(&who, order.customer_id, "order")?;

        order.cancel(
            reason.unwrap_or_else(|| "cancelled by customer".to_string()),
            Utc::now(),
        )?;
        self.store.update_order(order.clone()).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Restaurant rejects a pending order; a reason is required.
    #[tracing::instrument(skip(self, caller, reason))]
    pub async fn reject_order(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        reason: String,
    ) -> Result<OrderView> {
        let who = require_role(caller, Role::Restaurant)?;
        let mut order = self.load_order(order_id).await?;
        self.require_restaurant_owner(&who, &order).await?;

        order.cancel(reason, Utc::now())?;
        self.store.update_order(order.clone()).await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        let items = self.store.list_order_items(order_id).await?;
        Ok(OrderView::new(order, items))
    }

    /// Adds a line to a pending order.
    #[tracing::instrument(skip(self, caller, line))]
    pub async fn add_item(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        line: OrderLineRequest,
    ) -> Result<OrderView> {
        let menu = self.load_menu(&[line.menu_item_id]).await?;
        self.modify_items(caller, order_id, |order, kept| {
            let new = validate_order_line(
                &menu,
                order.restaurant_id,
                line.menu_item_id,
                line.quantity,
                line.special_instructions.clone(),
            )?;
            Ok((kept, vec![new]))
        })
        .await
    }

    /// Changes quantity or instructions on a pending order's line.
    #[tracing::instrument(skip(self, caller))]
    pub async fn update_item(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        order_item_id: OrderItemId,
        quantity: Option<u32>,
        special_instructions: Option<String>,
    ) -> Result<OrderView> {
        self.modify_items(caller, order_id, |_, mut kept| {
            let line = kept
                .iter_mut()
                .find(|i| i.id == order_item_id)
                .ok_or(Error::OrderItemNotFound(order_item_id))?;
            if let Some(q) = quantity {
                if q == 0 {
                    return Err(Error::InvalidQuantity(q));
                }
                line.quantity = q;
            }
            if special_instructions.is_some() {
                line.special_instructions = special_instructions;
            }
            line.updated_at = Utc::now();
            Ok((kept, Vec::new()))
        })
        .await
    }

    /// Removes a line from a pending order.
    #[tracing::instrument(skip(self, caller))]
    pub async fn remove_item(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        order_item_id: OrderItemId,
    ) -> Result<OrderView> {
        self.modify_items(caller, order_id, |_, kept| {
            let before = kept.len();
            let kept: Vec<OrderItem> =
                kept.into_iter().filter(|i| i.id != order_item_id).collect();
            if kept.len() == before {
                return Err(Error::OrderItemNotFound(order_item_id));
            }
            Ok((kept, Vec::new()))
        })
        .await
    }

    /// Adds several lines at once. Lines that cannot be placed (missing,
    /// unavailable, wrong restaurant, zero quantity) are skipped and
    /// reported rather than failing the whole request.
    #[tracing::instrument(skip(self, caller, lines))]
    pub async fn bulk_add_items(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        lines: Vec<OrderLineRequest>,
    ) -> Result<(OrderView, Vec<SkippedLine>)> {
        let ids: Vec<MenuItemId> = lines.iter().map(|l| l.menu_item_id).collect();
        let menu = self.load_menu(&ids).await?;

        let mut skipped = Vec::new();
        let view = self
            .modify_items(caller, order_id, |order, kept| {
                let mut added = Vec::new();
                for line in &lines {
                    match validate_order_line(
                        &menu,
                        order.restaurant_id,
                        line.menu_item_id,
                        line.quantity,
                        line.special_instructions.clone(),
                    ) {
                        Ok(item) => added.push(item),
                        Err(err) => skipped.push(SkippedLine {
                            menu_item_id: line.menu_item_id,
                            reason: err.code(),
                        }),
                    }
                }
                Ok((kept, added))
            })
            .await?;
        Ok((view, skipped))
    }

    /// Removes several lines at once; ids not on the order are ignored.
    #[tracing::instrument(skip(self, caller, ids))]
    pub async fn bulk_remove_items(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        ids: Vec<OrderItemId>,
    ) -> Result<OrderView> {
        self.modify_items(caller, order_id, |_, kept| {
            Ok((
                kept.into_iter().filter(|i| !ids.contains(&i.id)).collect(),
                Vec::new(),
            ))
        })
        .await
    }

    /// Applies several quantity changes at once; all must be valid.
    #[tracing::instrument(skip(self, caller, updates))]
    pub async fn bulk_update_quantities(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        updates: Vec<BulkQuantityUpdate>,
    ) -> Result<OrderView> {
        self.modify_items(caller, order_id, |_, mut kept| {
            for update in &updates {
                if update.quantity == 0 {
                    return Err(Error::InvalidQuantity(update.quantity));
                }
                let line = kept
                    .iter_mut()
                    .find(|i| i.id == update.order_item_id)
                    .ok_or(Error::OrderItemNotFound(update.order_item_id))?;
                line.quantity = update.quantity;
                line.updated_at = Utc::now();
            }
            Ok((kept, Vec::new()))
        })
        .await
    }

    /// Shared item-mutation path: ownership and modifiability checks, the
    /// caller's edit, then one atomic write of the new line set with
    /// recomputed totals.
    async fn modify_items<F>(
        &self,
        caller: Option<Identity>,
        order_id: OrderId,
        edit: F,
    ) -> Result<OrderView>
    where
        F: FnOnce(&Order, Vec<OrderItem>) -> Result<(Vec<OrderItem>, Vec<NewOrderItem>)>,
    {
        let who = require_role(caller, Role::Customer)?;
        let mut order = self.load_order(order_id).await?;
        require_owner(&who, order.customer_id, "order")?;
        order.ensure_modifiable()?;

        let current = self.store.list_order_items(order_id).await?;
        let (kept, added) = edit(&order, current)?;

        let totals = compute_totals(
            kept.iter()
                .map(|i| LineItem::new(i.unit_price, i.quantity))
                .chain(added.iter().map(|i| LineItem::new(i.unit_price, i.quantity))),
            order.delivery_fee,
        );
        order.subtotal = totals.subtotal;
        order.service_fee = totals.service_fee;
        order.total = totals.total;
        order.updated_at = Utc::now();

        let items = self
            .store
            .save_order_with_items(order.clone(), kept, added)
            .await?;
        Ok(OrderView::new(order, items))
    }

    async fn authorize_read(&self, who: &Identity, order: &Order) -> Result<()> {
        match who.role {
            Role::Customer => require_owner(who, order.customer_id, "order"),
            Role::Restaurant => self.require_restaurant_owner(who, order).await,
            Role::Driver => {
                let driver = self
                    .store
                    .find_driver_by_account(who.user_id)
                    .await?
                    .ok_or(Error::DriverNotFound)?;
                if order.driver_id != Some(driver.id) {
                    return Err(Error::forbidden(
                        "you can only view orders assigned to you".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    async fn require_restaurant_owner(&self, who: &Identity, order: &Order) -> Result<()> {
        let restaurant = self.load_restaurant(order.restaurant_id).await?;
        require_owner(who, restaurant.owner_id, "restaurant")
    }

    async fn load_order(&self, id: OrderId) -> Result<Order> {
        self.store
            .get_order(id)
            .await?
            .ok_or(Error::OrderNotFound(id))
    }

    async fn load_restaurant(&self, id: RestaurantId) -> Result<Restaurant> {
        self.store
            .get_restaurant(id)
            .await?
            .ok_or(Error::RestaurantNotFound(id))
    }

    async fn load_menu(&self, ids: &[MenuItemId]) -> Result<BTreeMap<MenuItemId, MenuItem>> {
        let items = self.store.get_menu_items(ids).await?;
        Ok(items.into_iter().map(|m| (m.id, m)).collect())
    }

    async fn views_for(&self, filter: OrderFilter) -> Result<Vec<OrderView>> {
        let orders = self.store.list_orders(filter).await?;
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.store.list_order_items(order.id).await?;
            views.push(OrderView::new(order, items));
        }
        Ok(views)
    }
}

/// Validates one requested line against the live menu and produces the
/// priced insert payload. Checks run missing → wrong restaurant →
/// unavailable → quantity, matching the checkout sequence.
pub(crate) fn validate_order_line(
    menu: &BTreeMap<MenuItemId, MenuItem>,
    restaurant_id: RestaurantId,
    menu_item_id: MenuItemId,
    quantity: u32,
    special_instructions: Option<String>,
) -> Result<NewOrderItem> {
    let menu_item = menu
        .get(&menu_item_id)
        .ok_or(Error::MenuItemNotFound(menu_item_id))?;
    if menu_item.restaurant_id != restaurant_id {
        return Err(Error::MenuItemMismatch {
            menu_item: menu_item_id,
            restaurant: restaurant_id,
        });
    }
    if !menu_item.is_available {
        return Err(Error::MenuItemUnavailable {
            name: menu_item.name.clone(),
        });
    }
    if quantity == 0 {
        return Err(Error::InvalidQuantity(quantity));
    }
    Ok(NewOrderItem {
        menu_item_id,
        quantity,
        unit_price: menu_item.price,
        special_instructions,
    })
}
