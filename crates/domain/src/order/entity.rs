//! Order and order line-item entities.

use chrono::{DateTime, Utc};
use common::{DriverId, MenuItemId, Money, OrderId, OrderItemId, RestaurantId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::payment::PaymentMethod;
use crate::pricing::{self, LineItem};

use super::OrderStatus;

/// A placed order.
///
/// Totals are denormalized onto the order and must always satisfy
/// `total == subtotal + delivery_fee + service_fee`; every item mutation
/// recomputes them from the full current item set. `driver_id` is set at
/// most once, by the assignment path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub driver_id: Option<DriverId>,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    /// Free-text estimate supplied by the restaurant at confirmation.
    pub estimated_time: Option<String>,
    /// Set when the order is cancelled or rejected; never cleared.
    pub cancellation_reason: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Recomputes subtotal, service fee, and total from the full item set.
    /// The delivery fee was snapshotted at creation and never changes.
    pub fn recompute_totals(&mut self, items: &[OrderItem], now: DateTime<Utc>) {
        let totals = pricing::compute_totals(
            items.iter().map(|i| LineItem {
                unit_price: i.unit_price,
                quantity: i.quantity,
            }),
            self.delivery_fee,
        );
        self.subtotal = totals.subtotal;
        self.service_fee = totals.service_fee;
        self.total = totals.total;
        self.updated_at = now;
    }

    /// Confirms a pending order, optionally recording a time estimate.
    pub fn confirm(&mut self, estimated_time: Option<String>, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_confirm() {
            return Err(Error::InvalidOrderStatus {
                status: self.status,
                action: "confirmed",
            });
        }
        self.status = OrderStatus::Confirmed;
        if estimated_time.is_some() {
            self.estimated_time = estimated_time;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Cancels a pending order, recording why.
    pub fn cancel(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_cancel() {
            return Err(Error::InvalidOrderStatus {
                status: self.status,
                action: "cancelled",
            });
        }
        self.status = OrderStatus::Cancelled;
        self.cancellation_reason = Some(reason.into());
        self.updated_at = now;
        Ok(())
    }

    /// Moves the order to `next` if the state machine allows it.
    pub fn transition_to(&mut self, next: OrderStatus, now: DateTime<Utc>) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidOrderStatus {
                status: self.status,
                action: next.as_str(),
            });
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Errors unless items can still be modified.
    pub fn ensure_modifiable(&self) -> Result<()> {
        if !self.status.can_modify_items() {
            return Err(Error::OrderNotModifiable(self.status));
        }
        Ok(())
    }

    /// Checks the totals invariant.
    pub fn totals_consistent(&self) -> bool {
        self.total == self.subtotal + self.delivery_fee + self.service_fee
    }
}

/// Payload for creating an order. Totals are computed by the creating
/// service, never accepted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_address: String,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub service_fee: Money,
    pub total: Money,
}

/// A line on an order, with the menu price snapshotted at creation time.
/// Later menu price changes never affect an existing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Money,
    pub special_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderItem {
    /// unit_price × quantity.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Payload for inserting an order line. The order id is supplied by the
/// store at insert time, so the same payload serves creation and later
/// item adds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub menu_item_id: MenuItemId,
    pub quantity: u32,
    pub unit_price: Money,
    pub special_instructions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus) -> Order {
        Order {
            id: OrderId::new(1),
            customer_id: UserId::new(1),
            restaurant_id: RestaurantId::new(1),
            driver_id: None,
            status,
            delivery_address: "Jl. Sudirman 5".into(),
            payment_method: PaymentMethod::Cash,
            note: None,
            estimated_time: None,
            cancellation_reason: None,
            subtotal: Money::zero(),
            delivery_fee: Money::from_minor(5000),
            service_fee: Money::zero(),
            total: Money::from_minor(5000),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(quantity: u32, unit_price: i64) -> OrderItem {
        OrderItem {
            id: OrderItemId::new(1),
            order_id: OrderId::new(1),
            menu_item_id: MenuItemId::new(1),
            quantity,
            unit_price: Money::from_minor(unit_price),
            special_instructions: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recompute_totals_holds_invariant() {
        let mut o = order(OrderStatus::Pending);
        o.recompute_totals(&[item(2, 20000), item(1, 15000)], Utc::now());
        assert_eq!(o.subtotal, Money::from_minor(55000));
        assert_eq!(o.service_fee, Money::from_minor(2750));
        assert_eq!(o.total, Money::from_minor(62750));
        assert!(o.totals_consistent());
    }

    #[test]
    fn test_recompute_totals_empty_items() {
        let mut o = order(OrderStatus::Pending);
        o.recompute_totals(&[], Utc::now());
        assert_eq!(o.subtotal, Money::zero());
        assert_eq!(o.service_fee, Money::zero());
        assert_eq!(o.total, Money::from_minor(5000));
        assert!(o.totals_consistent());
    }

    #[test]
    fn test_confirm_pending_order() {
        let mut o = order(OrderStatus::Pending);
        o.confirm(Some("30 minutes".into()), Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Confirmed);
        assert_eq!(o.estimated_time.as_deref(), Some("30 minutes"));
    }

    #[test]
    fn test_confirm_rejected_after_pending() {
        let mut o = order(OrderStatus::Preparing);
        let err = o.confirm(None, Utc::now()).unwrap_err();
        assert_eq!(err.code(), "INVALID_ORDER_STATUS");
        assert_eq!(o.status, OrderStatus::Preparing);
    }

    #[test]
    fn test_cancel_records_reason() {
        let mut o = order(OrderStatus::Pending);
        o.cancel("changed my mind", Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Cancelled);
        assert_eq!(o.cancellation_reason.as_deref(), Some("changed my mind"));
    }

    #[test]
    fn test_cancel_confirmed_order_rejected() {
        let mut o = order(OrderStatus::Confirmed);
        let err = o.cancel("too late", Utc::now()).unwrap_err();
        assert_eq!(err.code(), "INVALID_ORDER_STATUS");
        assert_eq!(o.cancellation_reason, None);
    }

    #[test]
    fn test_transition_rejects_skips() {
        let mut o = order(OrderStatus::Pending);
        assert!(o.transition_to(OrderStatus::Ready, Utc::now()).is_err());
        o.transition_to(OrderStatus::Confirmed, Utc::now()).unwrap();
        o.transition_to(OrderStatus::Preparing, Utc::now()).unwrap();
        o.transition_to(OrderStatus::Ready, Utc::now()).unwrap();
        assert_eq!(o.status, OrderStatus::Ready);
    }

    #[test]
    fn test_ensure_modifiable_only_pending() {
        assert!(order(OrderStatus::Pending).ensure_modifiable().is_ok());
        let err = order(OrderStatus::Confirmed).ensure_modifiable().unwrap_err();
        assert_eq!(err.code(), "ORDER_NOT_MODIFIABLE");
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(3, 20000).line_total(), Money::from_minor(60000));
    }
}
