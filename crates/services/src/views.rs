//! Read models assembled on demand from loaded rows.
//!
//! Nothing here touches the store; services load the rows and hand them to
//! these pure constructors, so the same shapes serve both backends.

use std::collections::BTreeMap;

use common::{CartId, CartItemId, DriverId, MenuItemId, Money, RestaurantId, UserId};
use domain::{
    Cart, CartItem, DeliveryDriver, MenuItem, Order, OrderItem, OrderStatus, PaymentMethod,
    Totals, compute_totals, pricing::LineItem,
};
use serde::{Deserialize, Serialize};

/// A cart line joined with its live menu data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub menu_item_id: MenuItemId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
    pub is_available: bool,
    pub special_instructions: Option<String>,
}

/// A cart with its lines and a running totals preview.
///
/// The preview uses live menu prices; the binding snapshot is taken at
/// checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartView {
    pub id: CartId,
    pub customer_id: UserId,
    pub restaurant_id: RestaurantId,
    pub delivery_address: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub note: Option<String>,
    pub items: Vec<CartItemView>,
    pub totals: Totals,
}

impl CartView {
    /// Joins cart lines with their menu rows and prices the cart. Lines
    /// whose menu item has been deleted since they were added are shown
    /// with a placeholder name, priced at zero, and flagged unavailable.
    pub fn assemble(
        cart: Cart,
        items: Vec<CartItem>,
        menu: &BTreeMap<MenuItemId, MenuItem>,
        delivery_fee: Money,
    ) -> CartView {
        let items: Vec<CartItemView> = items
            .into_iter()
            .map(|line| match menu.get(&line.menu_item_id) {
                Some(menu_item) => CartItemView {
                    id: line.id,
                    menu_item_id: line.menu_item_id,
                    name: menu_item.name.clone(),
                    quantity: line.quantity,
                    unit_price: menu_item.price,
                    line_total: menu_item.price.multiply(line.quantity),
                    is_available: menu_item.is_available,
                    special_instructions: line.special_instructions,
                },
                None => CartItemView {
                    id: line.id,
                    menu_item_id: line.menu_item_id,
                    name: "(removed item)".into(),
                    quantity: line.quantity,
                    unit_price: Money::zero(),
                    line_total: Money::zero(),
                    is_available: false,
                    special_instructions: line.special_instructions,
                },
            })
            .collect();

        let totals = compute_totals(
            items.iter().map(|i| LineItem::new(i.unit_price, i.quantity)),
            delivery_fee,
        );

        CartView {
            id: cart.id,
            customer_id: cart.customer_id,
            restaurant_id: cart.restaurant_id,
            delivery_address: cart.delivery_address,
            payment_method: cart.payment_method,
            note: cart.note,
            items,
            totals,
        }
    }
}

/// An order with its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderView {
    pub fn new(order: Order, items: Vec<OrderItem>) -> Self {
        Self { order, items }
    }
}

/// Aggregate order figures for a restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub preparing: usize,
    pub ready: usize,
    pub delivering: usize,
    pub completed: usize,
    pub cancelled: usize,
    /// Sum of order totals over completed orders.
    pub revenue: Money,
    /// Revenue divided by completed order count; zero with no completions.
    pub average_order_value: Money,
}

impl OrderStats {
    pub fn from_orders(orders: &[Order]) -> OrderStats {
        let count_of = |status: OrderStatus| orders.iter().filter(|o| o.status == status).count();
        let completed_orders: Vec<&Order> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed)
            .collect();
        let revenue: Money = completed_orders.iter().map(|o| o.total).sum();
        let average_order_value = if completed_orders.is_empty() {
            Money::zero()
        } else {
            Money::from_minor(revenue.minor() / completed_orders.len() as i64)
        };

        OrderStats {
            total_orders: orders.len(),
            pending: count_of(OrderStatus::Pending),
            confirmed: count_of(OrderStatus::Confirmed),
            preparing: count_of(OrderStatus::Preparing),
            ready: count_of(OrderStatus::Ready),
            delivering: count_of(OrderStatus::Delivering),
            completed: count_of(OrderStatus::Completed),
            cancelled: count_of(OrderStatus::Cancelled),
            revenue,
            average_order_value,
        }
    }
}

/// Per-driver delivery figures. `total_deliveries` is the stored counter;
/// the rest is derived from the driver's completed orders on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStats {
    pub driver_id: DriverId,
    pub total_deliveries: u32,
    pub completed_orders: usize,
    /// Sum of delivery fees over completed orders.
    pub earnings: Money,
    pub rating: f64,
}

impl DriverStats {
    pub fn from_driver(driver: &DeliveryDriver, completed: &[Order]) -> DriverStats {
        DriverStats {
            driver_id: driver.id,
            total_deliveries: driver.total_deliveries,
            completed_orders: completed.len(),
            earnings: completed.iter().map(|o| o.delivery_fee).sum(),
            rating: driver.rating,
        }
    }
}
