//! Order aggregate: entity, line items, and the status state machine.

mod entity;
mod status;

pub use entity::{NewOrder, NewOrderItem, Order, OrderItem};
pub use status::OrderStatus;
