//! Domain layer for the delivery platform.
//!
//! This crate provides the core business rules:
//! - entities for users, restaurants, menus, carts, orders, and drivers
//! - the order status state machine
//! - the pricing engine (pure fee computation)
//! - role-based access-control predicates
//! - the platform error taxonomy with stable machine-readable codes

pub mod access;
pub mod cart;
pub mod driver;
pub mod error;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod restaurant;
pub mod user;

pub use access::Identity;
pub use cart::{Cart, CartItem, NewCart, NewCartItem};
pub use driver::{DeliveryDriver, DriverStatus, NewDriver};
pub use error::{Error, ErrorKind, Result};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderStatus};
pub use payment::PaymentMethod;
pub use pricing::{LineItem, SERVICE_FEE_PERCENT, Totals, compute_totals};
pub use restaurant::{MenuItem, NewMenuItem, NewRestaurant, Restaurant};
pub use user::{NewUser, User};
