//! Operation handlers for the delivery platform.
//!
//! Each service is generic over the storage backend and enforces the
//! access-control and state-machine rules before touching any state. Read
//! models (views, stats) are computed on demand from loaded rows.

pub mod cart;
pub mod catalog;
pub mod driver;
pub mod order;
pub mod views;

pub use cart::{AddCartItem, CartService, DeliveryInfo};
pub use catalog::{
    CatalogService, MenuItemPatch, NewMenuItemRequest, NewRestaurantRequest, RestaurantPatch,
};
pub use driver::{DriverProfilePatch, DriverService, NewDriverProfile};
pub use order::{
    BulkQuantityUpdate, CreateOrderRequest, OrderLineRequest, OrderListRequest, OrderService,
    SkippedLine,
};
pub use views::{CartItemView, CartView, DriverStats, OrderStats, OrderView};
