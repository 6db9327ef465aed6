//! Platform error taxonomy.
//!
//! Every failure surfaces as one of these variants with a stable
//! machine-readable code (the `code()` string), so the API layer can map
//! errors without string matching.

use common::{CartId, CartItemId, IdParseError, MenuItemId, OrderId, OrderItemId, RestaurantId,
             UserId};
use thiserror::Error;

use crate::order::OrderStatus;

/// Broad classification used for HTTP status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No caller identity.
    Unauthenticated,
    /// Role or ownership violation.
    Forbidden,
    /// A referenced entity does not exist.
    NotFound,
    /// Operation not legal for the entity's current state.
    InvalidState,
    /// Bad input.
    Validation,
    /// Duplicate or race-lost write.
    Conflict,
    /// Backend failure.
    Internal,
}

/// Errors that can occur during platform operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("you must be logged in")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("cart {0} not found")]
    CartNotFound(CartId),

    #[error("cart item {0} not found")]
    CartItemNotFound(CartItemId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order item {0} not found")]
    OrderItemNotFound(OrderItemId),

    #[error("driver profile not found")]
    DriverNotFound,

    #[error("restaurant {0} not found")]
    RestaurantNotFound(RestaurantId),

    #[error("menu item {0} not found")]
    MenuItemNotFound(MenuItemId),

    #[error("user {0} not found")]
    UserNotFound(UserId),

    #[error("order cannot be {action} in status {status}")]
    InvalidOrderStatus {
        status: OrderStatus,
        action: &'static str,
    },

    #[error("order is not ready for pickup (status {0})")]
    OrderNotReady(OrderStatus),

    #[error("order {0} already assigned to another driver")]
    OrderAlreadyAssigned(OrderId),

    #[error("only pending orders can be modified (status {0})")]
    OrderNotModifiable(OrderStatus),

    #[error("driver profile not found or not online")]
    DriverNotAvailable,

    #[error("driver cannot go offline while delivering")]
    DriverDelivering,

    #[error("invalid quantity: {0} (must be greater than 0)")]
    InvalidQuantity(u32),

    #[error("delivery address is required")]
    MissingAddress,

    #[error("cannot checkout empty cart")]
    EmptyCart,

    #[error("menu item {menu_item} does not belong to restaurant {restaurant}")]
    MenuItemMismatch {
        menu_item: MenuItemId,
        restaurant: RestaurantId,
    },

    #[error("menu item {name} is not available")]
    MenuItemUnavailable { name: String },

    #[error(transparent)]
    InvalidId(#[from] IdParseError),

    #[error("driver profile already exists for account {0}")]
    DriverProfileExists(UserId),

    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// Returns the stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "UNAUTHENTICATED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::CartNotFound(_) => "CART_NOT_FOUND",
            Error::CartItemNotFound(_) => "CART_ITEM_NOT_FOUND",
            Error::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Error::OrderItemNotFound(_) => "ORDER_ITEM_NOT_FOUND",
            Error::DriverNotFound => "DRIVER_NOT_FOUND",
            Error::RestaurantNotFound(_) => "RESTAURANT_NOT_FOUND",
            Error::MenuItemNotFound(_) => "MENU_ITEM_NOT_FOUND",
            Error::UserNotFound(_) => "USER_NOT_FOUND",
            Error::InvalidOrderStatus { .. } => "INVALID_ORDER_STATUS",
            Error::OrderNotReady(_) => "ORDER_NOT_READY",
            Error::OrderAlreadyAssigned(_) => "ORDER_ALREADY_ASSIGNED",
            Error::OrderNotModifiable(_) => "ORDER_NOT_MODIFIABLE",
            Error::DriverNotAvailable => "DRIVER_NOT_AVAILABLE",
            Error::DriverDelivering => "DRIVER_DELIVERING",
            Error::InvalidQuantity(_) => "INVALID_QUANTITY",
            Error::MissingAddress => "MISSING_ADDRESS",
            Error::EmptyCart => "EMPTY_CART",
            Error::MenuItemMismatch { .. } => "MENU_ITEM_MISMATCH",
            Error::MenuItemUnavailable { .. } => "MENU_ITEM_UNAVAILABLE",
            Error::InvalidId(_) => "INVALID_ID",
            Error::DriverProfileExists(_) => "DRIVER_PROFILE_EXISTS",
            Error::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unauthenticated => ErrorKind::Unauthenticated,
            Error::Forbidden(_) => ErrorKind::Forbidden,
            Error::CartNotFound(_)
            | Error::CartItemNotFound(_)
            | Error::OrderNotFound(_)
            | Error::OrderItemNotFound(_)
            | Error::DriverNotFound
            | Error::RestaurantNotFound(_)
            | Error::MenuItemNotFound(_)
            | Error::UserNotFound(_) => ErrorKind::NotFound,
            Error::InvalidOrderStatus { .. }
            | Error::OrderNotReady(_)
            | Error::OrderAlreadyAssigned(_)
            | Error::OrderNotModifiable(_)
            | Error::DriverNotAvailable
            | Error::DriverDelivering => ErrorKind::InvalidState,
            Error::InvalidQuantity(_)
            | Error::MissingAddress
            | Error::EmptyCart
            | Error::MenuItemMismatch { .. }
            | Error::MenuItemUnavailable { .. }
            | Error::InvalidId(_) => ErrorKind::Validation,
            Error::DriverProfileExists(_) => ErrorKind::Conflict,
            Error::Store(_) => ErrorKind::Internal,
        }
    }

    /// Shorthand for a [`Error::Forbidden`] with a message.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Error::Forbidden(msg.into())
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, Error>;
