pub mod carts;
pub mod catalog;
pub mod drivers;
pub mod health;
pub mod metrics;
pub mod orders;
