pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repo;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use query::{DriverFilter, DriverSort, OrderFilter, OrderSort};
pub use repo::{CartStore, CatalogStore, DriverStore, OrderStore, Store, UserStore};
