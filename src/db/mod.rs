pub mod diesel_pool;
pub mod memory;
pub mod postgres;
pub mod store;

pub use diesel_pool::{
    check_diesel_health, create_diesel_pool, DieselDatabaseConfig, DieselPool, MIGRATIONS,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{ImageOutcome, MarketplaceStore, PageRows, QuotaOutcome, StoreError};
