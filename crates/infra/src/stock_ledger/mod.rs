//! Stock ledger implementations (the trait lives in `sweetshop-catalog`).

pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryStockLedger, SeedError, read_seed_file};
pub use postgres::PostgresStockLedger;
