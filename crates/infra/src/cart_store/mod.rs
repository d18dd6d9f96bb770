//! Cart persistence boundary.
//!
//! Carts are stored as whole records (embedded line items) guarded by a
//! revision counter, plus a "one active cart per user" uniqueness rule that
//! backends must enforce themselves rather than leave to callers.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryCartStore;
pub use postgres::PostgresCartStore;
pub use r#trait::{CartStore, CartStoreError};
