//! Infrastructure layer: cart persistence, stock ledgers, configuration and
//! the cart/checkout application service.

pub mod cart_service;
pub mod cart_store;
pub mod config;
pub mod stock_ledger;


pub use cart_service::{CartService, CartServiceError, CartSettings, CartView};
pub use config::{ConfigError, ShopConfig, StorageConfig};

/// Postgres schema for carts and the product stock rows.
///
/// Idempotent; safe to run on every start.
pub const SCHEMA_SQL: &str = include_str!("../migrations/0001_cart_core.sql");

/// Apply [`SCHEMA_SQL`] to the given pool.
pub async fn ensure_schema(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}
