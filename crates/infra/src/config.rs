//! Process configuration read from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `SHOP_BIND_ADDR` | `0.0.0.0:8080` | HTTP listen address |
//! | `SHOP_TAX_RATE` | `0.18` | Tax fraction applied to the subtotal |
//! | `SHOP_PRICE_POLICY` | `locked` | `locked` or `refresh-on-increase` |
//! | `SHOP_CONFLICT_RETRIES` | `3` | Extra attempts after a stale cart write |
//! | `USE_PERSISTENT_STORES` | `false` | Use Postgres instead of in-memory stores |
//! | `DATABASE_URL` | (none) | Required when `USE_PERSISTENT_STORES=true` |
//! | `SHOP_CATALOG_SEED` | (none) | JSON file of products loaded at start |

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use sweetshop_cart::PriceSnapshotPolicy;
use sweetshop_core::TaxRate;

use crate::cart_service::CartSettings;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),
}

/// Where carts and stock live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopConfig {
    pub bind_addr: SocketAddr,
    pub cart: CartSettings,
    pub storage: StorageConfig,
    pub catalog_seed: Option<PathBuf>,
}

impl ShopConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the process environment in
    /// production, a map in tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = load(&lookup, "SHOP_BIND_ADDR", "0.0.0.0:8080")?;

        let rate: Decimal = load(&lookup, "SHOP_TAX_RATE", "0.18")?;
        let tax_rate = TaxRate::new(rate).map_err(|e| ConfigError::Invalid {
            key: "SHOP_TAX_RATE",
            value: rate.to_string(),
            reason: e.to_string(),
        })?;

        let price_policy: PriceSnapshotPolicy = load(&lookup, "SHOP_PRICE_POLICY", "locked")?;
        let conflict_retries = load(&lookup, "SHOP_CONFLICT_RETRIES", "3")?;

        let use_persistent: bool = load(&lookup, "USE_PERSISTENT_STORES", "false")?;
        let storage = if use_persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|url| !url.trim().is_empty())
                .ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        let catalog_seed = lookup("SHOP_CATALOG_SEED")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            bind_addr,
            cart: CartSettings {
                tax_rate,
                price_policy,
                conflict_retries,
            },
            storage,
            catalog_seed,
        })
    }
}

fn load<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = lookup(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}
