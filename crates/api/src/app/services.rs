use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use sweetshop_catalog::{Product, StockLedger};
use sweetshop_infra::cart_store::{CartStore, InMemoryCartStore, PostgresCartStore};
use sweetshop_infra::stock_ledger::{InMemoryStockLedger, PostgresStockLedger, read_seed_file};
use sweetshop_infra::{CartService, CartSettings, ShopConfig, StorageConfig, ensure_schema};

/// `CartService` with its backends erased, so one router serves either wiring.
pub type SharedCartService = CartService<Arc<dyn CartStore>, Arc<dyn StockLedger>>;

/// Services shared by every request handler.
pub struct AppServices {
    pub cart: SharedCartService,
}

impl AppServices {
    pub fn new(
        store: Arc<dyn CartStore>,
        ledger: Arc<dyn StockLedger>,
        settings: CartSettings,
    ) -> Self {
        Self {
            cart: CartService::with_settings(store, ledger, settings),
        }
    }

    /// In-memory wiring over a fixed product set.
    pub fn in_memory(products: impl IntoIterator<Item = Product>, settings: CartSettings) -> Self {
        Self::new(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(InMemoryStockLedger::with_products(products)),
            settings,
        )
    }
}

/// Select and initialize backends from configuration.
pub async fn build_services(config: &ShopConfig) -> anyhow::Result<AppServices> {
    let seed = match &config.catalog_seed {
        Some(path) => read_seed_file(path)
            .with_context(|| format!("loading catalog seed {}", path.display()))?,
        None => Vec::new(),
    };

    match &config.storage {
        StorageConfig::InMemory => {
            info!(products = seed.len(), "using in-memory stores");
            Ok(AppServices::in_memory(seed, config.cart))
        }
        StorageConfig::Postgres { database_url } => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await
                .context("failed to connect to Postgres")?;
            ensure_schema(&pool)
                .await
                .context("failed to apply cart schema")?;

            let ledger = PostgresStockLedger::new(pool.clone());
            for product in &seed {
                ledger
                    .upsert(product)
                    .await
                    .with_context(|| format!("seeding product {}", product.id))?;
            }

            info!(products = seed.len(), "using Postgres stores");
            Ok(AppServices::new(
                Arc::new(PostgresCartStore::new(pool)),
                Arc::new(ledger),
                config.cart,
            ))
        }
    }
}
