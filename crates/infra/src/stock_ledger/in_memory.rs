use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;
use thiserror::Error;

use sweetshop_catalog::{Product, StockDecrement, StockError, StockLedger, merge_decrements};
use sweetshop_core::{DomainError, ProductId};

/// Failure loading a catalog seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid product in seed file: {0}")]
    Invalid(#[from] DomainError),
}

/// Parse and validate a JSON array of catalog records.
pub fn read_seed_file(path: impl AsRef<Path>) -> Result<Vec<Product>, SeedError> {
    let raw = std::fs::read_to_string(path)?;
    let products: Vec<Product> = serde_json::from_str(&raw)?;
    for product in &products {
        product.validate()?;
    }
    Ok(products)
}

/// In-memory stock ledger holding full product records.
///
/// Intended for tests/dev. Every check-and-decrement runs under the write
/// lock, so no interleaving can observe (or produce) a negative counter.
#[derive(Debug, Default)]
pub struct InMemoryStockLedger {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryStockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let ledger = Self::new();
        if let Ok(mut map) = ledger.products.write() {
            map.extend(products.into_iter().map(|p| (p.id, p)));
        }
        ledger
    }

    /// Load products from a JSON array of catalog records.
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        Ok(Self::with_products(read_seed_file(path)?))
    }

    /// Insert or replace a catalog record.
    pub fn upsert(&self, product: Product) -> Result<(), StockError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;
        products.insert(product.id, product);
        Ok(())
    }

    /// Change a product's catalog price (stock untouched).
    pub fn set_price(
        &self,
        product_id: ProductId,
        price: sweetshop_core::Money,
    ) -> Result<(), StockError> {
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;
        let product = products
            .get_mut(&product_id)
            .ok_or(StockError::NotFound(product_id))?;
        product.price = price;
        product.updated_at = Utc::now();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.products.read().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> StockError {
        StockError::Backend("lock poisoned".to_string())
    }

    fn check_amount(amount: i64) -> Result<(), StockError> {
        if amount <= 0 {
            return Err(StockError::InvalidAmount(amount));
        }
        Ok(())
    }

    fn shortfall(product: &Product, requested: i64) -> StockError {
        StockError::Insufficient {
            product_id: product.id,
            product_name: product.name.clone(),
            available: product.quantity,
            requested,
        }
    }
}

#[async_trait::async_trait]
impl StockLedger for InMemoryStockLedger {
    async fn find_product(&self, product_id: ProductId) -> Result<Product, StockError> {
        let products = self.products.read().map_err(|_| Self::poisoned())?;
        products
            .get(&product_id)
            .cloned()
            .ok_or(StockError::NotFound(product_id))
    }

    async fn decrement(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        Self::check_amount(amount)?;
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;
        let product = products
            .get_mut(&product_id)
            .ok_or(StockError::NotFound(product_id))?;

        if product.quantity < amount {
            return Err(Self::shortfall(product, amount));
        }
        product.quantity -= amount;
        product.updated_at = Utc::now();
        Ok(product.quantity)
    }

    async fn commit_decrements(&self, decrements: &[StockDecrement]) -> Result<(), StockError> {
        let merged = merge_decrements(decrements);
        for d in &merged {
            Self::check_amount(d.amount)?;
        }

        let mut products = self.products.write().map_err(|_| Self::poisoned())?;

        // Check every counter before touching any of them.
        for d in &merged {
            let product = products
                .get(&d.product_id)
                .ok_or(StockError::NotFound(d.product_id))?;
            if product.quantity < d.amount {
                return Err(Self::shortfall(product, d.amount));
            }
        }

        let now = Utc::now();
        for d in &merged {
            if let Some(product) = products.get_mut(&d.product_id) {
                product.quantity -= d.amount;
                product.updated_at = now;
            }
        }
        Ok(())
    }

    async fn restock(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        Self::check_amount(amount)?;
        let mut products = self.products.write().map_err(|_| Self::poisoned())?;
        let product = products
            .get_mut(&product_id)
            .ok_or(StockError::NotFound(product_id))?;

        product.quantity = product
            .quantity
            .checked_add(amount)
            .ok_or(StockError::InvalidAmount(amount))?;
        product.updated_at = Utc::now();
        Ok(product.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use sweetshop_catalog::Category;
    use sweetshop_core::Money;

    fn product(name: &str, quantity: i64) -> Product {
        Product::new(
            ProductId::new(),
            name,
            Category::Chocolate,
            Money::from_cents(250),
            quantity,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn decrement_refuses_to_go_below_zero() {
        let p = product("Fudge", 2);
        let ledger = InMemoryStockLedger::with_products([p.clone()]);

        let err = ledger.decrement(p.id, 3).await.unwrap_err();
        assert!(matches!(err, StockError::Insufficient { available: 2, requested: 3, .. }));
        assert_eq!(ledger.available_quantity(p.id).await.unwrap(), 2);

        assert_eq!(ledger.decrement(p.id, 2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn commit_is_all_or_nothing() {
        let plenty = product("Toffee", 10);
        let scarce = product("Nougat", 1);
        let ledger = InMemoryStockLedger::with_products([plenty.clone(), scarce.clone()]);

        let err = ledger
            .commit_decrements(&[
                StockDecrement { product_id: plenty.id, amount: 4 },
                StockDecrement { product_id: scarce.id, amount: 2 },
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, StockError::Insufficient { product_id, .. } if product_id == scarce.id));
        assert_eq!(ledger.available_quantity(plenty.id).await.unwrap(), 10);
        assert_eq!(ledger.available_quantity(scarce.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn commit_merges_entries_for_the_same_product() {
        let p = product("Gummy Bears", 5);
        let ledger = InMemoryStockLedger::with_products([p.clone()]);

        let err = ledger
            .commit_decrements(&[
                StockDecrement { product_id: p.id, amount: 3 },
                StockDecrement { product_id: p.id, amount: 3 },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StockError::Insufficient { requested: 6, .. }));
        assert_eq!(ledger.available_quantity(p.id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn restock_adds_units_back() {
        let p = product("Licorice", 1);
        let ledger = InMemoryStockLedger::with_products([p.clone()]);
        ledger.decrement(p.id, 1).await.unwrap();
        assert_eq!(ledger.restock(p.id, 4).await.unwrap(), 4);
        assert!(matches!(
            ledger.restock(p.id, 0).await,
            Err(StockError::InvalidAmount(0))
        ));
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let ledger = InMemoryStockLedger::new();
        let id = ProductId::new();
        assert_eq!(ledger.find_product(id).await.unwrap_err(), StockError::NotFound(id));
    }

    #[test]
    fn loads_seed_file() {
        let id = ProductId::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"{id}","name":"Sour Worms","category":"sour-candy","price":1.5,"quantity":40}}]"#
        )
        .unwrap();

        let ledger = InMemoryStockLedger::from_seed_file(file.path()).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn seed_file_with_negative_stock_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id":"{}","name":"Broken","category":"other","price":1.0,"quantity":-1}}]"#,
            ProductId::new()
        )
        .unwrap();

        assert!(matches!(
            InMemoryStockLedger::from_seed_file(file.path()),
            Err(SeedError::Invalid(_))
        ));
    }
}
