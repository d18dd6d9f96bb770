//! Postgres-backed stock ledger over the `products` table.
//!
//! Every decrement is a single conditional statement
//! (`UPDATE ... SET quantity = quantity - $n WHERE id = $id AND quantity >= $n`),
//! so the check and the write happen under the same row lock. Multi-product
//! commits run inside one transaction and lock rows in product-id order to
//! keep concurrent checkouts from deadlocking each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{debug, instrument};

use sweetshop_catalog::{Product, StockDecrement, StockError, StockLedger, merge_decrements};
use sweetshop_core::{Money, ProductId};

#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: Arc<PgPool>,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Insert or replace a catalog record (used for seeding).
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    pub async fn upsert(&self, product: &Product) -> Result<(), StockError> {
        product
            .validate()
            .map_err(|e| StockError::Backend(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, price, quantity, description, image_url, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                category = EXCLUDED.category,
                price = EXCLUDED.price,
                quantity = EXCLUDED.quantity,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(product.price.amount())
        .bind(product.quantity)
        .bind(product.description.as_deref())
        .bind(product.image_url.as_deref())
        .bind(product.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert", e))?;

        Ok(())
    }

    /// Conditional decrement on an open transaction; `None` means shortfall
    /// or missing row.
    async fn try_decrement(
        tx: &mut Transaction<'_, Postgres>,
        product_id: ProductId,
        amount: i64,
    ) -> Result<Option<i64>, StockError> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = now()
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(amount)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("decrement", e))?;

        row.map(|r| r.try_get::<i64, _>("quantity"))
            .transpose()
            .map_err(|e| map_sqlx_error("decrement", e))
    }

    /// Explain why a conditional decrement touched no row.
    async fn shortfall(&self, product_id: ProductId, requested: i64) -> StockError {
        match self.find_product(product_id).await {
            Ok(product) => StockError::Insufficient {
                product_id,
                product_name: product.name,
                available: product.quantity,
                requested,
            },
            Err(err) => err,
        }
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StockError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))
    }
}

#[async_trait::async_trait]
impl StockLedger for PostgresStockLedger {
    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn find_product(&self, product_id: ProductId) -> Result<Product, StockError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, category, price, quantity, description, image_url, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?
        .ok_or(StockError::NotFound(product_id))?;

        decode_product(&row)
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn available_quantity(&self, product_id: ProductId) -> Result<i64, StockError> {
        let row = sqlx::query("SELECT quantity FROM products WHERE id = $1")
            .bind(product_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("available_quantity", e))?
            .ok_or(StockError::NotFound(product_id))?;

        row.try_get("quantity")
            .map_err(|e| map_sqlx_error("available_quantity", e))
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn decrement(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        if amount <= 0 {
            return Err(StockError::InvalidAmount(amount));
        }

        let mut tx = self.begin().await?;
        match Self::try_decrement(&mut tx, product_id, amount).await? {
            Some(remaining) => {
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("decrement", e))?;
                Ok(remaining)
            }
            None => {
                drop(tx);
                Err(self.shortfall(product_id, amount).await)
            }
        }
    }

    #[instrument(skip(self, decrements), fields(lines = decrements.len()), err)]
    async fn commit_decrements(&self, decrements: &[StockDecrement]) -> Result<(), StockError> {
        let mut merged = merge_decrements(decrements);
        if let Some(bad) = merged.iter().find(|d| d.amount <= 0) {
            return Err(StockError::InvalidAmount(bad.amount));
        }
        merged.sort_by_key(|d| *d.product_id.as_uuid());

        let mut tx = self.begin().await?;
        for d in &merged {
            if Self::try_decrement(&mut tx, d.product_id, d.amount).await?.is_none() {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("commit_decrements", e))?;
                return Err(self.shortfall(d.product_id, d.amount).await);
            }
        }
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_decrements", e))?;

        debug!(products = merged.len(), "stock committed");
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id), err)]
    async fn restock(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        if amount <= 0 {
            return Err(StockError::InvalidAmount(amount));
        }

        let row = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = now()
            WHERE id = $1
            RETURNING quantity
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(amount)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("restock", e))?
        .ok_or(StockError::NotFound(product_id))?;

        row.try_get("quantity")
            .map_err(|e| map_sqlx_error("restock", e))
    }
}

fn decode_product(row: &sqlx::postgres::PgRow) -> Result<Product, StockError> {
    let decode = |e: sqlx::Error| StockError::Backend(format!("failed to decode product row: {e}"));

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    let category: String = row.try_get("category").map_err(decode)?;
    let price: Decimal = row.try_get("price").map_err(decode)?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

    Ok(Product {
        id: ProductId::from_uuid(id),
        name: row.try_get("name").map_err(decode)?,
        category: category
            .parse()
            .map_err(|e| StockError::Backend(format!("{e}")))?,
        price: Money::new(price).map_err(|e| StockError::Backend(e.to_string()))?,
        quantity: row.try_get("quantity").map_err(decode)?,
        description: row.try_get("description").map_err(decode)?,
        image_url: row.try_get("image_url").map_err(decode)?,
        updated_at,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StockError {
    match err {
        sqlx::Error::Database(db_err) => StockError::Backend(format!(
            "database error in {}: {}",
            operation,
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            StockError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StockError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
