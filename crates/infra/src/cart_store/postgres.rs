//! Postgres-backed cart store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | CartStoreError | Scenario |
//! |------------|----------------------|----------------|----------|
//! | Database (unique violation) | `23505` | `ActiveCartExists` / `Concurrency` | Partial unique index on active carts, or duplicate cart id |
//! | Database (check constraint violation) | `23514` | `InvalidWrite` | Unknown status, negative revision |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / other | N/A | `Backend` | Network errors, connection failures, etc. |

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::instrument;

use sweetshop_cart::{Cart, CartLineItem, CartStatus};
use sweetshop_core::{AggregateRoot, CartId, ExpectedVersion, UserId};

use super::r#trait::{CartStore, CartStoreError};

const ACTIVE_CART_INDEX: &str = "carts_one_active_per_user";

/// Postgres-backed cart store.
///
/// One row per cart with line items embedded as JSONB. The partial unique
/// index `carts_one_active_per_user` enforces one active cart per user, and
/// `save` is a conditional `UPDATE ... WHERE version = $expected`.
#[derive(Debug, Clone)]
pub struct PostgresCartStore {
    pool: Arc<PgPool>,
}

impl PostgresCartStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn exists(&self, cart_id: CartId) -> Result<bool, CartStoreError> {
        let row = sqlx::query("SELECT 1 FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("exists", e))?;
        Ok(row.is_some())
    }
}

#[async_trait::async_trait]
impl CartStore for PostgresCartStore {
    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn find_active(&self, user_id: UserId) -> Result<Option<Cart>, CartStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, items, version, created_at, updated_at
            FROM carts
            WHERE user_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_active", e))?;

        row.map(|r| CartRow::decode(&r)).transpose()
    }

    #[instrument(skip(self), fields(cart_id = %cart_id), err)]
    async fn find(&self, cart_id: CartId) -> Result<Option<Cart>, CartStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, items, version, created_at, updated_at
            FROM carts
            WHERE id = $1
            "#,
        )
        .bind(cart_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find", e))?;

        row.map(|r| CartRow::decode(&r)).transpose()
    }

    #[instrument(
        skip(self, cart),
        fields(cart_id = %cart.id_typed(), user_id = %cart.user_id()),
        err
    )]
    async fn insert_active(&self, cart: &Cart) -> Result<(), CartStoreError> {
        if cart.status() != CartStatus::Active {
            return Err(CartStoreError::InvalidWrite(format!(
                "cannot insert a cart in status '{}'",
                cart.status().as_str()
            )));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, status, items, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(cart.id_typed().as_uuid())
        .bind(cart.user_id().as_uuid())
        .bind(cart.status().as_str())
        .bind(Json(cart.items()))
        .bind(version_to_db(cart.version())?)
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if violates_active_cart_index(&e) => {
                Err(CartStoreError::ActiveCartExists(cart.user_id()))
            }
            Err(e) => Err(map_sqlx_error("insert_active", e)),
        }
    }

    #[instrument(
        skip(self, cart),
        fields(
            cart_id = %cart.id_typed(),
            status = cart.status().as_str(),
            version = cart.version(),
            expected_version = ?expected
        ),
        err
    )]
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), CartStoreError> {
        let expected_db = match expected {
            ExpectedVersion::Any => None,
            ExpectedVersion::Exact(v) => Some(version_to_db(v)?),
        };

        // Status may only leave 'active'; the WHERE clause refuses reactivation.
        let result = sqlx::query(
            r#"
            UPDATE carts
            SET status = $3, items = $4, version = $5, updated_at = $6
            WHERE id = $1
              AND user_id = $7
              AND ($2::BIGINT IS NULL OR version = $2)
              AND (status = 'active' OR $3 <> 'active')
            "#,
        )
        .bind(cart.id_typed().as_uuid())
        .bind(expected_db)
        .bind(cart.status().as_str())
        .bind(Json(cart.items()))
        .bind(version_to_db(cart.version())?)
        .bind(cart.updated_at())
        .bind(cart.user_id().as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("save", e))?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        if self.exists(cart.id_typed()).await? {
            Err(CartStoreError::Concurrency(format!(
                "cart {} was modified concurrently (expected {expected:?})",
                cart.id_typed()
            )))
        } else {
            Err(CartStoreError::NotFound(cart.id_typed()))
        }
    }
}

struct CartRow;

impl CartRow {
    fn decode(row: &sqlx::postgres::PgRow) -> Result<Cart, CartStoreError> {
        let decode = |e: sqlx::Error| {
            CartStoreError::Backend(format!("failed to decode cart row: {e}"))
        };

        let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
        let user_id: uuid::Uuid = row.try_get("user_id").map_err(decode)?;
        let status: String = row.try_get("status").map_err(decode)?;
        let Json(items): Json<Vec<CartLineItem>> = row.try_get("items").map_err(decode)?;
        let version: i64 = row.try_get("version").map_err(decode)?;
        let created_at: DateTime<Utc> = row.try_get("created_at").map_err(decode)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(decode)?;

        let status: CartStatus = status
            .parse()
            .map_err(|e| CartStoreError::Backend(format!("{e}")))?;
        let version = u64::try_from(version)
            .map_err(|_| CartStoreError::Backend(format!("negative cart version {version}")))?;

        Ok(Cart::restore(
            CartId::from_uuid(id),
            UserId::from_uuid(user_id),
            status,
            items,
            created_at,
            updated_at,
            version,
        ))
    }
}

fn version_to_db(version: u64) -> Result<i64, CartStoreError> {
    i64::try_from(version)
        .map_err(|_| CartStoreError::InvalidWrite(format!("cart version {version} out of range")))
}

fn violates_active_cart_index(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().as_deref() == Some("23505")
            && db_err.constraint() == Some(ACTIVE_CART_INDEX);
    }
    false
}

/// Map SQLx errors to `CartStoreError`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> CartStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => CartStoreError::Concurrency(msg),
                Some("23514") => CartStoreError::InvalidWrite(msg),
                _ => CartStoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            CartStoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => CartStoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}
