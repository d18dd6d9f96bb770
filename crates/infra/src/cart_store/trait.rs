use std::sync::Arc;

use thiserror::Error;

use sweetshop_cart::Cart;
use sweetshop_core::{CartId, ExpectedVersion, UserId};

/// Cart store operation error.
///
/// These are **infrastructure errors** (uniqueness, revision checks, storage),
/// as opposed to domain errors raised by the cart aggregate.
#[derive(Debug, Error)]
pub enum CartStoreError {
    /// Insert refused: the user already owns an active cart.
    #[error("user {0} already has an active cart")]
    ActiveCartExists(UserId),

    /// Optimistic concurrency check failed (stored revision moved on).
    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("cart {0} not found")]
    NotFound(CartId),

    /// Invalid write (e.g. inserting a cart that is not active).
    #[error("invalid cart write: {0}")]
    InvalidWrite(String),

    /// Storage failure (connection, lock poisoning, row decoding).
    #[error("cart store backend failure: {0}")]
    Backend(String),
}

/// Persistence for cart records.
///
/// ## Guarantees implementations must provide
///
/// - `insert_active` is the only way to create a cart and fails with
///   `ActiveCartExists` when the user already has one, even under concurrent
///   inserts for the same user.
/// - `save` is a compare-and-swap on the revision: it succeeds only when the
///   stored revision matches `expected`, and replaces status, items,
///   `updated_at` and revision in one write.
/// - Reads never return a half-applied write.
#[async_trait::async_trait]
pub trait CartStore: Send + Sync {
    /// The user's active cart, if any.
    async fn find_active(&self, user_id: UserId) -> Result<Option<Cart>, CartStoreError>;

    async fn find(&self, cart_id: CartId) -> Result<Option<Cart>, CartStoreError>;

    /// Persist a freshly opened cart.
    async fn insert_active(&self, cart: &Cart) -> Result<(), CartStoreError>;

    /// Replace a stored cart if its revision still matches `expected`.
    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), CartStoreError>;
}

#[async_trait::async_trait]
impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    async fn find_active(&self, user_id: UserId) -> Result<Option<Cart>, CartStoreError> {
        (**self).find_active(user_id).await
    }

    async fn find(&self, cart_id: CartId) -> Result<Option<Cart>, CartStoreError> {
        (**self).find(cart_id).await
    }

    async fn insert_active(&self, cart: &Cart) -> Result<(), CartStoreError> {
        (**self).insert_active(cart).await
    }

    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), CartStoreError> {
        (**self).save(cart, expected).await
    }
}
