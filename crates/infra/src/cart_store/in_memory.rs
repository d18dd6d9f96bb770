use std::collections::HashMap;
use std::sync::RwLock;

use sweetshop_cart::{Cart, CartStatus};
use sweetshop_core::{AggregateRoot, CartId, ExpectedVersion, UserId};

use super::r#trait::{CartStore, CartStoreError};

#[derive(Debug, Default)]
struct Carts {
    by_id: HashMap<CartId, Cart>,
    /// Secondary index; holds exactly the carts whose status is `Active`.
    active: HashMap<UserId, CartId>,
}

/// In-memory cart store.
///
/// Intended for tests/dev. Uniqueness and revision checks happen under a
/// single write lock, which gives the same guarantees as the Postgres
/// constraint + conditional update.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<Carts>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CartStoreError {
        CartStoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl CartStore for InMemoryCartStore {
    async fn find_active(&self, user_id: UserId) -> Result<Option<Cart>, CartStoreError> {
        let carts = self.carts.read().map_err(|_| Self::poisoned())?;
        Ok(carts
            .active
            .get(&user_id)
            .and_then(|id| carts.by_id.get(id))
            .cloned())
    }

    async fn find(&self, cart_id: CartId) -> Result<Option<Cart>, CartStoreError> {
        let carts = self.carts.read().map_err(|_| Self::poisoned())?;
        Ok(carts.by_id.get(&cart_id).cloned())
    }

    async fn insert_active(&self, cart: &Cart) -> Result<(), CartStoreError> {
        if cart.status() != CartStatus::Active {
            return Err(CartStoreError::InvalidWrite(format!(
                "cannot insert a cart in status '{}'",
                cart.status().as_str()
            )));
        }

        let mut carts = self.carts.write().map_err(|_| Self::poisoned())?;

        if carts.active.contains_key(&cart.user_id()) {
            return Err(CartStoreError::ActiveCartExists(cart.user_id()));
        }
        if carts.by_id.contains_key(&cart.id_typed()) {
            return Err(CartStoreError::Concurrency(format!(
                "cart {} already exists",
                cart.id_typed()
            )));
        }

        carts.active.insert(cart.user_id(), cart.id_typed());
        carts.by_id.insert(cart.id_typed(), cart.clone());
        Ok(())
    }

    async fn save(&self, cart: &Cart, expected: ExpectedVersion) -> Result<(), CartStoreError> {
        let mut carts = self.carts.write().map_err(|_| Self::poisoned())?;

        let stored = carts
            .by_id
            .get(&cart.id_typed())
            .ok_or(CartStoreError::NotFound(cart.id_typed()))?;

        let current = stored.version();
        if !expected.matches(current) {
            return Err(CartStoreError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }
        if stored.user_id() != cart.user_id() {
            return Err(CartStoreError::InvalidWrite(
                "cart owner cannot change".to_string(),
            ));
        }

        let was_active = stored.status() == CartStatus::Active;
        if !was_active && cart.status() == CartStatus::Active {
            return Err(CartStoreError::InvalidWrite(
                "a closed cart cannot be reactivated".to_string(),
            ));
        }

        if was_active && cart.status() != CartStatus::Active {
            carts.active.remove(&cart.user_id());
        }
        carts.by_id.insert(cart.id_typed(), cart.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sweetshop_cart::{CartCommand, ClearCart};
    use sweetshop_core::Aggregate;

    fn open(user: UserId) -> Cart {
        Cart::open(CartId::new(), user, Utc::now())
    }

    #[tokio::test]
    async fn second_active_cart_for_same_user_is_rejected() {
        let store = InMemoryCartStore::new();
        let user = UserId::new();

        store.insert_active(&open(user)).await.unwrap();
        let err = store.insert_active(&open(user)).await.unwrap_err();

        assert!(matches!(err, CartStoreError::ActiveCartExists(u) if u == user));
    }

    #[tokio::test]
    async fn save_with_stale_revision_is_rejected() {
        let store = InMemoryCartStore::new();
        let cart = open(UserId::new());
        store.insert_active(&cart).await.unwrap();

        let mut first = cart.clone();
        first
            .execute(&CartCommand::Clear(ClearCart { occurred_at: Utc::now() }))
            .unwrap();
        store.save(&first, ExpectedVersion::of(&cart)).await.unwrap();

        let mut second = cart.clone();
        second
            .execute(&CartCommand::Clear(ClearCart { occurred_at: Utc::now() }))
            .unwrap();
        let err = store
            .save(&second, ExpectedVersion::of(&cart))
            .await
            .unwrap_err();
        assert!(matches!(err, CartStoreError::Concurrency(_)));

        let stored = store.find(cart.id_typed()).await.unwrap().unwrap();
        assert_eq!(stored.version(), 1);
    }

    #[tokio::test]
    async fn completing_a_cart_frees_the_active_slot() {
        let store = InMemoryCartStore::new();
        let user = UserId::new();
        let cart = open(user);
        store.insert_active(&cart).await.unwrap();

        // Completion of an empty cart is refused by the aggregate, so build
        // the completed record directly.
        let completed = Cart::restore(
            cart.id_typed(),
            user,
            CartStatus::Completed,
            Vec::new(),
            cart.created_at(),
            Utc::now(),
            cart.version() + 1,
        );
        store.save(&completed, ExpectedVersion::of(&cart)).await.unwrap();

        assert!(store.find_active(user).await.unwrap().is_none());
        store.insert_active(&open(user)).await.unwrap();
        assert!(store.find_active(user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn save_of_unknown_cart_is_not_found() {
        let store = InMemoryCartStore::new();
        let cart = open(UserId::new());
        let err = store.save(&cart, ExpectedVersion::Any).await.unwrap_err();
        assert!(matches!(err, CartStoreError::NotFound(_)));
    }
}
