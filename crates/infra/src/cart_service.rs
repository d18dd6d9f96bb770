//! Cart/checkout application service.
//!
//! `CartService` sits between the HTTP layer and the infrastructure traits.
//! For each operation it:
//!
//! ```text
//! 1. Load (or lazily open) the user's active cart
//!   ↓
//! 2. Read what the decision needs from the Stock Ledger (name, price, stock)
//!   ↓
//! 3. Execute a cart command (pure, produces events, bumps the revision)
//!   ↓
//! 4. Save with an exact-revision expectation; on a stale write, reload and retry
//! ```
//!
//! Checkout adds a commit step in front of the save:
//!
//! ```text
//! validate every line against current stock
//!   → complete the cart in memory
//!   → commit all decrements atomically (re-checked by the ledger)
//!   → save the completed cart
//!   → on save failure, restock what was decremented
//! ```
//!
//! Stock is never held by carts; the ledger only changes at checkout.

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use sweetshop_cart::{
    AddItem, Cart, CartCommand, CartEvent, CartSummary, ClearCart, CompleteCart,
    PriceSnapshotPolicy, RemoveItem, UpdateItemQuantity,
};
use sweetshop_catalog::{StockDecrement, StockError, StockLedger};
use sweetshop_core::{
    Aggregate, CartId, DomainError, Event, ExpectedVersion, LineItemId, ProductId, TaxRate, UserId,
};

use crate::cart_store::{CartStore, CartStoreError};

/// Service-level failure, one variant per externally visible kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartServiceError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Insufficient stock for {product_name}. Only {available} available.")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i64,
    },

    #[error("Cart is empty")]
    EmptyCart,

    /// Stale write that survived the retry budget, or a lifecycle clash.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Storage or ledger backend failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CartServiceError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CartServiceError::InvalidInput(_) => "invalid_input",
            CartServiceError::NotFound(_) => "not_found",
            CartServiceError::InsufficientStock { .. } => "insufficient_stock",
            CartServiceError::EmptyCart => "empty_cart",
            CartServiceError::Conflict(_) => "conflict",
            CartServiceError::Internal(_) => "internal",
        }
    }
}

impl From<DomainError> for CartServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidInput(msg) | DomainError::InvalidId(msg) => {
                CartServiceError::InvalidInput(msg)
            }
            DomainError::NotFound(what) => CartServiceError::NotFound(what),
            DomainError::InsufficientStock {
                product_id,
                product_name,
                available,
            } => CartServiceError::InsufficientStock {
                product_id,
                product_name,
                available,
            },
            DomainError::EmptyCart => CartServiceError::EmptyCart,
            DomainError::InvariantViolation(msg) | DomainError::Conflict(msg) => {
                CartServiceError::Conflict(msg)
            }
        }
    }
}

impl From<StockError> for CartServiceError {
    fn from(value: StockError) -> Self {
        match value.to_domain() {
            Some(domain) => domain.into(),
            None => CartServiceError::Internal(value.to_string()),
        }
    }
}

impl From<CartStoreError> for CartServiceError {
    fn from(value: CartStoreError) -> Self {
        match value {
            CartStoreError::Concurrency(msg) => CartServiceError::Conflict(msg),
            CartStoreError::ActiveCartExists(user) => {
                CartServiceError::Conflict(format!("user {user} already has an active cart"))
            }
            CartStoreError::NotFound(id) => CartServiceError::NotFound(format!("cart {id}")),
            CartStoreError::InvalidWrite(msg) | CartStoreError::Backend(msg) => {
                CartServiceError::Internal(msg)
            }
        }
    }
}

/// Tunables for the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    pub tax_rate: TaxRate,
    pub price_policy: PriceSnapshotPolicy,
    /// Extra attempts after a stale-revision save before giving up with `Conflict`.
    pub conflict_retries: u32,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            tax_rate: TaxRate::DEFAULT,
            price_policy: PriceSnapshotPolicy::default(),
            conflict_retries: 3,
        }
    }
}

/// A cart together with its derived summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub summary: CartSummary,
}

/// Cart/checkout coordinator over a cart store and a stock ledger.
#[derive(Debug)]
pub struct CartService<S, L> {
    store: S,
    ledger: L,
    settings: CartSettings,
}

impl<S, L> CartService<S, L> {
    pub fn new(store: S, ledger: L) -> Self {
        Self::with_settings(store, ledger, CartSettings::default())
    }

    pub fn with_settings(store: S, ledger: L, settings: CartSettings) -> Self {
        Self {
            store,
            ledger,
            settings,
        }
    }

    pub fn settings(&self) -> &CartSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

impl<S, L> CartService<S, L>
where
    S: CartStore,
    L: StockLedger,
{
    /// The user's active cart, opening an empty one if none exists.
    ///
    /// Two concurrent first calls for the same user end up with the same cart:
    /// the loser of the insert race reads the winner's cart.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_or_create_active_cart(&self, user_id: UserId) -> Result<Cart, CartServiceError> {
        if let Some(cart) = self.store.find_active(user_id).await? {
            return Ok(cart);
        }

        let cart = Cart::open(CartId::new(), user_id, Utc::now());
        match self.store.insert_active(&cart).await {
            Ok(()) => {
                debug!(cart_id = %cart.id_typed(), "opened cart");
                Ok(cart)
            }
            Err(CartStoreError::ActiveCartExists(_)) => {
                debug!("lost cart creation race; using the existing cart");
                self.store.find_active(user_id).await?.ok_or_else(|| {
                    CartServiceError::Conflict(
                        "active cart disappeared while it was being created".to_string(),
                    )
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Active cart with its summary (created if missing).
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn get_cart(&self, user_id: UserId) -> Result<CartView, CartServiceError> {
        let cart = self.get_or_create_active_cart(user_id).await?;
        Ok(self.view(cart))
    }

    /// Add `quantity` units of a product, merging into an existing line.
    ///
    /// The cumulative quantity on the line is checked against current stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartView, CartServiceError> {
        if quantity < 1 {
            return Err(CartServiceError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        for attempt in 0..=self.settings.conflict_retries {
            // An unknown product must not leave an empty cart behind.
            let product = self.ledger.find_product(product_id).await.map_err(|e| match e {
                StockError::NotFound(id) => {
                    CartServiceError::InvalidInput(format!("product {id} does not exist"))
                }
                other => other.into(),
            })?;
            let cart = self.get_or_create_active_cart(user_id).await?;

            let command = CartCommand::AddItem(AddItem {
                line_item_id: LineItemId::new(),
                product_id,
                product_name: product.name,
                quantity,
                unit_price: product.price,
                available: product.quantity,
                policy: self.settings.price_policy,
                occurred_at: Utc::now(),
            });

            if let Some(saved) = self.execute_and_save(cart, &command, attempt).await? {
                return Ok(self.view(saved));
            }
        }

        Err(self.retries_exhausted())
    }

    /// Set a line's quantity (absolute, not a delta).
    #[instrument(skip(self), fields(user_id = %user_id, line_item_id = %line_item_id))]
    pub async fn update_item(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
        quantity: i64,
    ) -> Result<CartView, CartServiceError> {
        if quantity < 1 {
            return Err(CartServiceError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        for attempt in 0..=self.settings.conflict_retries {
            let cart = self.require_active_cart(user_id).await?;
            let line = cart.line(line_item_id).ok_or_else(|| {
                CartServiceError::NotFound(format!("line item {line_item_id}"))
            })?;
            let product = self.ledger.find_product(line.product_id).await?;

            let command = CartCommand::UpdateItemQuantity(UpdateItemQuantity {
                line_item_id,
                product_name: product.name,
                quantity,
                available: product.quantity,
                current_price: product.price,
                policy: self.settings.price_policy,
                occurred_at: Utc::now(),
            });

            if let Some(saved) = self.execute_and_save(cart, &command, attempt).await? {
                return Ok(self.view(saved));
            }
        }

        Err(self.retries_exhausted())
    }

    /// Remove a line. A second removal of the same line is `NotFound`.
    #[instrument(skip(self), fields(user_id = %user_id, line_item_id = %line_item_id))]
    pub async fn remove_item(
        &self,
        user_id: UserId,
        line_item_id: LineItemId,
    ) -> Result<CartView, CartServiceError> {
        for attempt in 0..=self.settings.conflict_retries {
            let cart = self.require_active_cart(user_id).await?;
            let command = CartCommand::RemoveItem(RemoveItem {
                line_item_id,
                occurred_at: Utc::now(),
            });

            if let Some(saved) = self.execute_and_save(cart, &command, attempt).await? {
                return Ok(self.view(saved));
            }
        }

        Err(self.retries_exhausted())
    }

    /// Empty the active cart; the returned summary is all zeros.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: UserId) -> Result<CartView, CartServiceError> {
        for attempt in 0..=self.settings.conflict_retries {
            let cart = self.require_active_cart(user_id).await?;
            let command = CartCommand::Clear(ClearCart {
                occurred_at: Utc::now(),
            });

            if let Some(cart) = self.execute_and_save(cart, &command, attempt).await? {
                return Ok(CartView {
                    cart,
                    summary: CartSummary::zero(),
                });
            }
        }

        Err(self.retries_exhausted())
    }

    /// Convert the active cart into a completed purchase.
    ///
    /// Either every line's stock is decremented and the cart is completed, or
    /// nothing changes. A failure after the stock commit is compensated by
    /// restocking exactly what was decremented.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn checkout(&self, user_id: UserId) -> Result<CartView, CartServiceError> {
        let mut cart = self.require_active_cart(user_id).await?;
        if cart.is_empty() {
            return Err(CartServiceError::EmptyCart);
        }

        // Validation pass: fail fast with the offending product's name.
        for line in cart.items() {
            let product = self.ledger.find_product(line.product_id).await?;
            if product.quantity < line.quantity {
                return Err(CartServiceError::InsufficientStock {
                    product_id: product.id,
                    product_name: product.name,
                    available: product.quantity,
                });
            }
        }

        let expected = ExpectedVersion::of(&cart);
        let events = cart.execute(&CartCommand::Complete(CompleteCart {
            occurred_at: Utc::now(),
        }))?;

        let decrements: Vec<StockDecrement> = cart
            .items()
            .iter()
            .map(|line| StockDecrement {
                product_id: line.product_id,
                amount: line.quantity,
            })
            .collect();

        // Availability is re-checked here; the earlier pass is only a fast path.
        self.ledger.commit_decrements(&decrements).await?;

        if let Err(err) = self.store.save(&cart, expected).await {
            warn!(cart_id = %cart.id_typed(), error = %err, "saving completed cart failed; restocking");
            self.compensate(&decrements).await;
            return Err(err.into());
        }

        log_events(&events);
        let view = self.view(cart);
        info!(
            cart_id = %view.cart.id_typed(),
            items = view.summary.item_count,
            total = %view.summary.total,
            "checkout completed"
        );
        Ok(view)
    }

    fn view(&self, cart: Cart) -> CartView {
        let summary = CartSummary::of(&cart, self.settings.tax_rate);
        CartView { cart, summary }
    }

    async fn require_active_cart(&self, user_id: UserId) -> Result<Cart, CartServiceError> {
        self.store
            .find_active(user_id)
            .await?
            .ok_or_else(|| CartServiceError::NotFound("Cart".to_string()))
    }

    /// Execute `command` on `cart` and save it against the loaded revision.
    ///
    /// `Ok(None)` means the stored cart moved on and the caller should reload.
    async fn execute_and_save(
        &self,
        mut cart: Cart,
        command: &CartCommand,
        attempt: u32,
    ) -> Result<Option<Cart>, CartServiceError> {
        let expected = ExpectedVersion::of(&cart);
        let events = cart.execute(command)?;

        match self.store.save(&cart, expected).await {
            Ok(()) => {
                log_events(&events);
                Ok(Some(cart))
            }
            Err(CartStoreError::Concurrency(reason)) => {
                warn!(
                    cart_id = %cart.id_typed(),
                    attempt,
                    reason = %reason,
                    "stale cart revision; retrying"
                );
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn compensate(&self, decrements: &[StockDecrement]) {
        for d in decrements {
            if let Err(err) = self.ledger.restock(d.product_id, d.amount).await {
                error!(
                    product_id = %d.product_id,
                    amount = d.amount,
                    error = %err,
                    "failed to restock after aborted checkout"
                );
            }
        }
    }

    fn retries_exhausted(&self) -> CartServiceError {
        CartServiceError::Conflict(format!(
            "cart changed concurrently {} times; giving up",
            self.settings.conflict_retries + 1
        ))
    }
}

fn log_events(events: &[CartEvent]) {
    for event in events {
        debug!(
            event_type = event.event_type(),
            occurred_at = %event.occurred_at(),
            "cart event applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rust_decimal_macros::dec;
    use sweetshop_cart::CartStatus;
    use sweetshop_catalog::{Category, Product};
    use sweetshop_core::Money;

    use crate::cart_store::InMemoryCartStore;
    use crate::stock_ledger::InMemoryStockLedger;

    type Service = CartService<Arc<InMemoryCartStore>, Arc<InMemoryStockLedger>>;

    fn product(name: &str, price: rust_decimal::Decimal, quantity: i64) -> Product {
        Product::new(
            ProductId::new(),
            name,
            Category::Chocolate,
            Money::new(price).unwrap(),
            quantity,
        )
        .unwrap()
    }

    fn service(products: impl IntoIterator<Item = Product>) -> Service {
        CartService::new(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(InMemoryStockLedger::with_products(products)),
        )
    }

    #[tokio::test]
    async fn get_cart_opens_an_empty_cart_once() {
        let svc = service([]);
        let user = UserId::new();

        let first = svc.get_cart(user).await.unwrap();
        let second = svc.get_cart(user).await.unwrap();

        assert!(first.cart.is_empty());
        assert_eq!(first.cart.id_typed(), second.cart.id_typed());
        assert_eq!(first.summary, CartSummary::zero());
    }

    #[tokio::test]
    async fn adding_then_checking_out_decrements_stock() {
        let p = product("Dark Truffle", dec!(10.99), 5);
        let svc = service([p.clone()]);
        let user = UserId::new();

        let view = svc.add_item(user, p.id, 2).await.unwrap();
        assert_eq!(view.cart.items().len(), 1);
        assert_eq!(view.summary.subtotal, dec!(21.98));
        assert_eq!(view.summary.tax, dec!(3.96));
        assert_eq!(view.summary.total, dec!(25.94));

        let done = svc.checkout(user).await.unwrap();
        assert_eq!(done.cart.status(), CartStatus::Completed);
        assert_eq!(svc.ledger().available_quantity(p.id).await.unwrap(), 3);

        // The next read opens a fresh cart.
        let next = svc.get_cart(user).await.unwrap();
        assert_ne!(next.cart.id_typed(), done.cart.id_typed());
        assert!(next.cart.is_empty());
    }

    #[tokio::test]
    async fn cumulative_add_beyond_stock_is_refused() {
        let p = product("Caramel Chew", dec!(1.00), 5);
        let svc = service([p.clone()]);
        let user = UserId::new();

        svc.add_item(user, p.id, 3).await.unwrap();
        let err = svc.add_item(user, p.id, 3).await.unwrap_err();

        assert_eq!(
            err,
            CartServiceError::InsufficientStock {
                product_id: p.id,
                product_name: "Caramel Chew".to_string(),
                available: 5,
            }
        );
        let view = svc.get_cart(user).await.unwrap();
        assert_eq!(view.cart.items()[0].quantity, 3);
    }

    #[tokio::test]
    async fn repeated_adds_merge_into_one_line() {
        let p = product("Mint Drops", dec!(0.50), 10);
        let svc = service([p.clone()]);
        let user = UserId::new();

        svc.add_item(user, p.id, 2).await.unwrap();
        let view = svc.add_item(user, p.id, 4).await.unwrap();

        assert_eq!(view.cart.items().len(), 1);
        assert_eq!(view.cart.items()[0].quantity, 6);
        assert_eq!(view.summary.item_count, 6);
    }

    #[tokio::test]
    async fn adding_unknown_product_is_invalid_input() {
        let svc = service([]);
        let err = svc.add_item(UserId::new(), ProductId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn zero_quantity_is_invalid_input() {
        let p = product("Gum", dec!(0.25), 10);
        let svc = service([p.clone()]);
        let err = svc.add_item(UserId::new(), p.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
    }

    #[tokio::test]
    async fn checkout_with_stock_gone_changes_nothing() {
        let p = product("Rare Licorice", dec!(4.00), 3);
        let svc = service([p.clone()]);
        let user = UserId::new();

        svc.add_item(user, p.id, 3).await.unwrap();
        // Another buyer takes one unit after the cart was filled.
        svc.ledger().decrement(p.id, 1).await.unwrap();

        let err = svc.checkout(user).await.unwrap_err();
        assert_eq!(
            err,
            CartServiceError::InsufficientStock {
                product_id: p.id,
                product_name: "Rare Licorice".to_string(),
                available: 2,
            }
        );
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rare Licorice. Only 2 available."
        );

        let view = svc.get_cart(user).await.unwrap();
        assert_eq!(view.cart.status(), CartStatus::Active);
        assert_eq!(view.cart.items()[0].quantity, 3);
        assert_eq!(svc.ledger().available_quantity(p.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_product_does_not_open_a_cart() {
        let svc = service([]);
        let user = UserId::new();

        let err = svc.add_item(user, ProductId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_input");
        assert!(svc.store().find_active(user).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_add_is_refused_and_cart_stays_readable() {
        let p = product("Gold Leaf Bonbon", dec!(9999999999.99), i64::MAX);
        let svc = service([p.clone()]);
        let user = UserId::new();

        let err = svc
            .add_item(user, p.id, 9_000_000_000_000_000_000)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_input");

        let view = svc.get_cart(user).await.unwrap();
        assert!(view.cart.is_empty());
        assert_eq!(view.summary, CartSummary::zero());
    }

    #[tokio::test]
    async fn checkout_with_one_product_sold_out_leaves_the_other_untouched() {
        let fudge = product("Fudge", dec!(3.00), 4);
        let toffee = product("Toffee", dec!(2.50), 2);
        let svc = service([fudge.clone(), toffee.clone()]);
        let user = UserId::new();

        svc.add_item(user, fudge.id, 3).await.unwrap();
        svc.add_item(user, toffee.id, 2).await.unwrap();
        // Someone else buys every toffee first.
        svc.ledger().decrement(toffee.id, 2).await.unwrap();

        let err = svc.checkout(user).await.unwrap_err();
        assert_eq!(
            err,
            CartServiceError::InsufficientStock {
                product_id: toffee.id,
                product_name: "Toffee".to_string(),
                available: 0,
            }
        );
        assert_eq!(svc.ledger().available_quantity(fudge.id).await.unwrap(), 4);
        assert_eq!(svc.ledger().available_quantity(toffee.id).await.unwrap(), 0);

        let view = svc.get_cart(user).await.unwrap();
        assert_eq!(view.cart.status(), CartStatus::Active);
        assert_eq!(view.cart.items().len(), 2);
    }

    #[tokio::test]
    async fn checkout_of_empty_cart_is_refused() {
        let svc = service([]);
        let user = UserId::new();
        svc.get_cart(user).await.unwrap();

        assert_eq!(svc.checkout(user).await.unwrap_err(), CartServiceError::EmptyCart);
    }

    #[tokio::test]
    async fn checkout_without_a_cart_is_not_found() {
        let svc = service([]);
        let err = svc.checkout(UserId::new()).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn locked_snapshot_survives_price_change() {
        let p = product("Bonbon", dec!(2.00), 10);
        let svc = service([p.clone()]);
        let user = UserId::new();

        svc.add_item(user, p.id, 1).await.unwrap();
        svc.ledger().set_price(p.id, Money::new(dec!(3.00)).unwrap()).unwrap();
        let view = svc.add_item(user, p.id, 1).await.unwrap();

        assert_eq!(view.cart.items()[0].price_at_time.amount(), dec!(2.00));
        assert_eq!(view.summary.subtotal, dec!(4.00));
    }

    #[tokio::test]
    async fn refresh_policy_reprices_on_increase() {
        let p = product("Bonbon", dec!(2.00), 10);
        let svc = CartService::with_settings(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(InMemoryStockLedger::with_products([p.clone()])),
            CartSettings {
                price_policy: PriceSnapshotPolicy::RefreshOnIncrease,
                ..CartSettings::default()
            },
        );
        let user = UserId::new();

        svc.add_item(user, p.id, 1).await.unwrap();
        svc.ledger().set_price(p.id, Money::new(dec!(3.00)).unwrap()).unwrap();
        let view = svc.add_item(user, p.id, 1).await.unwrap();

        assert_eq!(view.cart.items()[0].price_at_time.amount(), dec!(3.00));
        assert_eq!(view.summary.subtotal, dec!(6.00));
    }

    #[tokio::test]
    async fn update_sets_absolute_quantity_within_stock() {
        let p = product("Jelly Beans", dec!(0.10), 4);
        let svc = service([p.clone()]);
        let user = UserId::new();

        let view = svc.add_item(user, p.id, 1).await.unwrap();
        let line = view.cart.items()[0].id;

        let view = svc.update_item(user, line, 4).await.unwrap();
        assert_eq!(view.cart.items()[0].quantity, 4);

        let err = svc.update_item(user, line, 5).await.unwrap_err();
        assert_eq!(err.kind(), "insufficient_stock");

        let err = svc.update_item(user, LineItemId::new(), 1).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn removing_a_line_twice_is_not_found_the_second_time() {
        let p = product("Lollipop", dec!(0.75), 4);
        let svc = service([p.clone()]);
        let user = UserId::new();

        let view = svc.add_item(user, p.id, 1).await.unwrap();
        let line = view.cart.items()[0].id;

        let view = svc.remove_item(user, line).await.unwrap();
        assert!(view.cart.is_empty());
        let err = svc.remove_item(user, line).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn clear_returns_zero_summary() {
        let p = product("Marshmallow", dec!(1.25), 4);
        let svc = service([p.clone()]);
        let user = UserId::new();
        svc.add_item(user, p.id, 2).await.unwrap();

        let view = svc.clear_cart(user).await.unwrap();
        assert!(view.cart.is_empty());
        assert_eq!(view.summary, CartSummary::zero());
        assert_eq!(svc.ledger().available_quantity(p.id).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn cart_mutations_never_touch_stock() {
        let p = product("Sour Belt", dec!(0.60), 7);
        let svc = service([p.clone()]);
        let user = UserId::new();

        let view = svc.add_item(user, p.id, 3).await.unwrap();
        let line = view.cart.items()[0].id;
        svc.update_item(user, line, 6).await.unwrap();
        svc.remove_item(user, line).await.unwrap();
        svc.add_item(user, p.id, 1).await.unwrap();
        svc.clear_cart(user).await.unwrap();

        assert_eq!(svc.ledger().available_quantity(p.id).await.unwrap(), 7);
    }

    #[test]
    fn error_kinds_are_stable() {
        assert_eq!(CartServiceError::EmptyCart.kind(), "empty_cart");
        assert_eq!(CartServiceError::Conflict(String::new()).kind(), "conflict");
        assert_eq!(CartServiceError::Internal(String::new()).kind(), "internal");
        assert_eq!(
            CartServiceError::from(StockError::Backend("down".into())).kind(),
            "internal"
        );
        assert_eq!(
            CartServiceError::from(DomainError::invariant("cart is completed")).kind(),
            "conflict"
        );
    }
}
