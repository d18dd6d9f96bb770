//! Stock Ledger boundary.
//!
//! The ledger is the authoritative per-product counter of purchasable units.
//! Implementations must make every decrement conditional on sufficient stock
//! (decrement-if-available, never read-then-write), so concurrent checkouts
//! cannot drive a counter below zero.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweetshop_core::{DomainError, ProductId};

use crate::product::Product;

/// One product's share of a multi-product commit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDecrement {
    pub product_id: ProductId,
    pub amount: i64,
}

/// Stock ledger operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StockError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("insufficient stock for {product_name}: only {available} available, {requested} requested")]
    Insufficient {
        product_id: ProductId,
        product_name: String,
        available: i64,
        requested: i64,
    },

    #[error("stock amount must be positive, got {0}")]
    InvalidAmount(i64),

    /// Storage failure (connection, lock poisoning, serialization).
    #[error("stock ledger backend failure: {0}")]
    Backend(String),
}

impl StockError {
    /// Domain view of a ledger failure, if it is one of the domain kinds.
    ///
    /// Backend failures have no domain meaning and return `None`.
    pub fn to_domain(&self) -> Option<DomainError> {
        match self {
            StockError::NotFound(id) => Some(DomainError::not_found(format!("product {id}"))),
            StockError::Insufficient {
                product_id,
                product_name,
                available,
                ..
            } => Some(DomainError::insufficient_stock(
                *product_id,
                product_name.clone(),
                *available,
            )),
            StockError::InvalidAmount(amount) => Some(DomainError::invalid_input(format!(
                "stock amount must be positive, got {amount}"
            ))),
            StockError::Backend(_) => None,
        }
    }
}

/// Authoritative per-product available-quantity counter.
#[async_trait::async_trait]
pub trait StockLedger: Send + Sync {
    /// Full catalog record (`findProduct`).
    async fn find_product(&self, product_id: ProductId) -> Result<Product, StockError>;

    /// Units currently purchasable (`getAvailableQuantity`).
    async fn available_quantity(&self, product_id: ProductId) -> Result<i64, StockError> {
        Ok(self.find_product(product_id).await?.quantity)
    }

    /// Atomic decrement-if-sufficient for one product; returns remaining stock.
    ///
    /// On shortfall nothing changes and `Insufficient` reports the current figure.
    async fn decrement(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError>;

    /// All-or-nothing decrement across several products.
    ///
    /// Either every entry is applied or none is; availability is re-checked at
    /// commit time rather than trusted from an earlier read.
    async fn commit_decrements(&self, decrements: &[StockDecrement]) -> Result<(), StockError>;

    /// Add units back (external restock, or compensation of a decrement this
    /// caller made itself). Returns the new stock figure.
    async fn restock(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError>;
}

#[async_trait::async_trait]
impl<S> StockLedger for Arc<S>
where
    S: StockLedger + ?Sized,
{
    async fn find_product(&self, product_id: ProductId) -> Result<Product, StockError> {
        (**self).find_product(product_id).await
    }

    async fn available_quantity(&self, product_id: ProductId) -> Result<i64, StockError> {
        (**self).available_quantity(product_id).await
    }

    async fn decrement(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        (**self).decrement(product_id, amount).await
    }

    async fn commit_decrements(&self, decrements: &[StockDecrement]) -> Result<(), StockError> {
        (**self).commit_decrements(decrements).await
    }

    async fn restock(&self, product_id: ProductId, amount: i64) -> Result<i64, StockError> {
        (**self).restock(product_id, amount).await
    }
}

/// Merge entries for the same product so each counter is checked once.
pub fn merge_decrements(decrements: &[StockDecrement]) -> Vec<StockDecrement> {
    let mut merged: Vec<StockDecrement> = Vec::with_capacity(decrements.len());
    for d in decrements {
        match merged.iter_mut().find(|m| m.product_id == d.product_id) {
            Some(existing) => existing.amount = existing.amount.saturating_add(d.amount),
            None => merged.push(*d),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_combines_entries_for_same_product_preserving_order() {
        let a = ProductId::new();
        let b = ProductId::new();
        let merged = merge_decrements(&[
            StockDecrement { product_id: a, amount: 2 },
            StockDecrement { product_id: b, amount: 1 },
            StockDecrement { product_id: a, amount: 3 },
        ]);
        assert_eq!(
            merged,
            vec![
                StockDecrement { product_id: a, amount: 5 },
                StockDecrement { product_id: b, amount: 1 },
            ]
        );
    }

    #[test]
    fn backend_failures_have_no_domain_meaning() {
        assert_eq!(StockError::Backend("down".into()).to_domain(), None);
        let id = ProductId::new();
        assert_eq!(
            StockError::NotFound(id).to_domain(),
            Some(DomainError::not_found(format!("product {id}")))
        );
    }
}
