//! Domain error model.

use thiserror::Error;

use crate::id::ProductId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// stock shortfalls, lifecycle rules). Storage concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Out-of-range or malformed caller input (e.g. quantity < 1).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identifier failed to parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced cart, line item or product does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Requested (or cumulative) quantity exceeds available stock.
    #[error("insufficient stock for {product_name}: only {available} available")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i64,
    },

    /// Checkout attempted on a cart with no line items.
    #[error("cart is empty")]
    EmptyCart,

    /// A lifecycle rule was violated (e.g. mutating a completed cart).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Stale revision / concurrent modification.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn insufficient_stock(
        product_id: ProductId,
        product_name: impl Into<String>,
        available: i64,
    ) -> Self {
        Self::InsufficientStock {
            product_id,
            product_name: product_name.into(),
            available,
        }
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_names_product_and_available_quantity() {
        let err = DomainError::insufficient_stock(ProductId::new(), "Dark Truffle", 3);
        assert_eq!(
            err.to_string(),
            "insufficient stock for Dark Truffle: only 3 available"
        );
    }
}
