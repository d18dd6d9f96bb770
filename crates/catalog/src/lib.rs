//! Catalog collaborator boundary.
//!
//! The cart core never owns products. It reads name, price and available
//! quantity through [`StockLedger`], and only the checkout commit path writes
//! stock back through the same trait.

pub mod ledger;
pub mod product;

pub use ledger::{StockDecrement, StockError, StockLedger, merge_decrements};
pub use product::{Category, Product};
