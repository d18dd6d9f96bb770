//! Cart domain module.
//!
//! This crate contains the business rules for a shopper's cart, implemented
//! purely as deterministic domain logic with no IO. Stock
//! figures and catalog prices reach the aggregate inside commands.

pub mod cart;
pub mod policy;
pub mod summary;

pub use cart::{
    AddItem, Cart, CartCleared, CartCommand, CartCompleted, CartEvent, CartLineItem, CartStatus,
    ClearCart, CompleteCart, ItemAdded, ItemQuantityChanged, ItemRemoved, RemoveItem,
    UpdateItemQuantity,
};
pub use policy::PriceSnapshotPolicy;
pub use summary::CartSummary;
