//! `sweetshop-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the domain error model, money arithmetic and the small trait
//! vocabulary (aggregates, entities, events, value objects) shared by the
//! catalog and cart crates.

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod event;
pub mod id;
pub mod money;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use entity::{Entity, find_entity, find_entity_mut};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{CartId, LineItemId, ProductId, UserId};
pub use money::{Money, TaxRate, round_money};
pub use value_object::ValueObject;
