//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**: two `Money`
/// amounts of `10.99` are the same thing, whereas two line items with equal
/// quantities are still different lines (those are entities).
///
/// To "modify" a value object, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
