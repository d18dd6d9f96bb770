//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Locate an entity by identity inside an owned collection.
pub fn find_entity<'a, E: Entity>(items: &'a [E], id: &E::Id) -> Option<&'a E> {
    items.iter().find(|e| e.id() == id)
}

/// Mutable variant of [`find_entity`].
pub fn find_entity_mut<'a, E: Entity>(items: &'a mut [E], id: &E::Id) -> Option<&'a mut E> {
    items.iter_mut().find(|e| e.id() == id)
}
