//! Aggregate root trait and optimistic-concurrency expectations.

/// Aggregate root marker + minimal interface.
///
/// Carts are persisted as snapshots, not event streams, but every accepted
/// mutation still bumps `version()` so stores can reject stale writes.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing revision (+1 per applied event).
    fn version(&self) -> u64;
}

/// Optimistic concurrency expectation for a stored aggregate.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExpectedVersion {
    /// Skip version checking (first insert, administrative repair).
    Any,
    /// Require the stored record to be at an exact revision.
    Exact(u64),
}

impl ExpectedVersion {
    /// Expectation matching the revision an aggregate was loaded at.
    pub fn of<A: AggregateRoot>(aggregate: &A) -> Self {
        ExpectedVersion::Exact(aggregate.version())
    }

    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }

}

/// Aggregate execution semantics (pure, deterministic).
///
/// - **Decision logic**: `handle(&self, cmd)` returns events.
/// - **State mutation**: `apply(&mut self, event)` evolves state.
///
/// Anything the decision needs from the outside world (available stock,
/// current catalog price) travels inside the command, so `handle` never does IO.
pub trait Aggregate: AggregateRoot {
    type Command: Clone + core::fmt::Debug;
    type Event: Clone + core::fmt::Debug;
    type Error: core::fmt::Debug;

    /// Evolve in-memory state from a single event.
    fn apply(&mut self, event: &Self::Event);

    /// Decide which events to emit given the current state and a command.
    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// `handle` followed by `apply` of every decided event.
    ///
    /// Returns the applied events so callers can log or publish them.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle(command)?;
        for event in &events {
            self.apply(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_every_revision() {
        assert!(ExpectedVersion::Any.matches(0));
        assert!(ExpectedVersion::Any.matches(42));
    }

    #[test]
    fn exact_only_matches_its_own_revision() {
        assert!(ExpectedVersion::Exact(3).matches(3));
        assert!(!ExpectedVersion::Exact(3).matches(4));
    }
}
