use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, Money};

/// How a line's `price_at_time` reacts when its quantity goes up.
///
/// `Locked` keeps the snapshot taken when the line was created, so a shopper's
/// price survives catalog changes for as long as the line exists.
/// `RefreshOnIncrease` re-reads the catalog price whenever the quantity of an
/// existing line is raised (by a repeated add or an upward update).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceSnapshotPolicy {
    #[default]
    Locked,
    RefreshOnIncrease,
}

impl PriceSnapshotPolicy {
    /// Snapshot to keep after a quantity change from `old_quantity` to `new_quantity`.
    pub fn snapshot_after_change(
        self,
        snapshot: Money,
        current_price: Money,
        old_quantity: i64,
        new_quantity: i64,
    ) -> Money {
        match self {
            PriceSnapshotPolicy::RefreshOnIncrease if new_quantity > old_quantity => current_price,
            _ => snapshot,
        }
    }
}

impl core::str::FromStr for PriceSnapshotPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "locked" => Ok(PriceSnapshotPolicy::Locked),
            "refresh-on-increase" | "refresh" => Ok(PriceSnapshotPolicy::RefreshOnIncrease),
            other => Err(DomainError::invalid_input(format!(
                "unknown price snapshot policy '{other}' (expected: locked, refresh-on-increase)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn locked_never_refreshes() {
        let old = Money::new(dec!(2.00)).unwrap();
        let new = Money::new(dec!(2.50)).unwrap();
        assert_eq!(
            PriceSnapshotPolicy::Locked.snapshot_after_change(old, new, 1, 5),
            old
        );
    }

    #[test]
    fn refresh_only_applies_on_increase() {
        let old = Money::new(dec!(2.00)).unwrap();
        let new = Money::new(dec!(2.50)).unwrap();
        let policy = PriceSnapshotPolicy::RefreshOnIncrease;
        assert_eq!(policy.snapshot_after_change(old, new, 1, 5), new);
        assert_eq!(policy.snapshot_after_change(old, new, 5, 2), old);
        assert_eq!(policy.snapshot_after_change(old, new, 3, 3), old);
    }

    #[test]
    fn parses_configuration_spelling() {
        assert_eq!(
            "Refresh-On-Increase".parse::<PriceSnapshotPolicy>().unwrap(),
            PriceSnapshotPolicy::RefreshOnIncrease
        );
        assert!("sometimes".parse::<PriceSnapshotPolicy>().is_err());
    }
}
