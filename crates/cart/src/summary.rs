use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sweetshop_core::{TaxRate, round_money};

use crate::cart::{Cart, CartLineItem};

/// Derived cart totals. Never persisted.
///
/// Tax is charged on the unrounded subtotal and the total is rounded from the
/// unrounded parts; each figure is rounded once, half away from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub item_count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl CartSummary {
    /// All-zero summary, used for a cart that is known to be empty.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn of(cart: &Cart, tax_rate: TaxRate) -> Self {
        Self::of_lines(cart.items(), tax_rate)
    }

    /// Summary of `lines`. Figures that would leave the decimal range saturate;
    /// the cart aggregate refuses changes that get there.
    pub fn of_lines(lines: &[CartLineItem], tax_rate: TaxRate) -> Self {
        Self::checked_of_lines(lines, tax_rate).unwrap_or_else(|| {
            let item_count = lines.iter().fold(0i64, |n, l| n.saturating_add(l.quantity));
            Self {
                item_count,
                subtotal: Decimal::MAX,
                tax: Decimal::MAX,
                total: Decimal::MAX,
            }
        })
    }

    /// `None` if any figure overflows.
    pub fn checked_of_lines(lines: &[CartLineItem], tax_rate: TaxRate) -> Option<Self> {
        let mut item_count: i64 = 0;
        let mut subtotal = Decimal::ZERO;
        for line in lines {
            item_count = item_count.checked_add(line.quantity)?;
            subtotal = subtotal.checked_add(line.line_total()?)?;
        }
        let tax = tax_rate.tax_on(subtotal)?;
        let total = subtotal.checked_add(tax)?;

        Some(Self {
            item_count,
            subtotal: round_money(subtotal),
            tax: round_money(tax),
            total: round_money(total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sweetshop_core::{LineItemId, Money, ProductId};

    fn line(price: Decimal, quantity: i64) -> CartLineItem {
        CartLineItem {
            id: LineItemId::new(),
            product_id: ProductId::new(),
            quantity,
            price_at_time: Money::new(price).unwrap(),
        }
    }

    #[test]
    fn two_at_ten_ninety_nine_with_eighteen_percent_tax() {
        let summary = CartSummary::of_lines(&[line(dec!(10.99), 2)], TaxRate::DEFAULT);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.subtotal, dec!(21.98));
        assert_eq!(summary.tax, dec!(3.96));
        assert_eq!(summary.total, dec!(25.94));
    }

    #[test]
    fn empty_cart_summarizes_to_zero() {
        let cart = Cart::open(sweetshop_core::CartId::new(), sweetshop_core::UserId::new(), Utc::now());
        assert_eq!(CartSummary::of(&cart, TaxRate::DEFAULT), CartSummary::zero());
    }

    #[test]
    fn total_is_rounded_from_unrounded_parts() {
        // subtotal 0.25, tax 0.045 -> rounds to 0.05; total 0.295 -> 0.30.
        let rate = TaxRate::new(dec!(0.18)).unwrap();
        let summary = CartSummary::of_lines(&[line(dec!(0.25), 1)], rate);
        assert_eq!(summary.tax, dec!(0.05));
        assert_eq!(summary.total, dec!(0.30));
    }

    #[test]
    fn totals_past_decimal_range_do_not_panic() {
        let lines = [line(dec!(9999999999.99), 9_000_000_000_000_000_000)];
        assert_eq!(CartSummary::checked_of_lines(&lines, TaxRate::DEFAULT), None);

        let summary = CartSummary::of_lines(&lines, TaxRate::DEFAULT);
        assert_eq!(summary.item_count, 9_000_000_000_000_000_000);
        assert_eq!(summary.total, Decimal::MAX);
    }

    #[test]
    fn serializes_monetary_figures_as_numbers() {
        let summary = CartSummary::of_lines(&[line(dec!(10.99), 2)], TaxRate::DEFAULT);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["itemCount"], 2);
        assert_eq!(json["subtotal"], serde_json::json!(21.98));
        assert_eq!(json["total"], serde_json::json!(25.94));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 500,
                ..ProptestConfig::default()
            })]

            /// Property: item count is the sum of line quantities and the
            /// subtotal is the rounded sum of snapshot × quantity.
            #[test]
            fn summary_is_derived_from_lines(
                raw in prop::collection::vec((0u64..100_000, 1i64..50), 0..12)
            ) {
                let lines: Vec<CartLineItem> = raw
                    .iter()
                    .map(|(cents, qty)| line(Decimal::from(*cents) / Decimal::ONE_HUNDRED, *qty))
                    .collect();
                let summary = CartSummary::of_lines(&lines, TaxRate::DEFAULT);

                let expected_count: i64 = lines.iter().map(|l| l.quantity).sum();
                let expected_subtotal: Decimal = lines
                    .iter()
                    .map(|l| l.price_at_time.amount() * Decimal::from(l.quantity))
                    .sum();

                prop_assert_eq!(summary.item_count, expected_count);
                prop_assert_eq!(summary.subtotal, round_money(expected_subtotal));
                prop_assert!(summary.total >= summary.subtotal);
            }
        }
    }
}
