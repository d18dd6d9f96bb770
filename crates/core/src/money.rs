//! Monetary amounts and the cent-boundary rounding rule.
//!
//! Amounts are exact decimals. Intermediate sums are kept unrounded; only the
//! figures that are shown or charged go through [`round_money`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Round to 2 decimal places, half away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Non-negative monetary amount (unit price, price snapshot, summary figure).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Validate and wrap an amount; prices cannot be negative.
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::invalid_input("price cannot be negative"));
        }
        Ok(Self(amount))
    }

    /// Amount expressed in the smallest currency unit (e.g. cents).
    pub fn from_cents(cents: u64) -> Self {
        Self(Decimal::from(cents) / Decimal::ONE_HUNDRED)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Unrounded `self × quantity`, or `None` past the decimal range.
    pub fn checked_times(&self, quantity: i64) -> Option<Decimal> {
        self.0.checked_mul(Decimal::from(quantity))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:.2}", round_money(self.0))
    }
}

/// Sales-tax rate as a fraction (`0.18` = 18%).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxRate(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl ValueObject for TaxRate {}

impl TaxRate {
    /// 18% GST.
    pub const DEFAULT: TaxRate = TaxRate(Decimal::from_parts(18, 0, 0, false, 2));

    /// Highest accepted rate (100%).
    pub const MAX: TaxRate = TaxRate(Decimal::ONE);

    pub fn new(rate: Decimal) -> DomainResult<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(DomainError::invalid_input(format!(
                "tax rate must be within 0..=1, got {rate}"
            )));
        }
        Ok(Self(rate))
    }

    pub fn rate(&self) -> Decimal {
        self.0
    }

    /// Unrounded tax owed on `amount`, or `None` past the decimal range.
    pub fn tax_on(&self, amount: Decimal) -> Option<Decimal> {
        amount.checked_mul(self.0)
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        Self::DEFAULT
    }
}
