use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, DomainResult, Entity, Money, ProductId};

const MAX_DESCRIPTION_LEN: usize = 500;

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Chocolate,
    Candy,
    Gummy,
    Lollipop,
    Marshmallow,
    HardCandy,
    SourCandy,
    Gum,
    Mints,
    Licorice,
    Caramel,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Chocolate => "chocolate",
            Category::Candy => "candy",
            Category::Gummy => "gummy",
            Category::Lollipop => "lollipop",
            Category::Marshmallow => "marshmallow",
            Category::HardCandy => "hard-candy",
            Category::SourCandy => "sour-candy",
            Category::Gum => "gum",
            Category::Mints => "mints",
            Category::Licorice => "licorice",
            Category::Caramel => "caramel",
            Category::Other => "other",
        }
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let category = match s {
            "chocolate" => Category::Chocolate,
            "candy" => Category::Candy,
            "gummy" => Category::Gummy,
            "lollipop" => Category::Lollipop,
            "marshmallow" => Category::Marshmallow,
            "hard-candy" => Category::HardCandy,
            "sour-candy" => Category::SourCandy,
            "gum" => Category::Gum,
            "mints" => Category::Mints,
            "licorice" => Category::Licorice,
            "caramel" => Category::Caramel,
            "other" => Category::Other,
            other => {
                return Err(DomainError::invalid_input(format!(
                    "unknown category '{other}'"
                )));
            }
        };
        Ok(category)
    }
}

/// Catalog product as seen by the cart core.
///
/// `quantity` is the Stock Ledger entry: units currently purchasable, never
/// negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    pub price: Money,
    pub quantity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        category: Category,
        price: Money,
        quantity: i64,
    ) -> DomainResult<Self> {
        let product = Self {
            id,
            name: name.into().trim().to_string(),
            category,
            price,
            quantity,
            description: None,
            image_url: None,
            updated_at: Utc::now(),
        };
        product.validate()?;
        Ok(product)
    }

    /// Field rules shared by seeding and persistence.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::invalid_input("product name cannot be empty"));
        }
        if self.quantity < 0 {
            return Err(DomainError::invalid_input("quantity cannot be negative"));
        }
        // Re-run the Money constructor check for values that came from serde.
        Money::new(self.price.amount())?;
        if let Some(description) = &self.description {
            if description.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(DomainError::invalid_input(format!(
                    "description cannot exceed {MAX_DESCRIPTION_LEN} characters"
                )));
            }
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn price(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount).unwrap()
    }

    #[test]
    fn new_trims_name_and_accepts_valid_fields() {
        let p = Product::new(ProductId::new(), "  Fudge  ", Category::Caramel, price(dec!(4.50)), 12)
            .unwrap();
        assert_eq!(p.name, "Fudge");
        assert_eq!(p.quantity, 12);
    }

    #[test]
    fn rejects_empty_name_and_negative_quantity() {
        assert!(Product::new(ProductId::new(), "   ", Category::Gum, price(dec!(1)), 1).is_err());
        assert!(Product::new(ProductId::new(), "Gum", Category::Gum, price(dec!(1)), -1).is_err());
    }

    #[test]
    fn rejects_overlong_description() {
        let mut p =
            Product::new(ProductId::new(), "Mint", Category::Mints, price(dec!(0.99)), 3).unwrap();
        p.description = Some("x".repeat(501));
        let err = p.validate().unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn category_uses_kebab_case_on_the_wire() {
        let json = serde_json::to_string(&Category::HardCandy).unwrap();
        assert_eq!(json, "\"hard-candy\"");
        assert_eq!("sour-candy".parse::<Category>().unwrap(), Category::SourCandy);
        assert!("broccoli".parse::<Category>().is_err());
    }

    #[test]
    fn seed_json_deserializes_with_defaults() {
        let raw = r#"{
            "id": "0190a4d2-7c1e-7000-8000-000000000001",
            "name": "Sour Worms",
            "category": "sour-candy",
            "price": 3.25,
            "quantity": 40
        }"#;
        let p: Product = serde_json::from_str(raw).unwrap();
        assert_eq!(p.price.amount(), dec!(3.25));
        assert_eq!(p.description, None);
        p.validate().unwrap();
    }
}
