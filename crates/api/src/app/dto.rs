use serde::{Deserialize, Serialize};

use sweetshop_cart::{Cart, CartSummary};
use sweetshop_infra::CartView;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    #[serde(alias = "sweetId")]
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CartResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub cart: Cart,
    pub summary: CartSummary,
}

impl CartResponse {
    pub fn new(view: CartView) -> Self {
        Self {
            message: None,
            cart: view.cart,
            summary: view.summary,
        }
    }

    pub fn with_message(message: &'static str, view: CartView) -> Self {
        Self {
            message: Some(message),
            ..Self::new(view)
        }
    }
}
