use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};

use sweetshop_core::{LineItemId, ProductId};

use crate::app::dto::{self, CartResponse};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::UserContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/:item_id", put(update_item).delete(remove_item))
        .route("/checkout", post(checkout))
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.cart.get_cart(user.user_id()).await {
        Ok(view) => (StatusCode::OK, Json(CartResponse::new(view))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    body: Result<Json<dto::AddItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_input(e.body_text()),
    };
    let product_id: ProductId = match body.product_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_input("invalid product id"),
    };

    match services
        .cart
        .add_item(user.user_id(), product_id, body.quantity)
        .await
    {
        Ok(view) => (
            StatusCode::OK,
            Json(CartResponse::with_message("Item added to cart successfully", view)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(item_id): Path<String>,
    body: Result<Json<dto::UpdateItemRequest>, JsonRejection>,
) -> axum::response::Response {
    let line_item_id: LineItemId = match item_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_input("invalid cart item id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::invalid_input(e.body_text()),
    };

    match services
        .cart
        .update_item(user.user_id(), line_item_id, body.quantity)
        .await
    {
        Ok(view) => (
            StatusCode::OK,
            Json(CartResponse::with_message("Cart item updated successfully", view)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn remove_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
    Path(item_id): Path<String>,
) -> axum::response::Response {
    let line_item_id: LineItemId = match item_id.parse() {
        Ok(v) => v,
        Err(_) => return errors::invalid_input("invalid cart item id"),
    };

    match services.cart.remove_item(user.user_id(), line_item_id).await {
        Ok(view) => (
            StatusCode::OK,
            Json(CartResponse::with_message("Item removed from cart successfully", view)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn clear_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.cart.clear_cart(user.user_id()).await {
        Ok(view) => (
            StatusCode::OK,
            Json(CartResponse::with_message("Cart cleared successfully", view)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn checkout(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(user): Extension<UserContext>,
) -> axum::response::Response {
    match services.cart.checkout(user.user_id()).await {
        Ok(view) => (
            StatusCode::OK,
            Json(CartResponse::with_message("Checkout successful! Order placed.", view)),
        )
            .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
