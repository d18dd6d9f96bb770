//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/ledger selection and the shared `CartService`
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, body::Body, http::Request, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<services::AppServices>) -> Router {
    // Cart routes: require the caller's identity.
    let protected = Router::new()
        .nest("/api/cart", routes::cart::router())
        .layer(Extension(services))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new().layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                info_span!("http", method = %request.method(), path = %request.uri().path())
            }),
        ))
}
