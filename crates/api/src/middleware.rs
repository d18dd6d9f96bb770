use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use sweetshop_core::UserId;

use crate::app::errors::json_error;
use crate::context::UserContext;

/// Header carrying the authenticated user's id.
///
/// Set by the gateway after authentication; this service trusts it as-is.
pub const USER_ID_HEADER: &str = "x-user-id";

pub async fn identity_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let user_id = extract_user_id(req.headers()).ok_or_else(|| {
        json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "User not authenticated",
        )
    })?;

    req.extensions_mut().insert(UserContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user_id(headers: &HeaderMap) -> Option<UserId> {
    let raw = headers.get(USER_ID_HEADER)?.to_str().ok()?.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}
