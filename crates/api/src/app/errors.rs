use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use sweetshop_infra::CartServiceError;

pub fn service_error_to_response(err: CartServiceError) -> axum::response::Response {
    let status = match &err {
        CartServiceError::InvalidInput(_)
        | CartServiceError::InsufficientStock { .. }
        | CartServiceError::EmptyCart => StatusCode::BAD_REQUEST,
        CartServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        CartServiceError::Conflict(_) => StatusCode::CONFLICT,
        CartServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "request failed");
        return json_error(status, err.kind(), "internal server error");
    }
    json_error(status, err.kind(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn invalid_input(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_input", message)
}
