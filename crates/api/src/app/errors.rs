use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::{debug, error};

use warden_infra::AccountError;

/// Single outward shape for every authentication failure.
const UNAUTHENTICATED_MESSAGE: &str = "Authentication required";

pub fn account_error_to_response(err: AccountError) -> axum::response::Response {
    match err {
        AccountError::InvalidCredentials => {
            json_error(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
        }
        AccountError::PrincipalNotFound => unauthenticated(),
        AccountError::UserAlreadyExists(msg) => json_error(StatusCode::CONFLICT, "user_already_exists", msg),
        AccountError::RoleAlreadyExists(_) => {
            json_error(StatusCode::CONFLICT, "role_already_exists", err.to_string())
        }
        AccountError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        AccountError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AccountError::Credential(_) | AccountError::Token(_) | AccountError::Store(_) => {
            error!(error = %err, "account operation failed");
            internal()
        }
    }
}

pub fn unauthenticated() -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthenticated", UNAUTHENTICATED_MESSAGE)
}

pub fn forbidden() -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "Access denied")
}

pub fn internal() -> axum::response::Response {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "Internal server error")
}

/// Malformed or mistyped JSON body, in the same envelope as every other error.
pub fn invalid_body(rejection: JsonRejection) -> axum::response::Response {
    let detail = rejection.body_text();
    debug!(error = %detail, "request body rejected");
    json_error(rejection.status(), "invalid_request_body", detail)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "success": false,
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
