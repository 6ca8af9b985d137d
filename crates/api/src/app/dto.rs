use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_auth::RoleRecord;
use warden_core::RoleId;
use warden_infra::{LoginOutcome, UserProfile};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

pub use warden_infra::{LoginRequest, RegisterUser as RegisterRequest};

/// Unwrap a JSON body, turning extractor rejections into an error envelope.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, axum::response::Response> {
    payload.map(|Json(value)| value).map_err(errors::invalid_body)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignRolesRequest {
    pub role_ids: Vec<RoleId>,
}

// -------------------------
// Response DTOs
// -------------------------

/// Envelope around every successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

pub fn respond<T: Serialize>(
    status: StatusCode,
    message: impl Into<String>,
    data: T,
) -> axum::response::Response {
    (status, axum::Json(ApiResponse::ok(message, data))).into_response()
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            token: outcome.token.token,
            token_type: "Bearer",
            expires_at: outcome.token.expires_at,
            user: outcome.user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleResponse {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RoleRecord> for RoleResponse {
    fn from(record: RoleRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.as_str().to_string(),
            description: record.description,
            created_at: record.created_at,
        }
    }
}
