use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};

use warden_core::UserId;

use crate::app::dto::{self, AssignRolesRequest, CreateRoleRequest, RoleResponse};
use crate::app::errors;
use crate::app::services::{self, AppServices};
use crate::authz::{self, MANAGE_ROLES};

pub fn router() -> Router {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/users/:user_id/roles", post(assign_roles))
        .route_layer(axum::middleware::from_fn_with_state(&MANAGE_ROLES, authz::enforce_policy))
}

/// GET /roles
pub async fn list_roles(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services::run_blocking(&services, |s| s.accounts.list_roles()).await {
        Ok(roles) => {
            let roles: Vec<RoleResponse> = roles.into_iter().map(RoleResponse::from).collect();
            dto::respond(StatusCode::OK, "Roles retrieved", roles)
        }
        Err(res) => res,
    }
}

/// POST /roles
pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> axum::response::Response {
    let req = match dto::body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };

    match services::run_blocking(&services, move |s| s.accounts.create_role(&req.name, req.description)).await {
        Ok(role) => dto::respond(StatusCode::CREATED, "Role created successfully", RoleResponse::from(role)),
        Err(res) => res,
    }
}

/// POST /roles/users/:user_id/roles
pub async fn assign_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<String>,
    payload: Result<Json<AssignRolesRequest>, JsonRejection>,
) -> axum::response::Response {
    let user_id: UserId = match user_id.parse() {
        Ok(id) => id,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_user_id", "invalid user id"),
    };
    let req = match dto::body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };

    match services::run_blocking(&services, move |s| s.accounts.assign_roles(user_id, &req.role_ids)).await {
        Ok(profile) => dto::respond(StatusCode::OK, "Roles assigned successfully", profile),
        Err(res) => res,
    }
}
