use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{ConnectInfo, Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};

use warden_infra::UserProfile;

use crate::app::dto::{self, LoginRequest, LoginResponse, RegisterRequest};
use crate::app::services::{self, AppServices};
use crate::context::{self, PrincipalContext};

/// POST /users/register
pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> axum::response::Response {
    let req = match dto::body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let client = context::client_info(&headers, peer.map(|ConnectInfo(addr)| addr));

    match services::run_blocking(&services, move |s| s.accounts.register(req, client)).await {
        Ok(profile) => dto::respond(StatusCode::CREATED, "User registered successfully", profile),
        Err(res) => res,
    }
}

/// POST /users/login
pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> axum::response::Response {
    let req = match dto::body(payload) {
        Ok(req) => req,
        Err(res) => return res,
    };
    let client = context::client_info(&headers, peer.map(|ConnectInfo(addr)| addr));

    match services::run_blocking(&services, move |s| s.accounts.login(req, client)).await {
        Ok(outcome) => dto::respond(StatusCode::OK, "Login successful", LoginResponse::from(outcome)),
        Err(res) => res,
    }
}

/// GET /users/me
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    let subject = principal.subject().clone();

    match services::run_blocking(&services, move |s| s.accounts.current_principal(&subject)).await {
        Ok(current) => dto::respond(
            StatusCode::OK,
            "Current user retrieved",
            UserProfile::from_principal(&current),
        ),
        Err(res) => res,
    }
}
