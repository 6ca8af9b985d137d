//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: account service and its collaborators
//! - `routes/`: HTTP handlers, one file per area
//! - `dto.rs`: request/response DTOs and the response envelope
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Router over already-wired services (public entrypoint used by `main.rs`).
pub fn build_app_with(services: Arc<services::AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        tokens: services.accounts.tokens().clone(),
        clock: services.accounts.clock().clone(),
    };

    // Everything here requires a valid bearer token; role guards sit on the
    // individual route groups.
    let protected = routes::protected_router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(Extension(services))
}
