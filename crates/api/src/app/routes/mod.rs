use axum::{
    Router,
    routing::{get, post},
};

pub mod admin;
pub mod roles;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
}

/// Endpoints behind the authentication gate.
pub fn protected_router() -> Router {
    Router::new()
        .route("/users/me", get(users::me))
        .merge(roles::router())
        .merge(admin::router())
}
