use std::sync::Arc;

use axum::{
    Router,
    extract::Extension,
    http::StatusCode,
    routing::{delete, get},
};
use serde_json::json;

use warden_core::Clock;

use crate::app::dto;
use crate::app::services::{self, AppServices};
use crate::authz::{self, MANAGE_CACHE, VIEW_ADMIN_STATS};

pub fn router() -> Router {
    let stats = Router::new()
        .route("/admin/stats", get(stats))
        .route_layer(axum::middleware::from_fn_with_state(&VIEW_ADMIN_STATS, authz::enforce_policy));

    let cache = Router::new()
        .route("/admin/cache", delete(clear_cache))
        .route_layer(axum::middleware::from_fn_with_state(&MANAGE_CACHE, authz::enforce_policy));

    stats.merge(cache)
}

/// GET /admin/stats
pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let now = services.accounts.clock().now();
    match services::run_blocking(&services, move |s| s.accounts.admin_stats(now)).await {
        Ok(stats) => dto::respond(StatusCode::OK, "Admin statistics retrieved", stats),
        Err(res) => res,
    }
}

/// DELETE /admin/cache
pub async fn clear_cache(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    services.accounts.evict_all_principals();
    dto::respond(
        StatusCode::OK,
        "Principal cache cleared",
        json!({ "namespace": services.accounts.cache_namespace() }),
    )
}
