//! Role guards for protected operations.
//!
//! Each guarded route group declares its required roles as an
//! [`OperationPolicy`] and is wrapped with [`enforce_policy`]. The policy runs
//! after the authentication gate and before the handler.

use axum::{extract::State, middleware::Next, response::Response};
use tracing::{debug, warn};

use warden_auth::{AuthzError, OperationPolicy};

use crate::app::errors;
use crate::context::PrincipalContext;

pub static MANAGE_ROLES: OperationPolicy = OperationPolicy::new("roles.manage", &["ADMIN"]);

pub static VIEW_ADMIN_STATS: OperationPolicy = OperationPolicy::new("admin.stats", &["ADMIN"]);

pub static MANAGE_CACHE: OperationPolicy = OperationPolicy::new("admin.cache", &["ADMIN"]);

pub async fn enforce_policy(
    State(policy): State<&'static OperationPolicy>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let (decision, subject) = {
        let principal = req.extensions().get::<PrincipalContext>();
        (
            policy.authorize(principal.map(PrincipalContext::identity)),
            principal.map(|p| p.subject().to_string()),
        )
    };

    match decision {
        Ok(()) => {
            debug!(operation = policy.operation, subject = ?subject, "operation authorized");
            next.run(req).await
        }
        Err(AuthzError::Unauthenticated) => errors::unauthenticated(),
        Err(err @ AuthzError::InsufficientRole(_)) => {
            warn!(operation = policy.operation, subject = ?subject, error = %err, "operation denied");
            errors::forbidden()
        }
    }
}
