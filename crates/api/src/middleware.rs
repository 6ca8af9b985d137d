//! Authentication gate.
//!
//! Per request: `NoCredential -> TokenExtracted -> Validated` or `Rejected`.
//! Every rejection produces the same 401 body; the reason only reaches the logs.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use warden_auth::{AuthenticatedIdentity, TokenCodec, TokenError};
use warden_core::Clock;

use crate::app::errors;
use crate::context::PrincipalContext;

const BEARER_PREFIX: &str = "Bearer ";

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<dyn TokenCodec>,
    pub clock: Arc<dyn Clock>,
}

/// Why a request was turned away. Logged, never returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoCredential,
    Malformed,
    SignatureInvalid,
    Expired,
}

impl From<TokenError> for Rejection {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Malformed => Rejection::Malformed,
            TokenError::SignatureInvalid => Rejection::SignatureInvalid,
            TokenError::Expired => Rejection::Expired,
        }
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    match authenticate(&state, req.headers()) {
        Ok(identity) => {
            debug!(subject = %identity.subject(), path = %req.uri().path(), "request authenticated");
            req.extensions_mut().insert(PrincipalContext::new(identity));
            next.run(req).await
        }
        Err(reason) => {
            let path = req.uri().path();
            match reason {
                Rejection::NoCredential => debug!(?reason, path, "request rejected"),
                _ => warn!(?reason, path, "request rejected"),
            }
            errors::unauthenticated()
        }
    }
}

/// Run the gate against `headers` without touching the request.
pub fn authenticate(state: &AuthState, headers: &HeaderMap) -> Result<AuthenticatedIdentity, Rejection> {
    let token = extract_bearer(headers)?;
    let claims = state.tokens.validate(token, state.clock.now())?;
    Ok(claims.into())
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Rejection> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(Rejection::NoCredential)?;

    let header = header.to_str().map_err(|_| Rejection::NoCredential)?;

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(Rejection::NoCredential)?
        .trim();

    if token.is_empty() {
        return Err(Rejection::NoCredential);
    }

    Ok(token)
}
