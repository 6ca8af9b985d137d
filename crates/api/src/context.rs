use std::net::SocketAddr;

use axum::http::HeaderMap;

use warden_auth::{AuthenticatedIdentity, IdentityKey, RoleName};
use warden_events::ClientInfo;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the authentication gate and passed explicitly to handlers; the
/// token's role claims are authoritative for the rest of the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    identity: AuthenticatedIdentity,
}

impl PrincipalContext {
    pub fn new(identity: AuthenticatedIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &AuthenticatedIdentity {
        &self.identity
    }

    pub fn subject(&self) -> &IdentityKey {
        self.identity.subject()
    }

    pub fn roles(&self) -> &[RoleName] {
        self.identity.roles()
    }
}

/// Caller metadata for account events.
///
/// The first `X-Forwarded-For` hop wins over the socket peer address.
pub fn client_info(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientInfo {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClientInfo {
        ip_address: forwarded.or_else(|| peer.map(|addr| addr.ip().to_string())),
        user_agent,
    }
}
