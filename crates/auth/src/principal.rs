use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::UserId;

use crate::RoleName;

/// Stable unique lookup key of an identity (normalized email).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Normalize a raw email into its lookup key (trimmed, lowercase).
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolved representation of "who is making this request", with current roles.
///
/// Immutable once built; any role change produces a new `Principal` through the
/// resolver rather than mutating a cached one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    user_id: UserId,
    identity_key: IdentityKey,
    username: String,
    display_name: String,
    roles: BTreeSet<RoleName>,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
    issued_at: DateTime<Utc>,
}

impl Principal {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: UserId,
        identity_key: IdentityKey,
        username: impl Into<String>,
        display_name: impl Into<String>,
        roles: impl IntoIterator<Item = RoleName>,
        created_at: DateTime<Utc>,
        last_login_at: Option<DateTime<Utc>>,
        issued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            identity_key,
            username: username.into(),
            display_name: display_name.into(),
            roles: roles.into_iter().collect(),
            created_at,
            last_login_at,
            issued_at,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn identity_key(&self) -> &IdentityKey {
        &self.identity_key
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn roles(&self) -> &BTreeSet<RoleName> {
        &self.roles
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    /// When this principal snapshot was built.
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn has_role(&self, role: &RoleName) -> bool {
        self.roles.contains(role)
    }
}

/// Request-scoped authenticated identity established by the authentication gate.
///
/// The role claims come from the validated token and are authoritative for the
/// rest of that request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    subject: IdentityKey,
    roles: Vec<RoleName>,
}

impl AuthenticatedIdentity {
    pub fn new(subject: IdentityKey, roles: Vec<RoleName>) -> Self {
        Self { subject, roles }
    }

    pub fn subject(&self) -> &IdentityKey {
        &self.subject
    }

    pub fn roles(&self) -> &[RoleName] {
        &self.roles
    }

    pub fn has_role(&self, role: &RoleName) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl From<crate::Claims> for AuthenticatedIdentity {
    fn from(claims: crate::Claims) -> Self {
        Self::new(claims.subject, claims.roles)
    }
}
