//! Principal resolution: identity key → current user record + role set.
//!
//! Separate from token validation on purpose: a token proves who claims to be
//! speaking, the resolver supplies the *current* role assignment.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use warden_core::Clock;

use crate::{DirectoryError, IdentityKey, Principal, RoleDirectory, UserDirectory};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("principal not found")]
    NotFound,

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// Builds a `Principal` from the external directories.
#[derive(Clone)]
pub struct PrincipalResolver {
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleDirectory>,
    clock: Arc<dyn Clock>,
}

impl PrincipalResolver {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        roles: Arc<dyn RoleDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { users, roles, clock }
    }

    /// Resolve the principal for `identity_key`.
    ///
    /// Fails with `NotFound` when either the user or its role set is missing;
    /// a partial principal is never returned. No retries.
    pub fn resolve_by_identity_key(&self, identity_key: &IdentityKey) -> Result<Principal, ResolveError> {
        let user = self
            .users
            .find_by_email(identity_key)?
            .ok_or(ResolveError::NotFound)?;

        let roles = self.roles.roles_for_user(user.id)?;
        if roles.is_empty() {
            debug!(subject = %identity_key, "user has no role assignments");
            return Err(ResolveError::NotFound);
        }

        Ok(Principal::new(
            user.id,
            user.email,
            user.username,
            user.display_name,
            roles.into_iter().map(|r| r.name),
            user.created_at,
            user.last_login_at,
            self.clock.now(),
        ))
    }
}
