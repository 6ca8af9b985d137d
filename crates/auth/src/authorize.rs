use thiserror::Error;

use crate::{AuthenticatedIdentity, RoleName};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("forbidden: missing role '{0}'")]
    InsufficientRole(RoleName),
}

/// Authorize a single required role.
///
/// - No IO
/// - No panics
/// - Absent identity is always denied (fail-closed)
pub fn require_role(identity: Option<&AuthenticatedIdentity>, role: &RoleName) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthenticated)?;
    if identity.has_role(role) {
        Ok(())
    } else {
        Err(AuthzError::InsufficientRole(role.clone()))
    }
}

/// Authorize several required roles (logical AND).
///
/// An empty requirement only demands an authenticated identity.
pub fn require_roles(
    identity: Option<&AuthenticatedIdentity>,
    roles: &[RoleName],
) -> Result<(), AuthzError> {
    let identity = identity.ok_or(AuthzError::Unauthenticated)?;
    roles
        .iter()
        .try_for_each(|role| require_role(Some(identity), role))
}

/// Protected-operation contract (checked at the boundary before the operation runs).
pub trait ProtectedOperation {
    fn required_roles(&self) -> Vec<RoleName>;
}

/// Required roles of a protected operation, declared as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPolicy {
    pub operation: &'static str,
    pub required: &'static [&'static str],
}

impl OperationPolicy {
    pub const fn new(operation: &'static str, required: &'static [&'static str]) -> Self {
        Self { operation, required }
    }

    pub fn authorize(&self, identity: Option<&AuthenticatedIdentity>) -> Result<(), AuthzError> {
        require_roles(identity, &self.required_roles())
    }
}

impl ProtectedOperation for OperationPolicy {
    fn required_roles(&self) -> Vec<RoleName> {
        self.required.iter().map(RoleName::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentityKey;

    fn identity_with_roles(roles: &[&str]) -> AuthenticatedIdentity {
        AuthenticatedIdentity::new(
            IdentityKey::new("a@x.com"),
            roles.iter().map(RoleName::new).collect(),
        )
    }

    #[test]
    fn admin_is_allowed_admin() {
        let identity = identity_with_roles(&["ADMIN"]);
        assert_eq!(require_role(Some(&identity), &RoleName::ADMIN), Ok(()));
    }

    #[test]
    fn user_is_denied_admin() {
        let identity = identity_with_roles(&["USER"]);
        assert_eq!(
            require_role(Some(&identity), &RoleName::ADMIN),
            Err(AuthzError::InsufficientRole(RoleName::ADMIN))
        );
    }

    #[test]
    fn anonymous_is_denied() {
        assert_eq!(require_role(None, &RoleName::ADMIN), Err(AuthzError::Unauthenticated));
        assert_eq!(require_roles(None, &[]), Err(AuthzError::Unauthenticated));
    }

    #[test]
    fn multiple_roles_are_anded() {
        let both = identity_with_roles(&["USER", "ADMIN"]);
        let one = identity_with_roles(&["USER"]);
        let required = [RoleName::USER, RoleName::ADMIN];

        assert!(require_roles(Some(&both), &required).is_ok());
        assert_eq!(
            require_roles(Some(&one), &required),
            Err(AuthzError::InsufficientRole(RoleName::ADMIN))
        );
    }

    #[test]
    fn empty_requirement_only_needs_authentication() {
        let identity = identity_with_roles(&[]);
        assert!(require_roles(Some(&identity), &[]).is_ok());
    }

    #[test]
    fn policy_is_repeatable() {
        const POLICY: OperationPolicy = OperationPolicy::new("roles.create", &["ADMIN"]);
        let identity = identity_with_roles(&["admin"]);

        for _ in 0..3 {
            assert!(POLICY.authorize(Some(&identity)).is_ok());
        }
        assert_eq!(POLICY.required_roles(), vec![RoleName::ADMIN]);
    }
}
