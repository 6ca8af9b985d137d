use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::DomainError;

/// Prefix applied when a role is exposed as an external capability string.
pub const AUTHORITY_PREFIX: &str = "ROLE_";

/// Longest accepted role name.
pub const MAX_ROLE_NAME_LEN: usize = 50;

/// Role identifier used for RBAC.
///
/// Always stored uppercase; `RoleName::new("admin") == RoleName::ADMIN`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoleName(Cow<'static, str>);

impl RoleName {
    pub const USER: RoleName = RoleName(Cow::Borrowed("USER"));
    pub const ADMIN: RoleName = RoleName(Cow::Borrowed("ADMIN"));

    /// Build a role name from trusted input, normalizing case and whitespace.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Cow::Owned(name.as_ref().trim().to_uppercase()))
    }

    /// Build a role name from user input.
    pub fn parse(name: &str) -> Result<Self, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("role name cannot be blank"));
        }
        if trimmed.chars().count() > MAX_ROLE_NAME_LEN {
            return Err(DomainError::validation(format!(
                "role name must be at most {MAX_ROLE_NAME_LEN} characters"
            )));
        }
        if trimmed.to_uppercase().starts_with(AUTHORITY_PREFIX) {
            return Err(DomainError::validation(format!(
                "role name must not carry the '{AUTHORITY_PREFIX}' prefix"
            )));
        }
        Ok(Self::new(trimmed))
    }

    /// Parse an external capability string (`ROLE_ADMIN`) back into a role.
    pub fn from_authority(authority: &str) -> Option<Self> {
        let name = authority.strip_prefix(AUTHORITY_PREFIX)?;
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// External capability string for this role.
    pub fn authority(&self) -> String {
        format!("{AUTHORITY_PREFIX}{}", self.0)
    }
}

impl From<String> for RoleName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0.into_owned()
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
