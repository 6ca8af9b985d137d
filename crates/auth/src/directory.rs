//! Contracts for the external user/role store.
//!
//! The security core never owns persistence; it reaches records through these
//! traits by unique key (email, username, role name, user id).

use chrono::{DateTime, Utc};
use thiserror::Error;

use warden_core::{RoleId, UserId};

use crate::{IdentityKey, RoleName};

/// Stored user account.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    /// Normalized email; doubles as the identity key.
    pub email: IdentityKey,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl core::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("display_name", &self.display_name)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .field("last_login_at", &self.last_login_at)
            .finish()
    }
}

/// Stored role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRecord {
    pub id: RoleId,
    pub name: RoleName,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// User records keyed by email, username and id.
pub trait UserDirectory: Send + Sync {
    fn find_by_email(&self, email: &IdentityKey) -> Result<Option<UserRecord>, DirectoryError>;

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError>;

    fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError>;

    /// Insert a new user. Duplicate email or username is a `Conflict`.
    fn insert(&self, user: UserRecord) -> Result<(), DirectoryError>;

    fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), DirectoryError>;

    /// All users, newest first.
    fn list(&self) -> Result<Vec<UserRecord>, DirectoryError>;

    fn count(&self) -> Result<usize, DirectoryError>;
}

/// Role records and user→role assignments.
pub trait RoleDirectory: Send + Sync {
    fn find_by_name(&self, name: &RoleName) -> Result<Option<RoleRecord>, DirectoryError>;

    /// Roles matching `ids`; unknown ids are skipped.
    fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<RoleRecord>, DirectoryError>;

    fn roles_for_user(&self, user_id: UserId) -> Result<Vec<RoleRecord>, DirectoryError>;

    /// Insert a new role. Duplicate name is a `Conflict`.
    fn insert(&self, role: RoleRecord) -> Result<(), DirectoryError>;

    /// Add `role_ids` to the user's assignment set (union, no removal).
    fn assign_to_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), DirectoryError>;

    fn list(&self) -> Result<Vec<RoleRecord>, DirectoryError>;

    fn count(&self) -> Result<usize, DirectoryError>;
}
