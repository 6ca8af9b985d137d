//! In-memory user/role directories for tests/dev.
//!
//! Lookups are by unique key; uniqueness of email, username and role name is
//! enforced on insert under the write lock, so racing registrations of the same
//! identity cannot both succeed.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use warden_auth::{
    DirectoryError, IdentityKey, RoleDirectory, RoleName, RoleRecord, UserDirectory, UserRecord,
};
use warden_core::{RoleId, UserId};

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    inner: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn find_by_email(&self, email: &IdentityKey) -> Result<Option<UserRecord>, DirectoryError> {
        let map = self.inner.read();
        Ok(map.values().find(|u| &u.email == email).cloned())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, DirectoryError> {
        let map = self.inner.read();
        Ok(map.values().find(|u| u.username == username).cloned())
    }

    fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, DirectoryError> {
        Ok(self.inner.read().get(&id).cloned())
    }

    fn insert(&self, user: UserRecord) -> Result<(), DirectoryError> {
        let mut map = self.inner.write();

        if map.values().any(|u| u.username == user.username) {
            return Err(DirectoryError::Conflict("Username is already taken".to_string()));
        }
        if map.values().any(|u| u.email == user.email) {
            return Err(DirectoryError::Conflict("Email is already in use".to_string()));
        }
        if map.contains_key(&user.id) {
            return Err(DirectoryError::Conflict(format!("user id {} already exists", user.id)));
        }

        map.insert(user.id, user);
        Ok(())
    }

    fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), DirectoryError> {
        let mut map = self.inner.write();
        let user = map
            .get_mut(&id)
            .ok_or_else(|| DirectoryError::NotFound(format!("user {id}")))?;
        user.last_login_at = Some(at);
        Ok(())
    }

    fn list(&self) -> Result<Vec<UserRecord>, DirectoryError> {
        let mut users: Vec<UserRecord> = self.inner.read().values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(users)
    }

    fn count(&self) -> Result<usize, DirectoryError> {
        Ok(self.inner.read().len())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryRoleDirectory {
    roles: RwLock<HashMap<RoleId, RoleRecord>>,
    assignments: RwLock<HashMap<UserId, BTreeSet<RoleId>>>,
}

impl InMemoryRoleDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleDirectory for InMemoryRoleDirectory {
    fn find_by_name(&self, name: &RoleName) -> Result<Option<RoleRecord>, DirectoryError> {
        let map = self.roles.read();
        Ok(map.values().find(|r| &r.name == name).cloned())
    }

    fn find_by_ids(&self, ids: &[RoleId]) -> Result<Vec<RoleRecord>, DirectoryError> {
        let map = self.roles.read();
        let unique: BTreeSet<&RoleId> = ids.iter().collect();
        Ok(unique.into_iter().filter_map(|id| map.get(id).cloned()).collect())
    }

    fn roles_for_user(&self, user_id: UserId) -> Result<Vec<RoleRecord>, DirectoryError> {
        // Copy the id set out first; the two locks are never held together.
        let ids: Vec<RoleId> = match self.assignments.read().get(&user_id) {
            Some(set) => set.iter().copied().collect(),
            None => return Ok(Vec::new()),
        };
        self.find_by_ids(&ids)
    }

    fn insert(&self, role: RoleRecord) -> Result<(), DirectoryError> {
        let mut map = self.roles.write();
        if map.values().any(|r| r.name == role.name) {
            return Err(DirectoryError::Conflict(format!(
                "Role already exists: {}",
                role.name
            )));
        }
        map.insert(role.id, role);
        Ok(())
    }

    fn assign_to_user(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<(), DirectoryError> {
        {
            let roles = self.roles.read();
            if let Some(missing) = role_ids.iter().find(|id| !roles.contains_key(id)) {
                return Err(DirectoryError::NotFound(format!("role {missing}")));
            }
        }

        self.assignments
            .write()
            .entry(user_id)
            .or_default()
            .extend(role_ids.iter().copied());
        Ok(())
    }

    fn list(&self) -> Result<Vec<RoleRecord>, DirectoryError> {
        let mut roles: Vec<RoleRecord> = self.roles.read().values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    fn count(&self) -> Result<usize, DirectoryError> {
        Ok(self.roles.read().len())
    }
}
