//! Account flows: registration, login, current principal, role management and
//! admin statistics.
//!
//! Everything external (user/role store, hashing, token signing, notification
//! broker, wall clock) is injected, so the service itself holds no state besides
//! the principal cache.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use warden_auth::{
    CredentialError, DirectoryError, IdentityKey, IssueError, IssuedToken, PasswordHasher,
    Principal, PrincipalResolver, ResolveError, RoleDirectory, RoleName, RoleRecord, TokenCodec,
    UserDirectory, UserRecord,
};
use warden_core::{Clock, DomainError, RoleId, UserId};
use warden_events::{AccountEvent, ClientInfo, EventPublisher, UserLoggedIn, UserRegistered};

use crate::cache::TtlCache;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 50;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Window within which a user counts as recently active.
const ACTIVE_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountError {
    /// Unknown identity or wrong password. Deliberately indistinguishable.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    UserAlreadyExists(String),

    #[error("Role already exists: {0}")]
    RoleAlreadyExists(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    /// The identity exists but no principal can be built for it.
    #[error("principal not found")]
    PrincipalNotFound,

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Token(#[from] IssueError),

    #[error(transparent)]
    Store(#[from] DirectoryError),
}

impl From<ResolveError> for AccountError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::NotFound => AccountError::PrincipalNotFound,
            ResolveError::Directory(e) => AccountError::Store(e),
        }
    }
}

impl From<DomainError> for AccountError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AccountError::Validation(msg),
            DomainError::NotFound(msg) => AccountError::NotFound(msg),
            DomainError::Conflict(msg) => AccountError::UserAlreadyExists(msg),
            DomainError::InvalidId(msg) => AccountError::Validation(msg),
        }
    }
}

/// Registration input.
#[derive(Clone, Deserialize)]
pub struct RegisterUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for RegisterUser {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterUser")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login input.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Outward view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn from_principal(principal: &Principal) -> Self {
        Self {
            id: principal.user_id(),
            username: principal.username().to_string(),
            email: principal.identity_key().as_str().to_string(),
            name: principal.display_name().to_string(),
            roles: principal.roles().iter().map(|r| r.as_str().to_string()).collect(),
            created_at: principal.created_at(),
            last_login_at: principal.last_login_at(),
        }
    }

    fn from_record(record: &UserRecord, roles: impl IntoIterator<Item = RoleName>) -> Self {
        let roles: BTreeSet<RoleName> = roles.into_iter().collect();
        Self {
            id: record.id,
            username: record.username.clone(),
            email: record.email.as_str().to_string(),
            name: record.display_name.clone(),
            roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
            created_at: record.created_at,
            last_login_at: record.last_login_at,
        }
    }
}

/// Successful login: the bearer token plus the caller's profile.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: IssuedToken,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoginStatus {
    #[serde(rename = "Never logged in")]
    NeverLoggedIn,
    Active,
    Inactive,
}

impl LoginStatus {
    pub fn classify(last_login_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match last_login_at {
            None => LoginStatus::NeverLoggedIn,
            Some(at) if at > now - Duration::hours(ACTIVE_WINDOW_HOURS) => LoginStatus::Active,
            Some(_) => LoginStatus::Inactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub login_status: LoginStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    pub total_users: usize,
    pub total_roles: usize,
    /// Users that have logged in at least once.
    pub active_users: usize,
    pub users: Vec<UserStats>,
    pub generated_at: DateTime<Utc>,
}

/// Collaborators the service is wired with.
#[derive(Clone)]
pub struct AccountDeps {
    pub users: Arc<dyn UserDirectory>,
    pub roles: Arc<dyn RoleDirectory>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenCodec>,
    pub events: Arc<dyn EventPublisher>,
    pub clock: Arc<dyn Clock>,
}

pub struct AccountService {
    users: Arc<dyn UserDirectory>,
    roles: Arc<dyn RoleDirectory>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenCodec>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    resolver: PrincipalResolver,
    cache: TtlCache<Principal>,
}

impl AccountService {
    pub fn new(deps: AccountDeps, cache_namespace: impl Into<String>, cache_ttl: Duration) -> Self {
        let resolver = PrincipalResolver::new(deps.users.clone(), deps.roles.clone(), deps.clock.clone());
        let cache = TtlCache::new(cache_namespace, cache_ttl, deps.clock.clone());

        Self {
            users: deps.users,
            roles: deps.roles,
            hasher: deps.hasher,
            tokens: deps.tokens,
            events: deps.events,
            clock: deps.clock,
            resolver,
            cache,
        }
    }

    pub fn tokens(&self) -> &Arc<dyn TokenCodec> {
        &self.tokens
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn cache_namespace(&self) -> &str {
        self.cache.namespace()
    }

    /// Make sure the built-in `USER` and `ADMIN` roles exist.
    pub fn seed_default_roles(&self) -> Result<(), AccountError> {
        let defaults = [
            (RoleName::USER, "Default role for registered users"),
            (RoleName::ADMIN, "Administrative access"),
        ];

        for (name, description) in defaults {
            if self.roles.find_by_name(&name)?.is_some() {
                continue;
            }
            let record = RoleRecord {
                id: RoleId::new(),
                name: name.clone(),
                description: Some(description.to_string()),
                created_at: self.clock.now(),
            };
            match self.roles.insert(record) {
                Ok(()) => info!(role = %name, "seeded default role"),
                // Seeded concurrently; fine.
                Err(DirectoryError::Conflict(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    pub fn register(&self, req: RegisterUser, client: ClientInfo) -> Result<UserProfile, AccountError> {
        validate_registration(&req)?;

        let username = req.username.trim().to_string();
        let email = IdentityKey::new(&req.email);

        if self.users.find_by_username(&username)?.is_some() {
            return Err(AccountError::UserAlreadyExists("Username is already taken".to_string()));
        }
        if self.users.find_by_email(&email)?.is_some() {
            return Err(AccountError::UserAlreadyExists("Email is already in use".to_string()));
        }

        let default_role = self.require_role(&RoleName::USER)?;
        let record = self.new_user(username, email, req.name.trim().to_string(), &req.password)?;
        // Roles first: a failed assignment must not leave a user that can never log in.
        self.roles.assign_to_user(record.id, &[default_role.id])?;
        self.insert_user(&record)?;

        info!(user_id = %record.id, username = %record.username, "user registered");

        self.events.publish(AccountEvent::Registered(UserRegistered {
            event_id: uuid::Uuid::new_v4(),
            user_id: record.id,
            username: record.username.clone(),
            email: record.email.as_str().to_string(),
            display_name: record.display_name.clone(),
            registered_at: record.created_at,
            client,
        }));

        Ok(UserProfile::from_record(&record, [default_role.name]))
    }

    pub fn login(&self, req: LoginRequest, client: ClientInfo) -> Result<LoginOutcome, AccountError> {
        let key = IdentityKey::new(&req.email);
        let now = self.clock.now();

        let user = match self.users.find_by_email(&key)? {
            Some(user) if self.hasher.verify(&req.password, &user.password_hash) => user,
            _ => {
                warn!(subject = %key, "login rejected: invalid credentials");
                self.publish_failed_login(&key, "Invalid credentials", now, client);
                return Err(AccountError::InvalidCredentials);
            }
        };

        let principal = match self.resolver.resolve_by_identity_key(&key) {
            Ok(principal) => principal,
            Err(ResolveError::NotFound) => {
                warn!(subject = %key, "login rejected: principal not resolvable");
                self.publish_failed_login(&key, "Principal not found", now, client);
                return Err(AccountError::PrincipalNotFound);
            }
            Err(ResolveError::Directory(e)) => return Err(e.into()),
        };

        let roles: Vec<RoleName> = principal.roles().iter().cloned().collect();
        let token = self.tokens.issue(&key, &roles, now)?;

        self.users.record_login(user.id, now)?;
        self.evict_principal(&key);

        info!(subject = %key, user_id = %user.id, roles = roles.len(), "login succeeded");

        let mut profile = UserProfile::from_principal(&principal);
        profile.last_login_at = Some(now);

        self.events.publish(AccountEvent::LoggedIn(UserLoggedIn {
            event_id: uuid::Uuid::new_v4(),
            user_id: Some(user.id),
            username: Some(user.username.clone()),
            email: key.as_str().to_string(),
            display_name: Some(user.display_name.clone()),
            roles: profile.roles.clone(),
            login_at: now,
            client,
            successful: true,
            failure_reason: None,
        }));

        Ok(LoginOutcome { token, user: profile })
    }

    /// Principal for `identity_key`, served from the cache while fresh.
    pub fn current_principal(&self, identity_key: &IdentityKey) -> Result<Principal, AccountError> {
        if let Some(principal) = self.cache.get(identity_key.as_str()) {
            debug!(subject = %identity_key, namespace = self.cache.namespace(), "principal cache hit");
            return Ok(principal);
        }

        // An eviction racing this resolution wins; the result is then served but not cached.
        let generation = self.cache.generation(identity_key.as_str());
        let principal = self.resolver.resolve_by_identity_key(identity_key)?;
        if self.cache.put_if_unchanged(identity_key.as_str(), generation, principal.clone()) {
            debug!(subject = %identity_key, namespace = self.cache.namespace(), "principal cached");
        } else {
            debug!(subject = %identity_key, "principal invalidated during resolution; not cached");
        }
        Ok(principal)
    }

    pub fn create_role(&self, name: &str, description: Option<String>) -> Result<RoleRecord, AccountError> {
        let name = RoleName::parse(name)?;

        if self.roles.find_by_name(&name)?.is_some() {
            return Err(AccountError::RoleAlreadyExists(name.to_string()));
        }

        let record = RoleRecord {
            id: RoleId::new(),
            name,
            description: description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            created_at: self.clock.now(),
        };

        self.roles.insert(record.clone()).map_err(|e| match e {
            DirectoryError::Conflict(_) => AccountError::RoleAlreadyExists(record.name.to_string()),
            other => other.into(),
        })?;

        info!(role = %record.name, role_id = %record.id, "role created");
        Ok(record)
    }

    pub fn list_roles(&self) -> Result<Vec<RoleRecord>, AccountError> {
        Ok(self.roles.list()?)
    }

    /// Add `role_ids` to the user's roles and drop the user's cached principal.
    pub fn assign_roles(&self, user_id: UserId, role_ids: &[RoleId]) -> Result<UserProfile, AccountError> {
        if role_ids.is_empty() {
            return Err(AccountError::Validation("At least one role id is required".to_string()));
        }

        let user = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| AccountError::NotFound(format!("User not found with id: {user_id}")))?;

        let requested: BTreeSet<RoleId> = role_ids.iter().copied().collect();
        let requested: Vec<RoleId> = requested.into_iter().collect();
        let found = self.roles.find_by_ids(&requested)?;
        if found.len() != requested.len() {
            return Err(AccountError::NotFound("One or more roles not found".to_string()));
        }

        self.roles.assign_to_user(user.id, &requested)?;
        self.evict_principal(&user.email);

        let roles = self.roles.roles_for_user(user.id)?;
        info!(user_id = %user.id, assigned = requested.len(), total = roles.len(), "roles assigned");

        Ok(UserProfile::from_record(&user, roles.into_iter().map(|r| r.name)))
    }

    pub fn admin_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AccountError> {
        let records = self.users.list()?;
        let total_roles = self.roles.count()?;

        let mut users = Vec::with_capacity(records.len());
        for record in &records {
            let profile = UserProfile::from_record(
                record,
                self.roles.roles_for_user(record.id)?.into_iter().map(|r| r.name),
            );
            users.push(UserStats {
                id: profile.id,
                username: profile.username,
                email: profile.email,
                name: profile.name,
                roles: profile.roles,
                created_at: profile.created_at,
                last_login_at: profile.last_login_at,
                login_status: LoginStatus::classify(record.last_login_at, now),
            });
        }

        Ok(AdminStats {
            total_users: records.len(),
            total_roles,
            active_users: records.iter().filter(|u| u.last_login_at.is_some()).count(),
            users,
            generated_at: now,
        })
    }

    /// Drop the cached principal for `identity_key`, and void any resolution of
    /// it still in flight.
    pub fn evict_principal(&self, identity_key: &IdentityKey) -> bool {
        self.cache.evict(identity_key.as_str())
    }

    pub fn evict_all_principals(&self) {
        self.cache.evict_all();
        info!(namespace = self.cache.namespace(), "principal cache cleared");
    }

    /// Physically drop expired principals. Lookups never return them either way;
    /// this only bounds memory.
    pub fn purge_expired_principals(&self) -> usize {
        let purged = self.cache.purge_expired();
        if purged > 0 {
            debug!(namespace = self.cache.namespace(), purged, "purged expired principals");
        }
        purged
    }

    /// Ensure an admin account exists for `email`, holding `ADMIN` and `USER`.
    /// Safe to call on every start.
    pub fn bootstrap_admin(&self, email: &str, username: &str, password: &str) -> Result<UserProfile, AccountError> {
        let key = IdentityKey::new(email);
        let admin = self.require_role(&RoleName::ADMIN)?;
        let user = self.require_role(&RoleName::USER)?;

        let grants = [admin.id, user.id];
        let record = match self.users.find_by_email(&key)? {
            Some(existing) => {
                self.roles.assign_to_user(existing.id, &grants)?;
                existing
            }
            None => {
                validate_registration(&RegisterUser {
                    name: "Administrator".to_string(),
                    username: username.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                })?;
                let record = self.new_user(
                    username.trim().to_string(),
                    key.clone(),
                    "Administrator".to_string(),
                    password,
                )?;
                self.roles.assign_to_user(record.id, &grants)?;
                self.insert_user(&record)?;
                info!(user_id = %record.id, subject = %key, "bootstrap admin created");
                record
            }
        };

        self.evict_principal(&key);

        Ok(UserProfile::from_record(&record, [admin.name, user.name]))
    }

    fn require_role(&self, name: &RoleName) -> Result<RoleRecord, AccountError> {
        self.roles
            .find_by_name(name)?
            .ok_or_else(|| AccountError::NotFound(format!("Role not found: {name}")))
    }

    fn new_user(
        &self,
        username: String,
        email: IdentityKey,
        display_name: String,
        password: &str,
    ) -> Result<UserRecord, AccountError> {
        Ok(UserRecord {
            id: UserId::new(),
            username,
            email,
            display_name,
            password_hash: self.hasher.hash(password)?,
            created_at: self.clock.now(),
            last_login_at: None,
        })
    }

    fn insert_user(&self, record: &UserRecord) -> Result<(), AccountError> {
        self.users.insert(record.clone()).map_err(|e| match e {
            DirectoryError::Conflict(msg) => AccountError::UserAlreadyExists(msg),
            other => other.into(),
        })
    }

    fn publish_failed_login(&self, key: &IdentityKey, reason: &str, at: DateTime<Utc>, client: ClientInfo) {
        self.events
            .publish(AccountEvent::LoggedIn(UserLoggedIn::failed(key.as_str(), reason, at, client)));
    }
}

fn validate_registration(req: &RegisterUser) -> Result<(), AccountError> {
    if req.name.trim().is_empty() {
        return Err(AccountError::Validation("Name is required".to_string()));
    }

    let username_len = req.username.trim().chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&username_len) {
        return Err(AccountError::Validation(format!(
            "Username must be between {MIN_USERNAME_LEN} and {MAX_USERNAME_LEN} characters"
        )));
    }

    let email = req.email.trim();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(AccountError::Validation("Email should be valid".to_string()));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    Ok(())
}
