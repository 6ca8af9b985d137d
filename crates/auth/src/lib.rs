//! `warden-auth`: pure authentication/authorization core.
//!
//! This crate is intentionally decoupled from HTTP and storage: persistence is
//! reached through the directory traits, hashing through `PasswordHasher`.

pub mod authorize;
pub mod claims;
pub mod directory;
pub mod password;
pub mod principal;
pub mod resolver;
pub mod roles;

pub use authorize::{
    AuthzError, OperationPolicy, ProtectedOperation, require_role, require_roles,
};
pub use claims::{
    Claims, DEFAULT_TOKEN_VALIDITY_SECS, Hs256TokenCodec, IssueError, IssuedToken, TokenCodec,
    TokenError,
};
pub use directory::{DirectoryError, RoleDirectory, RoleRecord, UserDirectory, UserRecord};
pub use password::{BcryptHasher, CredentialError, PasswordHasher};
pub use principal::{AuthenticatedIdentity, IdentityKey, Principal};
pub use resolver::{PrincipalResolver, ResolveError};
pub use roles::{AUTHORITY_PREFIX, RoleName};
