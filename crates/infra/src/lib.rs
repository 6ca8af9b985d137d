//! Infrastructure layer: principal cache, in-memory directories and the account
//! service wiring them to the security core.

pub mod accounts;
pub mod cache;
pub mod directory;

pub use accounts::{
    AccountDeps, AccountError, AccountService, AdminStats, LoginOutcome, LoginRequest, LoginStatus,
    RegisterUser, UserProfile, UserStats,
};
pub use cache::{DEFAULT_NAMESPACE, DEFAULT_TTL_SECS, Generation, TtlCache};
pub use directory::{InMemoryRoleDirectory, InMemoryUserDirectory};
