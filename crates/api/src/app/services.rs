//! Service wiring: directories, hashing, token codec, event bus, account service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use warden_auth::{BcryptHasher, Hs256TokenCodec};
use warden_core::{Clock, SystemClock};
use warden_events::{AccountEvent, BusPublisher, EventEnvelope, InMemoryEventBus};
use warden_infra::{
    AccountDeps, AccountError, AccountService, InMemoryRoleDirectory, InMemoryUserDirectory,
};

use crate::app::errors;
use crate::config::ApiConfig;

/// How often expired principals are physically dropped from the cache.
pub const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

pub type AccountEventBus = InMemoryEventBus<EventEnvelope<AccountEvent>>;

pub struct AppServices {
    pub accounts: AccountService,
    pub events: Arc<AccountEventBus>,
}

pub fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    build_services_with_clock(config, Arc::new(SystemClock))
}

pub fn build_services_with_clock(config: &ApiConfig, clock: Arc<dyn Clock>) -> anyhow::Result<AppServices> {
    let hasher = BcryptHasher::new(config.bcrypt_cost).context("configuring password hasher")?;
    let tokens = Hs256TokenCodec::new(config.jwt_secret.as_bytes(), config.token_validity);
    let events = Arc::new(AccountEventBus::new());

    let accounts = AccountService::new(
        AccountDeps {
            users: Arc::new(InMemoryUserDirectory::new()),
            roles: Arc::new(InMemoryRoleDirectory::new()),
            hasher: Arc::new(hasher),
            tokens: Arc::new(tokens),
            events: Arc::new(BusPublisher::new(events.clone())),
            clock,
        },
        config.cache_namespace.clone(),
        config.cache_ttl,
    );

    accounts.seed_default_roles().context("seeding default roles")?;

    if let Some(admin) = &config.bootstrap_admin {
        let profile = accounts
            .bootstrap_admin(&admin.email, &admin.username, &admin.password)
            .context("bootstrapping admin account")?;
        info!(user_id = %profile.id, email = %profile.email, "admin account ready");
    }

    Ok(AppServices { accounts, events })
}

/// Run an account operation off the async runtime. Password hashing is slow on
/// purpose and must not stall other requests.
pub async fn run_blocking<T, F>(services: &Arc<AppServices>, op: F) -> Result<T, axum::response::Response>
where
    T: Send + 'static,
    F: FnOnce(&AppServices) -> Result<T, AccountError> + Send + 'static,
{
    let services = services.clone();
    match tokio::task::spawn_blocking(move || op(&services)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(errors::account_error_to_response(err)),
        Err(join) => {
            error!(error = %join, "blocking account task failed");
            Err(errors::internal())
        }
    }
}

/// Periodically drop expired principals so the cache does not grow with
/// identities that stopped calling.
pub fn spawn_cache_janitor(services: Arc<AppServices>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            services.accounts.purge_expired_principals();
        }
    })
}
