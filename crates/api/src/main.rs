use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use warden_api::app::services::{self, CACHE_PURGE_INTERVAL};
use warden_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_observability::init();

    let config = ApiConfig::from_env().context("loading configuration")?;
    let services = Arc::new(services::build_services(&config)?);
    services::spawn_cache_janitor(services.clone(), CACHE_PURGE_INTERVAL);
    let app = warden_api::app::build_app_with(services);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
