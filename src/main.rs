//! Usage: Binary entry — logging, environment configuration, catalog, serve.

use tracing_subscriber::EnvFilter;

use oauth_hub::catalog::loader;
use oauth_hub::config::AppConfig;
use oauth_hub::server::{self, AppState};
use oauth_hub::shared::error::AppResult;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("oauth_hub=info")),
        )
        .init();

    if let Err(err) = run().await {
        tracing::error!("fatal: {err}");
        std::process::exit(1);
    }
}

async fn run() -> AppResult<()> {
    let config = AppConfig::from_env()?;
    let catalog = loader::load_catalog(&config)?;
    if catalog.is_empty() {
        tracing::warn!("service catalog is empty; check SERVICES and CONFIGFILE");
    }

    let state = AppState::new(config, catalog)?;
    server::serve(state).await
}
