//! Usage: HTTP surface — shared application state, bind and serve.

pub(crate) mod handlers;
pub(crate) mod listen;
pub mod routes;
pub mod session;

use std::sync::Arc;

use crate::cache::TtlCache;
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::oauth::refresh::CachedAccessToken;
use crate::render::{HandlebarsRenderer, PageRenderer};
use crate::server::session::{FetchSlot, RequestState};
use crate::shared::error::AppResult;
use crate::shared::http::SharedHttpClient;
use crate::store::BlobStore;

/// Everything a handler needs; cloned per request by axum.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    /// Absent when no `STORAGE` is configured; the broker then only issues
    /// stateless v2 credentials.
    pub store: Option<Arc<BlobStore>>,
    pub(crate) http: Arc<SharedHttpClient>,
    pub renderer: Arc<dyn PageRenderer>,
    pub login_states: Arc<TtlCache<RequestState>>,
    pub fetch_tokens: Arc<TtlCache<FetchSlot>>,
    pub access_tokens: Arc<TtlCache<CachedAccessToken>>,
}

impl AppState {
    pub fn new(config: AppConfig, catalog: Catalog) -> AppResult<Self> {
        let store = match &config.storage {
            Some(path) => Some(Arc::new(BlobStore::open(path.clone())?)),
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog),
            store,
            http: Arc::new(SharedHttpClient::new()?),
            renderer: Arc::new(HandlebarsRenderer::new()?),
            login_states: Arc::new(TtlCache::new()),
            fetch_tokens: Arc::new(TtlCache::new()),
            access_tokens: Arc::new(TtlCache::new()),
        })
    }
}

pub async fn serve(state: AppState) -> AppResult<()> {
    let bind = listen::parse_listen_address(&state.config.listen_address)?;

    let listener = tokio::net::TcpListener::bind((bind.host.as_str(), bind.port))
        .await
        .map_err(|e| format!("INTERNAL_ERROR: bind {} failed: {e}", bind.display()))?;
    tracing::info!(
        addr = %bind.display(),
        services = state.catalog.len(),
        storage = state.store.is_some(),
        "oauth-hub listening"
    );

    let router = routes::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("INTERNAL_ERROR: server failed: {e}").into())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
