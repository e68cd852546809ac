//! Usage: Shared outbound HTTP client with periodic connection-pool recycling.
//!
//! The pooled client is rebuilt after a fixed interval so long-lived
//! connections to provider token endpoints re-resolve DNS.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::shared::error::AppResult;
use crate::shared::locking::recover_lock;

const CLIENT_RECYCLE_INTERVAL: Duration = Duration::from_secs(15 * 60);
const UPSTREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

struct RecycledClient {
    client: reqwest::Client,
    built_at: Instant,
}

pub(crate) struct SharedHttpClient {
    inner: Mutex<RecycledClient>,
}

impl SharedHttpClient {
    pub(crate) fn new() -> AppResult<Self> {
        Ok(Self {
            inner: Mutex::new(RecycledClient {
                client: build_client()?,
                built_at: Instant::now(),
            }),
        })
    }

    /// Cheap clone of the pooled client; rebuilds the pool once it is stale.
    pub(crate) fn get(&self) -> reqwest::Client {
        let mut inner = recover_lock(&self.inner);
        if inner.built_at.elapsed() >= CLIENT_RECYCLE_INTERVAL {
            match build_client() {
                Ok(client) => {
                    inner.client = client;
                    inner.built_at = Instant::now();
                }
                Err(err) => {
                    // Keep serving with the old pool rather than failing requests.
                    tracing::warn!("http client rebuild failed, keeping stale pool: {}", err);
                    inner.built_at = Instant::now();
                }
            }
        }
        inner.client.clone()
    }
}

fn build_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(format!("oauth-hub/{}", env!("CARGO_PKG_VERSION")))
        .connect_timeout(UPSTREAM_CONNECT_TIMEOUT)
        .build()
        .map_err(|e| format!("INTERNAL_ERROR: http client init failed: {e}").into())
}
