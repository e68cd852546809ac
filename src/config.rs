//! Usage: Process-environment configuration (schema + load helpers).
//!
//! Everything is read once at startup; the resulting struct is immutable
//! for the process lifetime.

use std::path::PathBuf;

use crate::shared::error::AppResult;

pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8080";

const ENV_HOSTNAME: &str = "HOSTNAME";
const ENV_APP_NAME: &str = "APPNAME";
const ENV_DISPLAY_NAME: &str = "DISPLAYNAME";
const ENV_SERVICES: &str = "SERVICES";
const ENV_SECRETS: &str = "SECRETS";
const ENV_SECRETS_PASSPHRASE: &str = "SECRETS_PASSPHRASE";
const ENV_CONFIG_FILE: &str = "CONFIGFILE";
const ENV_STORAGE: &str = "STORAGE";
const ENV_PRIVACY_POLICY_URL: &str = "PRIVACY_POLICY_URL";
const ENV_LISTEN_ADDRESS: &str = "LISTEN_ADDRESS";
const ENV_WEBROOT: &str = "WEBROOT";
const ENV_REVOKE_SUCCESS_OK: &str = "REVOKE_SUCCESS_OK";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Public hostname used in callback URL templating.
    pub hostname: String,
    /// Application name rendered into pages and error texts.
    pub app_name: String,
    pub display_name: String,
    /// Restricts the catalog to these service ids when set.
    pub service_filter: Option<Vec<String>>,
    /// Secrets source: a file path or `base64:<payload>`.
    pub secrets: Option<String>,
    pub secrets_passphrase: Option<String>,
    /// Catalog override, same encoding as `secrets`.
    pub config_file: Option<String>,
    /// Blob-store directory; `None` disables V1 credentials entirely.
    pub storage: Option<PathBuf>,
    pub privacy_policy_url: Option<String>,
    pub listen_address: String,
    /// Static asset directory (`/.well-known/*` and friends); optional.
    pub webroot: Option<PathBuf>,
    /// The source service answers revoke success with HTTP 400; operators
    /// can opt into a plain 200 here.
    pub revoke_success_ok: bool,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        let hostname = require(ENV_HOSTNAME)?;
        let app_name = require(ENV_APP_NAME)?;
        let display_name = optional(ENV_DISPLAY_NAME).unwrap_or_else(|| app_name.clone());

        let service_filter = optional(ENV_SERVICES).map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        });

        Ok(Self {
            hostname,
            app_name,
            display_name,
            service_filter: service_filter.filter(|f| !f.is_empty()),
            secrets: optional(ENV_SECRETS),
            secrets_passphrase: optional(ENV_SECRETS_PASSPHRASE),
            config_file: optional(ENV_CONFIG_FILE),
            storage: optional(ENV_STORAGE).and_then(|raw| parse_storage(&raw)),
            privacy_policy_url: optional(ENV_PRIVACY_POLICY_URL),
            listen_address: optional(ENV_LISTEN_ADDRESS)
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDRESS.to_string()),
            webroot: optional(ENV_WEBROOT).map(PathBuf::from),
            revoke_success_ok: optional(ENV_REVOKE_SUCCESS_OK)
                .map(|v| parse_bool(&v))
                .unwrap_or(false),
        })
    }

    /// `%OAUTH_CALLBACK_URI%` expansion target.
    pub fn callback_uri(&self) -> String {
        format!("https://{}/logged-in", self.hostname)
    }
}

fn require(name: &str) -> AppResult<String> {
    optional(name).ok_or_else(|| format!("BAD_REQUEST: environment variable {name} is required").into())
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts a bare directory path or `file://<path>?pathmapped=true`.
fn parse_storage(raw: &str) -> Option<PathBuf> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let without_scheme = raw.strip_prefix("file://").unwrap_or(raw);
    let without_query = without_scheme
        .split_once('?')
        .map(|(path, _)| path)
        .unwrap_or(without_scheme);

    if without_query.is_empty() {
        return None;
    }
    Some(PathBuf::from(without_query))
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
