//! Usage: Catalog construction — built-in provider records, operator
//! overrides, secrets, and placeholder expansion.
//!
//! Records are loosely typed (every field optional); resolution is an
//! explicit field-by-field merge into the strict `ServiceConfig`, then a
//! literal placeholder substitution pass (`%OAUTH_CALLBACK_URI%`,
//! `%HOSTNAME%`, `%<SECRET_NAME>%`).

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::catalog::{Catalog, ServiceConfig};
use crate::config::AppConfig;
use crate::shared::error::AppResult;
use crate::store::crypto;

/// Providers shipped with the broker. Client ids and secrets come from the
/// secrets map; endpoints are plain data so operators can override any field
/// through `CONFIGFILE` without touching code.
const BUILT_IN_SERVICES: &str = r#"[
  {
    "id": "gd",
    "name": "Google Drive (limited)",
    "client_id": "%GD_CLIENT_ID%",
    "client_secret": "%GD_CLIENT_SECRET%",
    "auth_url": "https://www.googleapis.com/oauth2/v4/token",
    "login_url": "https://accounts.google.com/o/oauth2/auth",
    "scope": "https://www.googleapis.com/auth/drive.file",
    "extra_url": "&access_type=offline&approval_prompt=force",
    "service_link": "https://drive.google.com",
    "deauth_link": "https://security.google.com/settings/security/permissions",
    "brand_image": "/brands/gd.png"
  },
  {
    "id": "onedrivev2",
    "name": "Microsoft OneDrive v2",
    "client_id": "%ONEDRIVE_CLIENT_ID%",
    "client_secret": "%ONEDRIVE_CLIENT_SECRET%",
    "auth_url": "https://login.microsoftonline.com/common/oauth2/v2.0/token",
    "login_url": "https://login.microsoftonline.com/common/oauth2/v2.0/authorize",
    "scope": "offline_access Files.ReadWrite",
    "service_link": "https://onedrive.live.com",
    "deauth_link": "https://account.live.com/consent/Manage",
    "brand_image": "/brands/onedrive.png",
    "prefer_v2": true
  },
  {
    "id": "box",
    "name": "Box.com",
    "client_id": "%BOX_CLIENT_ID%",
    "client_secret": "%BOX_CLIENT_SECRET%",
    "auth_url": "https://api.box.com/oauth2/token",
    "login_url": "https://app.box.com/api/oauth2/authorize",
    "scope": "root_readwrite",
    "service_link": "https://www.box.com",
    "brand_image": "/brands/box.png"
  },
  {
    "id": "dropbox",
    "name": "Dropbox",
    "client_id": "%DROPBOX_CLIENT_ID%",
    "client_secret": "%DROPBOX_CLIENT_SECRET%",
    "auth_url": "https://api.dropboxapi.com/oauth2/token",
    "login_url": "https://www.dropbox.com/oauth2/authorize",
    "extra_url": "&token_access_type=offline",
    "service_link": "https://www.dropbox.com",
    "deauth_link": "https://www.dropbox.com/account/connected_apps",
    "brand_image": "/brands/dropbox.png"
  },
  {
    "id": "jottacloud",
    "name": "Jottacloud",
    "client_id": "jottacli",
    "auth_url": "https://id.jottacloud.com/auth/realms/jottacloud/protocol/openid-connect/token",
    "scope": "offline_access openid",
    "service_link": "https://www.jottacloud.com",
    "brand_image": "/brands/jottacloud.png",
    "cli_token": true,
    "prefer_v2": true,
    "notes": "Paste the personal login token generated in the Jottacloud web UI."
  },
  {
    "id": "pcloud",
    "name": "pCloud",
    "client_id": "%PCLOUD_CLIENT_ID%",
    "client_secret": "%PCLOUD_CLIENT_SECRET%",
    "auth_url": "https://api.pcloud.com/oauth2_token",
    "login_url": "https://my.pcloud.com/oauth2/authorize",
    "service_link": "https://www.pcloud.com",
    "brand_image": "/brands/pcloud.png",
    "access_token_only": true,
    "use_hostname_from_callback": true,
    "additional_elements": "hostname,locationid"
  }
]"#;

/// Loosely-typed catalog record as it appears in config sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ServiceRecord {
    pub id: Option<String>,
    pub name: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub auth_url: Option<String>,
    pub login_url: Option<String>,
    pub scope: Option<String>,
    pub redirect_uri: Option<String>,
    pub extra_url: Option<String>,
    pub service_link: Option<String>,
    pub deauth_link: Option<String>,
    pub brand_image: Option<String>,
    pub notes: Option<String>,
    pub hidden: Option<bool>,
    pub no_state_for_token_request: Option<bool>,
    pub no_redirect_uri_for_refresh_request: Option<bool>,
    pub cli_token: Option<bool>,
    pub prefer_v2: Option<bool>,
    pub access_token_only: Option<bool>,
    pub use_hostname_from_callback: Option<bool>,
    pub additional_elements: Option<String>,
}

pub fn load_catalog(config: &AppConfig) -> AppResult<Catalog> {
    let secrets = load_secrets(config)?;

    let mut records: Vec<ServiceRecord> = serde_json::from_str(BUILT_IN_SERVICES)
        .map_err(|e| format!("INTERNAL_ERROR: built-in catalog invalid: {e}"))?;

    if let Some(source) = config.config_file.as_deref() {
        let raw = read_source(source)?;
        let overrides: Vec<ServiceRecord> = serde_json::from_slice(&raw)
            .map_err(|e| format!("INTERNAL_ERROR: catalog override unparsable: {e}"))?;
        apply_overrides(&mut records, overrides);
    }

    if let Some(filter) = config.service_filter.as_deref() {
        records.retain(|r| {
            r.id.as_deref()
                .map(|id| filter.iter().any(|allowed| allowed == id))
                .unwrap_or(false)
        });
    }

    let callback_uri = config.callback_uri();
    let services: Vec<ServiceConfig> = records
        .into_iter()
        .filter_map(|record| resolve(record, &callback_uri, &config.hostname, &secrets))
        .collect();

    tracing::info!(services = services.len(), "service catalog loaded");
    Ok(Catalog::from_services(services))
}

fn apply_overrides(records: &mut Vec<ServiceRecord>, overrides: Vec<ServiceRecord>) {
    for over in overrides {
        let Some(id) = over.id.clone() else {
            tracing::warn!("catalog override without id skipped");
            continue;
        };
        match records
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(id.as_str()))
        {
            Some(base) => *base = merge_records(base.clone(), over),
            None => records.push(over),
        }
    }
}

/// Explicit field-by-field merge; the override wins wherever it is set.
fn merge_records(base: ServiceRecord, over: ServiceRecord) -> ServiceRecord {
    ServiceRecord {
        id: over.id.or(base.id),
        name: over.name.or(base.name),
        client_id: over.client_id.or(base.client_id),
        client_secret: over.client_secret.or(base.client_secret),
        auth_url: over.auth_url.or(base.auth_url),
        login_url: over.login_url.or(base.login_url),
        scope: over.scope.or(base.scope),
        redirect_uri: over.redirect_uri.or(base.redirect_uri),
        extra_url: over.extra_url.or(base.extra_url),
        service_link: over.service_link.or(base.service_link),
        deauth_link: over.deauth_link.or(base.deauth_link),
        brand_image: over.brand_image.or(base.brand_image),
        notes: over.notes.or(base.notes),
        hidden: over.hidden.or(base.hidden),
        no_state_for_token_request: over
            .no_state_for_token_request
            .or(base.no_state_for_token_request),
        no_redirect_uri_for_refresh_request: over
            .no_redirect_uri_for_refresh_request
            .or(base.no_redirect_uri_for_refresh_request),
        cli_token: over.cli_token.or(base.cli_token),
        prefer_v2: over.prefer_v2.or(base.prefer_v2),
        access_token_only: over.access_token_only.or(base.access_token_only),
        use_hostname_from_callback: over
            .use_hostname_from_callback
            .or(base.use_hostname_from_callback),
        additional_elements: over.additional_elements.or(base.additional_elements),
    }
}

/// Project a record onto the strict config: defaults, then placeholders.
fn resolve(
    record: ServiceRecord,
    callback_uri: &str,
    hostname: &str,
    secrets: &HashMap<String, String>,
) -> Option<ServiceConfig> {
    let id = record.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty())?;
    let expand = |value: Option<String>| {
        expand_placeholders(&value.unwrap_or_default(), callback_uri, hostname, secrets)
    };

    Some(ServiceConfig {
        name: record.name.clone().unwrap_or_else(|| id.clone()),
        client_id: expand(record.client_id),
        client_secret: expand(record.client_secret),
        auth_url: expand(record.auth_url),
        login_url: expand(record.login_url),
        scope: expand(record.scope),
        redirect_uri: expand(Some(
            record
                .redirect_uri
                .unwrap_or_else(|| "%OAUTH_CALLBACK_URI%".to_string()),
        )),
        extra_url: expand(record.extra_url),
        service_link: expand(record.service_link),
        deauth_link: expand(record.deauth_link),
        brand_image: record.brand_image.unwrap_or_default(),
        notes: record.notes.unwrap_or_default(),
        hidden: record.hidden.unwrap_or(false),
        no_state_for_token_request: record.no_state_for_token_request.unwrap_or(false),
        no_redirect_uri_for_refresh_request: record
            .no_redirect_uri_for_refresh_request
            .unwrap_or(false),
        cli_token: record.cli_token.unwrap_or(false),
        prefer_v2: record.prefer_v2.unwrap_or(false),
        access_token_only: record.access_token_only.unwrap_or(false),
        use_hostname_from_callback: record.use_hostname_from_callback.unwrap_or(false),
        additional_elements: record.additional_elements.unwrap_or_default(),
        id,
    })
}

/// Literal substitution; unknown `%NAME%` markers are left as-is so a
/// missing secret is visible in the login URL instead of silently empty.
fn expand_placeholders(
    value: &str,
    callback_uri: &str,
    hostname: &str,
    secrets: &HashMap<String, String>,
) -> String {
    let mut out = value.replace("%OAUTH_CALLBACK_URI%", callback_uri);
    out = out.replace("%HOSTNAME%", hostname);
    for (name, secret) in secrets {
        out = out.replace(&format!("%{name}%"), secret);
    }
    out
}

pub(crate) fn load_secrets(config: &AppConfig) -> AppResult<HashMap<String, String>> {
    let Some(source) = config.secrets.as_deref() else {
        return Ok(HashMap::new());
    };

    let mut raw = read_source(source)?;
    if let Some(passphrase) = config.secrets_passphrase.as_deref() {
        raw = crypto::decrypt(passphrase, &raw)?;
    }

    serde_json::from_slice(&raw)
        .map_err(|e| format!("INTERNAL_ERROR: secrets unparsable: {e}").into())
}

/// A source is either a file path or `base64:<inline payload>`.
fn read_source(value: &str) -> AppResult<Vec<u8>> {
    if let Some(inline) = value.strip_prefix("base64:") {
        return STANDARD
            .decode(inline.trim())
            .map_err(|e| format!("INTERNAL_ERROR: inline source invalid base64: {e}").into());
    }
    std::fs::read(value).map_err(|e| format!("INTERNAL_ERROR: source {value} unreadable: {e}").into())
}
