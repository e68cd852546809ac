//! Usage: Fixtures shared by unit and integration tests.
//!
//! Storage directories are caller-provided (integration tests pass a
//! tempdir) so this module carries no test-only dependencies itself.

use std::path::Path;

use crate::catalog::{Catalog, ServiceConfig};
use crate::config::AppConfig;
use crate::server::AppState;

pub fn test_config(storage: Option<&Path>) -> AppConfig {
    AppConfig {
        hostname: "hub.example".to_string(),
        app_name: "OAuth Hub".to_string(),
        display_name: "OAuth Hub".to_string(),
        service_filter: None,
        secrets: None,
        secrets_passphrase: None,
        config_file: None,
        storage: storage.map(|p| p.to_path_buf()),
        privacy_policy_url: None,
        listen_address: "127.0.0.1:0".to_string(),
        webroot: None,
        revoke_success_ok: false,
    }
}

/// A small catalog with one provider of each behavioral shape, all pointed
/// at the given token endpoint (usually a stub server in tests).
pub fn test_catalog(token_url: &str) -> Catalog {
    let gd = ServiceConfig {
        id: "gd".to_string(),
        name: "Google Drive".to_string(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        auth_url: token_url.to_string(),
        login_url: "https://provider.example/auth".to_string(),
        scope: "drive".to_string(),
        redirect_uri: "https://hub.example/logged-in".to_string(),
        extra_url: "&access_type=offline&approval_prompt=force".to_string(),
        deauth_link: "https://provider.example/deauth".to_string(),
        ..ServiceConfig::default()
    };

    let pcloud = ServiceConfig {
        id: "pcloud".to_string(),
        name: "pCloud".to_string(),
        client_id: "pc-client".to_string(),
        auth_url: token_url.to_string(),
        login_url: "https://provider.example/auth".to_string(),
        redirect_uri: "https://hub.example/logged-in".to_string(),
        access_token_only: true,
        use_hostname_from_callback: true,
        additional_elements: "hostname,locationid".to_string(),
        ..ServiceConfig::default()
    };

    let jottacloud = ServiceConfig {
        id: "jottacloud".to_string(),
        name: "Jottacloud".to_string(),
        client_id: "jottacli".to_string(),
        auth_url: token_url.to_string(),
        login_url: "https://provider.example/auth".to_string(),
        scope: "offline_access openid".to_string(),
        cli_token: true,
        prefer_v2: true,
        ..ServiceConfig::default()
    };

    let hidden = ServiceConfig {
        id: "internal".to_string(),
        name: "Internal".to_string(),
        auth_url: token_url.to_string(),
        hidden: true,
        ..ServiceConfig::default()
    };

    Catalog::from_services(vec![gd, pcloud, jottacloud, hidden])
}

pub fn state_from(config: AppConfig, catalog: Catalog) -> AppState {
    AppState::new(config, catalog).expect("test app state")
}

pub fn state_with_storage(token_url: &str, storage: &Path) -> AppState {
    state_from(test_config(Some(storage)), test_catalog(token_url))
}

pub fn state_without_storage(token_url: &str) -> AppState {
    state_from(test_config(None), test_catalog(token_url))
}
