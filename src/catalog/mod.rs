//! Usage: Read-only service catalog (service id → provider descriptor).
//!
//! Built once at startup from built-in records plus operator overrides;
//! lookup order is the record order, which drives the index page.

pub mod loader;

use std::collections::HashMap;

/// One third-party provider as the broker sees it. Immutable after load.
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    /// Token endpoint.
    pub auth_url: String,
    /// Authorize endpoint.
    pub login_url: String,
    pub scope: String,
    pub redirect_uri: String,
    /// Literal suffix appended to the login URL; already encoded, starts with `&`.
    pub extra_url: String,
    pub service_link: String,
    pub deauth_link: String,
    pub brand_image: String,
    pub notes: String,
    pub hidden: bool,
    pub no_state_for_token_request: bool,
    pub no_redirect_uri_for_refresh_request: bool,
    /// Provider uses the resource-owner password path (`/cli-token`).
    pub cli_token: bool,
    pub prefer_v2: bool,
    /// Provider issues no refresh token; the access token is the credential.
    pub access_token_only: bool,
    /// Provider routes token requests by a `hostname` callback parameter.
    pub use_hostname_from_callback: bool,
    /// Comma list of callback query parameters echoed back to the browser.
    pub additional_elements: String,
}

impl ServiceConfig {
    pub fn additional_element_names(&self) -> impl Iterator<Item = &str> {
        self.additional_elements
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Default)]
pub struct Catalog {
    services: Vec<ServiceConfig>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    pub fn from_services(services: Vec<ServiceConfig>) -> Self {
        let mut catalog = Catalog::default();
        for service in services {
            match catalog.by_id.get(&service.id) {
                Some(&index) => catalog.services[index] = service,
                None => {
                    catalog.by_id.insert(service.id.clone(), catalog.services.len());
                    catalog.services.push(service);
                }
            }
        }
        catalog
    }

    pub fn get(&self, id: &str) -> Option<&ServiceConfig> {
        self.by_id.get(id).map(|&index| &self.services[index])
    }

    /// Services shown on the unfiltered index page.
    pub fn visible(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter().filter(|s| !s.hidden)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceConfig> {
        self.services.iter()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
