//! Usage: `GET /` — service list, optional fetch-token pre-registration.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::catalog::ServiceConfig;
use crate::render::{IndexPage, IndexServiceRow};
use crate::server::session::{acceptable_fetch_token, FetchSlot, FETCH_PENDING_TTL_SECS};
use crate::server::AppState;
use crate::shared::error::AppError;
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Deserialize)]
pub(crate) struct IndexQuery {
    token: Option<String>,
    /// Filter the listing to a single service id.
    #[serde(rename = "type")]
    service_type: Option<String>,
    /// Opaque; passed through to the template.
    redir: Option<String>,
}

pub(crate) async fn handle(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> Result<Response, AppError> {
    let now = now_unix_seconds();

    let fetch_token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| acceptable_fetch_token(t));
    if let Some(token) = fetch_token {
        // Pre-register the rendezvous slot so a CLI can start polling
        // before the browser flow on another device finishes.
        state
            .fetch_tokens
            .set(token, FetchSlot::default(), FETCH_PENDING_TTL_SECS, now);
    }

    let services: Vec<&ServiceConfig> = match query.service_type.as_deref() {
        Some(filter) => state.catalog.get(filter).into_iter().collect(),
        None => state.catalog.visible().collect(),
    };

    let rows = services
        .into_iter()
        .map(|service| IndexServiceRow {
            id: service.id.clone(),
            name: service.name.clone(),
            link: service_link(service, fetch_token),
            brand_image: service.brand_image.clone(),
            service_link: service.service_link.clone(),
            notes: service.notes.clone(),
        })
        .collect();

    let body = state.renderer.index(&IndexPage {
        app_name: state.config.app_name.clone(),
        display_name: state.config.display_name.clone(),
        redir: query.redir.unwrap_or_default(),
        services: rows,
    })?;
    Ok(Html(body).into_response())
}

fn service_link(service: &ServiceConfig, token: Option<&str>) -> String {
    let path = if service.cli_token {
        "/cli-token"
    } else {
        "/login"
    };

    let mut pairs = vec![("id", service.id.as_str())];
    if let Some(token) = token {
        pairs.push(("token", token));
    }
    let query = serde_urlencoded::to_string(&pairs).unwrap_or_default();
    format!("{path}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, cli_token: bool) -> ServiceConfig {
        ServiceConfig {
            id: id.to_string(),
            cli_token,
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn login_services_link_to_login() {
        assert_eq!(service_link(&service("gd", false), None), "/login?id=gd");
    }

    #[test]
    fn cli_token_services_link_to_cli_token() {
        assert_eq!(
            service_link(&service("jottacloud", true), None),
            "/cli-token?id=jottacloud"
        );
    }

    #[test]
    fn fetch_token_is_url_encoded_into_the_link() {
        assert_eq!(
            service_link(&service("gd", false), Some("a b&c")),
            "/login?id=gd&token=a+b%26c"
        );
    }
}
