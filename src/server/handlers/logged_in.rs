//! Usage: `GET /logged-in` — the provider callback; exchanges the code,
//! mints the AuthId and completes any CLI rendezvous.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};

use crate::catalog::ServiceConfig;
use crate::oauth::authid::AuthId;
use crate::oauth::token_exchange::{self, CodeExchangeRequest, TokenResponse};
use crate::render::{AdditionalItem, LoggedInPage};
use crate::server::session::{FetchSlot, RequestState, FETCH_COMPLETED_TTL_SECS};
use crate::server::AppState;
use crate::shared::error::{AppError, AppResult};
use crate::shared::password::{generate_password, random_hex_key};
use crate::shared::time::now_unix_seconds;
use crate::store::StoredEntry;

pub(crate) async fn handle(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let now = now_unix_seconds();

    let state_key = param(&params, "state").ok_or("BAD_REQUEST: missing state")?;
    let code = param(&params, "code").ok_or("BAD_REQUEST: missing code")?;

    let login_state = state
        .login_states
        .get(state_key, now)
        .ok_or("BAD_REQUEST: login session is unknown or expired")?;
    let service = state
        .catalog
        .get(&login_state.service_id)
        .ok_or("BAD_REQUEST: unknown service")?;

    let additional_data: Vec<AdditionalItem> = service
        .additional_element_names()
        .filter_map(|name| {
            param(&params, name).map(|value| AdditionalItem {
                name: name.to_string(),
                value: value.to_string(),
            })
        })
        .collect();

    // CLI callers thread their fetch token through the provider round-trip;
    // when it comes back it becomes part of the redirect_uri we report.
    let redirect_uri = match param(&params, "token") {
        Some(token) => append_query_param(&service.redirect_uri, "token", token),
        None => service.redirect_uri.clone(),
    };

    // pCloud region routing: the callback names the API host to talk to.
    let token_url = if service.use_hostname_from_callback {
        match param(&params, "hostname") {
            Some(hostname) => override_host(&service.auth_url, hostname)?,
            None => service.auth_url.clone(),
        }
    } else {
        service.auth_url.clone()
    };

    let response = token_exchange::exchange_authorization_code(
        &state.http.get(),
        &CodeExchangeRequest {
            token_url,
            client_id: service.client_id.clone(),
            client_secret: service.client_secret.clone(),
            code: code.to_string(),
            redirect_uri,
        },
    )
    .await?;

    let credential = if service.access_token_only {
        response.access_token.clone()
    } else {
        response.refresh_token.clone()
    };

    let Some(credential) = credential else {
        // The provider answered 2xx but issued no usable token; the user has
        // to de-authorize the app before another attempt can succeed.
        let message = format!(
            "Server error, you must de-authorize {}",
            state.config.app_name
        );
        fail_fetch(&state, &login_state, &message, now);

        let body = state.renderer.logged_in(&LoggedInPage {
            app_name: state.config.app_name.clone(),
            service_name: service.name.clone(),
            auth_id: String::new(),
            error_message: Some(message),
            deauth_link: Some(service.deauth_link.clone()).filter(|l| !l.is_empty()),
            additional_data,
        })?;
        return Ok(Html(body).into_response());
    };

    let auth_id = if service.access_token_only {
        // The access token itself is the credential; nothing is stored.
        credential
    } else {
        mint_auth_id(&state, service, &login_state, &response, &credential, now).await?
    };

    complete_fetch(&state, &login_state, &auth_id, now);

    let body = state.renderer.logged_in(&LoggedInPage {
        app_name: state.config.app_name.clone(),
        service_name: service.name.clone(),
        auth_id,
        error_message: None,
        deauth_link: None,
        additional_data,
    })?;
    Ok(Html(body).into_response())
}

async fn mint_auth_id(
    state: &AppState,
    service: &ServiceConfig,
    login_state: &RequestState,
    response: &TokenResponse,
    refresh_token: &str,
    now: i64,
) -> AppResult<String> {
    match state.store.as_deref() {
        Some(store) if !login_state.use_v2 => {
            let key_id = random_hex_key();
            let password = generate_password();
            let entry = StoredEntry {
                service_id: service.id.clone(),
                expires: response.expires_unix(now),
                access_token: response.access_token.clone().unwrap_or_default(),
                refresh_token: refresh_token.to_string(),
                json: response.raw.clone(),
            };
            store.put(&key_id, &password, &entry).await?;
            Ok(AuthId::format_v1(&key_id, &password))
        }
        _ => Ok(AuthId::format_v2(&service.id, refresh_token)),
    }
}

/// Hand the issued AuthId to a waiting CLI poller; the slot shrinks to the
/// short post-completion TTL.
fn complete_fetch(state: &AppState, login_state: &RequestState, auth_id: &str, now: i64) {
    let Some(token) = login_state.fetch_token.as_deref() else {
        return;
    };
    if state.fetch_tokens.contains(token, now) {
        state.fetch_tokens.set(
            token,
            FetchSlot {
                auth_id: Some(auth_id.to_string()),
                error: None,
            },
            FETCH_COMPLETED_TTL_SECS,
            now,
        );
    }
}

fn fail_fetch(state: &AppState, login_state: &RequestState, message: &str, now: i64) {
    let Some(token) = login_state.fetch_token.as_deref() else {
        return;
    };
    if state.fetch_tokens.contains(token, now) {
        state.fetch_tokens.set(
            token,
            FetchSlot {
                auth_id: None,
                error: Some(message.to_string()),
            },
            FETCH_COMPLETED_TTL_SECS,
            now,
        );
    }
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(String::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Add a query parameter to an already-formed URI.
fn append_query_param(uri: &str, name: &str, value: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    let encoded = serde_urlencoded::to_string([(name, value)]).unwrap_or_default();
    format!("{uri}{separator}{encoded}")
}

fn override_host(auth_url: &str, hostname: &str) -> AppResult<String> {
    let mut url = reqwest::Url::parse(auth_url)
        .map_err(|e| format!("INTERNAL_ERROR: service auth url invalid: {e}"))?;
    url.set_host(Some(hostname))
        .map_err(|_| "BAD_REQUEST: invalid hostname in callback".to_string())?;
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_query_param_starts_or_extends_the_query() {
        assert_eq!(
            append_query_param("https://h/logged-in", "token", "abc"),
            "https://h/logged-in?token=abc"
        );
        assert_eq!(
            append_query_param("https://h/logged-in?x=1", "token", "a c"),
            "https://h/logged-in?x=1&token=a+c"
        );
    }

    #[test]
    fn override_host_swaps_only_the_host() {
        let url = override_host("https://api.pcloud.com/oauth2_token", "eapi.pcloud.com")
            .expect("override");
        assert_eq!(url, "https://eapi.pcloud.com/oauth2_token");
    }

    #[test]
    fn override_host_rejects_garbage() {
        assert!(override_host("https://api.pcloud.com/oauth2_token", "not a host").is_err());
        assert!(override_host("not-a-url", "h").is_err());
    }

    #[test]
    fn param_skips_empty_values() {
        let mut params = HashMap::new();
        params.insert("a".to_string(), "  ".to_string());
        params.insert("b".to_string(), "x".to_string());
        assert_eq!(param(&params, "a"), None);
        assert_eq!(param(&params, "b"), Some("x"));
        assert_eq!(param(&params, "c"), None);
    }
}
