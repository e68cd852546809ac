//! Usage: `GET /cli-token` + `POST /cli-token-login` — resource-owner
//! password path for providers that hand users a login token blob.

use axum::extract::{Form, Query, State};
use axum::response::{Html, IntoResponse, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

use crate::oauth::authid::AuthId;
use crate::oauth::token_exchange::{self, PasswordGrantRequest};
use crate::render::{CliTokenPage, LoggedInPage};
use crate::server::session::{FetchSlot, FETCH_COMPLETED_TTL_SECS};
use crate::server::AppState;
use crate::shared::error::{AppError, AppResult};
use crate::shared::time::now_unix_seconds;

const MIN_CLI_TOKEN_LEN: usize = 6;

#[derive(Debug, Deserialize)]
pub(crate) struct CliTokenQuery {
    id: Option<String>,
    token: Option<String>,
}

pub(crate) async fn entry_page(
    State(state): State<AppState>,
    Query(query): Query<CliTokenQuery>,
) -> Result<Response, AppError> {
    let service = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| state.catalog.get(id))
        .filter(|s| s.cli_token)
        .ok_or("BAD_REQUEST: unknown cli-token service")?;

    let body = state.renderer.cli_token(&CliTokenPage {
        app_name: state.config.app_name.clone(),
        service_id: service.id.clone(),
        service_name: service.name.clone(),
        fetch_token: query.token.unwrap_or_default(),
    })?;
    Ok(Html(body).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CliTokenForm {
    id: Option<String>,
    /// The raw user-supplied credential blob (base64url JSON).
    token: Option<String>,
    fetchtoken: Option<String>,
}

/// The decoded login token payload.
#[derive(Debug, Deserialize)]
struct CliTokenBlob {
    username: String,
    auth_token: String,
}

pub(crate) async fn login(
    State(state): State<AppState>,
    Form(form): Form<CliTokenForm>,
) -> Result<Response, AppError> {
    let token = form
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| t.len() >= MIN_CLI_TOKEN_LEN)
        .ok_or("BAD_REQUEST: login token is too short")?;
    let service = form
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| state.catalog.get(id))
        .filter(|s| s.cli_token)
        .ok_or("BAD_REQUEST: unknown cli-token service")?;

    let decoded = decode_base64_url_lenient(token)?;
    let blob: CliTokenBlob = serde_json::from_slice(&decoded)
        .map_err(|_| "BAD_REQUEST: login token payload is not valid")?;

    let response = token_exchange::password_grant(
        &state.http.get(),
        &PasswordGrantRequest {
            token_url: service.auth_url.clone(),
            client_id: service.client_id.clone(),
            scope: service.scope.clone(),
            username: blob.username,
            password: blob.auth_token,
        },
    )
    .await?;

    let access_token = response
        .access_token
        .ok_or("UPSTREAM_ERROR: token response missing access_token")?;

    // There is no refresh token on this path; the access token occupies the
    // v2 slot and such AuthIds are effectively non-refreshable.
    let auth_id = AuthId::format_v2(&service.id, &access_token);

    let now = now_unix_seconds();
    if let Some(fetch_token) = form
        .fetchtoken
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        if state.fetch_tokens.contains(fetch_token, now) {
            state.fetch_tokens.set(
                fetch_token,
                FetchSlot {
                    auth_id: Some(auth_id.clone()),
                    error: None,
                },
                FETCH_COMPLETED_TTL_SECS,
                now,
            );
        }
    }

    let body = state.renderer.logged_in(&LoggedInPage {
        app_name: state.config.app_name.clone(),
        service_name: service.name.clone(),
        auth_id,
        error_message: None,
        deauth_link: None,
        additional_data: vec![],
    })?;
    Ok(Html(body).into_response())
}

/// The blob arrives base64url-encoded, usually without padding. Normalize to
/// the standard alphabet, re-pad to a multiple of four, then decode.
fn decode_base64_url_lenient(raw: &str) -> AppResult<Vec<u8>> {
    let mut normalized: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }

    STANDARD
        .decode(normalized)
        .map_err(|_| "BAD_REQUEST: login token is not valid base64".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_handles_url_alphabet_and_missing_padding() {
        // base64url of {"a":1} without padding.
        let decoded = decode_base64_url_lenient("eyJhIjoxfQ").expect("decode");
        assert_eq!(decoded, b"{\"a\":1}");
    }

    #[test]
    fn decode_maps_url_safe_chars_to_standard() {
        // 0xfb 0xef encodes to "--8" url-safe / "+-8"... use a value with both chars.
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([0xfb, 0xff, 0xfe]);
        assert!(encoded.contains('-') || encoded.contains('_'));
        let decoded = decode_base64_url_lenient(&encoded).expect("decode");
        assert_eq!(decoded, vec![0xfb, 0xff, 0xfe]);
    }

    #[test]
    fn decode_strips_embedded_whitespace() {
        let decoded = decode_base64_url_lenient("eyJh\nIjox\r\nfQ").expect("decode");
        assert_eq!(decoded, b"{\"a\":1}");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_base64_url_lenient("!!!").is_err());
    }

    #[test]
    fn blob_parses_username_and_auth_token() {
        let blob: CliTokenBlob =
            serde_json::from_slice(br#"{"username":"u","auth_token":"t"}"#).expect("parse");
        assert_eq!(blob.username, "u");
        assert_eq!(blob.auth_token, "t");
    }
}
