//! Usage: `GET /login` — start the authorization-code flow (302 to the provider).

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::server::handlers::found;
use crate::server::session::{RequestState, REQUEST_STATE_TTL_SECS};
use crate::server::AppState;
use crate::shared::error::AppError;
use crate::shared::password::random_hex_key;
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Deserialize)]
pub(crate) struct LoginQuery {
    id: Option<String>,
    token: Option<String>,
}

pub(crate) async fn handle(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    let service = query
        .id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .and_then(|id| state.catalog.get(id))
        .ok_or("BAD_REQUEST: unknown service id")?;

    let now = now_unix_seconds();

    // A fetch token only rides along if the CLI actually registered it.
    let fetch_token = query
        .token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty() && state.fetch_tokens.contains(t, now))
        .map(str::to_string);

    let use_v2 = state.store.is_none() || service.prefer_v2;

    let state_key = random_hex_key();
    if state.login_states.contains(&state_key, now) {
        return Err("INTERNAL_ERROR: state key collision".into());
    }
    state.login_states.set(
        &state_key,
        RequestState {
            service_id: service.id.clone(),
            fetch_token,
            use_v2,
        },
        REQUEST_STATE_TTL_SECS,
        now,
    );

    let query_string = serde_urlencoded::to_string([
        ("client_id", service.client_id.as_str()),
        ("response_type", "code"),
        ("scope", service.scope.as_str()),
        ("state", state_key.as_str()),
        ("redirect_uri", service.redirect_uri.as_str()),
    ])
    .map_err(|e| format!("INTERNAL_ERROR: login url build failed: {e}"))?;

    // extra_url is a pre-encoded suffix like `&access_type=offline`; it is
    // appended verbatim, never re-encoded.
    let location = format!(
        "{}?{}{}",
        service.login_url, query_string, service.extra_url
    );
    Ok(found(&location))
}
