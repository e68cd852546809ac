//! Usage: `GET|POST /refresh` — exchange an AuthId for a short-lived access
//! token. The AuthId arrives as a form field, query parameter or `X-AuthID`
//! header; any other method gets axum's 405.

use std::collections::HashMap;

use axum::extract::{Form, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::oauth::refresh::refresh_auth_id;
use crate::server::AppState;
use crate::shared::error::AppError;
use crate::shared::time::now_unix_seconds;

const AUTHID_HEADER: &str = "x-authid";

pub(crate) async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let auth_id = query.get("authid").cloned().or_else(|| header_value(&headers));
    run(state, auth_id).await
}

pub(crate) async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Response, AppError> {
    let auth_id = form.get("authid").cloned().or_else(|| header_value(&headers));
    run(state, auth_id).await
}

async fn run(state: AppState, auth_id: Option<String>) -> Result<Response, AppError> {
    let auth_id = auth_id
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or("BAD_REQUEST: missing authid")?;

    let reply = refresh_auth_id(
        &state.catalog,
        state.store.as_deref(),
        &state.access_tokens,
        &state.http.get(),
        &auth_id,
        now_unix_seconds(),
    )
    .await?;

    Ok(Json(reply).into_response())
}

fn header_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
