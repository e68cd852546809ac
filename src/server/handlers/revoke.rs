//! Usage: `GET /revoke` + `POST /revoked` — destroy a V1 credential.
//!
//! Outcomes are rendered pages. The source service answered even the
//! success case with HTTP 400; that quirk is preserved unless the operator
//! sets `REVOKE_SUCCESS_OK`.

use axum::extract::{Form, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::oauth::authid::V2_PREFIX;
use crate::render::{RevokePage, RevokeResultPage};
use crate::server::AppState;
use crate::shared::error::AppError;

pub(crate) const V2_REVOKE_MESSAGE: &str = "A v2 AuthID holds no state on this server, please \
     de-authorize the application on the storage providers website";
const INVALID_AUTHID_MESSAGE: &str = "Invalid AuthId";
const REVOKE_FAILED_MESSAGE: &str = "Internal error, failed to revoke token";
const REVOKED_MESSAGE: &str = "Token is revoked";

const AUTHID_HEADER: &str = "x-authid";

pub(crate) async fn entry_page(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.renderer.revoke(&RevokePage {
        app_name: state.config.app_name.clone(),
    })?;
    Ok(Html(body).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct RevokeForm {
    authid: Option<String>,
}

pub(crate) async fn perform(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<RevokeForm>,
) -> Result<Response, AppError> {
    let auth_id = form
        .authid
        .or_else(|| header_value(&headers))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let Some(auth_id) = auth_id else {
        return page(&state, StatusCode::BAD_REQUEST, INVALID_AUTHID_MESSAGE);
    };

    if auth_id.starts_with(V2_PREFIX) {
        return page(&state, StatusCode::BAD_REQUEST, V2_REVOKE_MESSAGE);
    }

    let Some((key_id, password)) = auth_id.split_once(':') else {
        return page(&state, StatusCode::BAD_REQUEST, INVALID_AUTHID_MESSAGE);
    };
    let Some(store) = state.store.as_deref() else {
        return page(&state, StatusCode::BAD_REQUEST, INVALID_AUTHID_MESSAGE);
    };

    // Decrypting proves the caller holds the password half; without it the
    // entry is untouched and the response does not reveal whether it exists.
    if store.get(key_id, password).await.is_err() {
        return page(&state, StatusCode::BAD_REQUEST, INVALID_AUTHID_MESSAGE);
    }

    if let Err(err) = store.delete(key_id).await {
        tracing::error!("revoke delete failed: {err}");
        return page(
            &state,
            StatusCode::INTERNAL_SERVER_ERROR,
            REVOKE_FAILED_MESSAGE,
        );
    }

    let status = if state.config.revoke_success_ok {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    page(&state, status, REVOKED_MESSAGE)
}

fn header_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn page(state: &AppState, status: StatusCode, message: &str) -> Result<Response, AppError> {
    let body = state.renderer.revoked(&RevokeResultPage {
        app_name: state.config.app_name.clone(),
        message: message.to_string(),
    })?;
    Ok((status, Html(body)).into_response())
}
