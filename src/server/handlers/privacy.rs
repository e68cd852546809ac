//! Usage: `GET /privacy-policy` — configured URL redirect or the static page.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};

use crate::render::PrivacyPage;
use crate::server::handlers::found;
use crate::server::AppState;
use crate::shared::error::AppError;

pub(crate) async fn handle(State(state): State<AppState>) -> Result<Response, AppError> {
    if let Some(url) = state.config.privacy_policy_url.as_deref() {
        return Ok(found(url));
    }

    let body = state.renderer.privacy_policy(&PrivacyPage {
        app_name: state.config.app_name.clone(),
    })?;
    Ok(Html(body).into_response())
}
