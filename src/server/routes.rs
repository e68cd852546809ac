//! Usage: Route table for the broker's public HTTP surface.

use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;

use super::handlers;
use super::AppState;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/", get(handlers::index::handle))
        .route("/login", get(handlers::login::handle))
        .route("/logged-in", get(handlers::logged_in::handle))
        .route("/cli-token", get(handlers::cli_token::entry_page))
        .route("/cli-token-login", post(handlers::cli_token::login))
        .route("/fetch", get(handlers::fetch::handle))
        .route("/privacy-policy", get(handlers::privacy::handle))
        .route("/revoke", get(handlers::revoke::entry_page))
        .route("/revoked", post(handlers::revoke::perform))
        // Other methods fall through to axum's automatic 405.
        .route(
            "/refresh",
            get(handlers::refresh::handle_get).post(handlers::refresh::handle_post),
        );

    // Static assets and ACME challenges live outside the state machine;
    // anything unmatched is served from the webroot when one is configured.
    let router = match &state.config.webroot {
        Some(webroot) => router.fallback_service(ServeDir::new(webroot)),
        None => router,
    };

    router.with_state(state)
}
