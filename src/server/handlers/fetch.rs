//! Usage: `GET /fetch` — CLI polling endpoint for the rendezvous slot.
//!
//! Outcomes are JSON bodies, never HTTP error statuses; pollers distinguish
//! "keep waiting" from "give up" by the body shape alone.

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::server::AppState;
use crate::shared::time::now_unix_seconds;

#[derive(Debug, Deserialize)]
pub(crate) struct FetchQuery {
    token: Option<String>,
    callback: Option<String>,
    jsonp: Option<String>,
}

pub(crate) async fn handle(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> Response {
    let payload = fetch_payload(&state, query.token.as_deref(), now_unix_seconds());

    let callback = query
        .callback
        .or(query.jsonp)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    match callback {
        Some(name) => (
            [(CONTENT_TYPE, "application/javascript")],
            format!("{name}({payload})"),
        )
            .into_response(),
        None => (
            [(CONTENT_TYPE, "application/json")],
            payload.to_string(),
        )
            .into_response(),
    }
}

fn fetch_payload(state: &AppState, token: Option<&str>, now: i64) -> Value {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        return json!({"error": "Missing token"});
    };

    match state.fetch_tokens.get(token, now) {
        None => json!({"error": "No such entry"}),
        Some(slot) => match (slot.auth_id, slot.error) {
            (Some(auth_id), _) => json!({"authid": auth_id}),
            (None, Some(error)) => json!({"error": error}),
            (None, None) => json!({"wait": "Not ready"}),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::session::FetchSlot;
    use crate::test_support;

    fn state() -> AppState {
        test_support::state_without_storage("https://provider.example/token")
    }

    #[test]
    fn missing_token_yields_error_body() {
        let state = state();
        assert_eq!(
            fetch_payload(&state, None, 0),
            json!({"error": "Missing token"})
        );
        assert_eq!(
            fetch_payload(&state, Some("  "), 0),
            json!({"error": "Missing token"})
        );
    }

    #[test]
    fn unknown_token_is_no_such_entry() {
        let state = state();
        assert_eq!(
            fetch_payload(&state, Some("abcdefghij"), 0),
            json!({"error": "No such entry"})
        );
    }

    #[test]
    fn pending_slot_reports_not_ready() {
        let state = state();
        state
            .fetch_tokens
            .set("abcdefghij", FetchSlot::default(), 300, 1000);
        assert_eq!(
            fetch_payload(&state, Some("abcdefghij"), 1001),
            json!({"wait": "Not ready"})
        );
    }

    #[test]
    fn completed_slot_reports_the_authid() {
        let state = state();
        state.fetch_tokens.set(
            "abcdefghij",
            FetchSlot {
                auth_id: Some("v2:gd:R".to_string()),
                error: None,
            },
            30,
            1000,
        );
        assert_eq!(
            fetch_payload(&state, Some("abcdefghij"), 1001),
            json!({"authid": "v2:gd:R"})
        );
    }

    #[test]
    fn expired_slot_is_no_such_entry_again() {
        let state = state();
        state.fetch_tokens.set(
            "abcdefghij",
            FetchSlot {
                auth_id: Some("v2:gd:R".to_string()),
                error: None,
            },
            30,
            1000,
        );
        assert_eq!(
            fetch_payload(&state, Some("abcdefghij"), 1035),
            json!({"error": "No such entry"})
        );
    }

    #[test]
    fn failed_slot_reports_the_error_message() {
        let state = state();
        state.fetch_tokens.set(
            "abcdefghij",
            FetchSlot {
                auth_id: None,
                error: Some("Server error".to_string()),
            },
            30,
            1000,
        );
        assert_eq!(
            fetch_payload(&state, Some("abcdefghij"), 1001),
            json!({"error": "Server error"})
        );
    }
}
