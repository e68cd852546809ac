//! Usage: The nine endpoints of the OAuth state machine.

pub(crate) mod cli_token;
pub(crate) mod fetch;
pub(crate) mod index;
pub(crate) mod logged_in;
pub(crate) mod login;
pub(crate) mod privacy;
pub(crate) mod refresh;
pub(crate) mod revoke;

use axum::body::Body;
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};

/// Plain 302; axum's `Redirect` helpers emit 303/307, which some provider
/// login pages treat differently.
pub(crate) fn found(location: &str) -> Response {
    Response::builder()
        .status(StatusCode::FOUND)
        .header(LOCATION, location)
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn found_sets_302_and_location() {
        let response = found("https://example.com/auth?x=1");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("https://example.com/auth?x=1")
        );
    }
}
