//! Usage: Unified application error model (maps internal failures to `CODE: message` strings).

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub type AppResult<T> = Result<T, AppError>;

/// Missing or invalid caller input.
pub const BAD_REQUEST: &str = "BAD_REQUEST";
/// A V1 credential failed to decrypt; deliberately opaque to the caller.
pub const DECRYPT_FAILED: &str = "DECRYPT_FAILED";
/// The provider's token endpoint returned non-2xx or malformed JSON.
pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";
/// Anything that is the server's own fault (collision, filesystem, template).
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";

pub(crate) const DECRYPT_FAILED_REASON: &str = "Invalid key or password";

#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    code: String,
    message: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            BAD_REQUEST => StatusCode::BAD_REQUEST,
            DECRYPT_FAILED => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn split_code_message(raw: &str) -> Option<(&str, &str)> {
    let msg = raw.trim();
    let msg = msg.strip_prefix("Error:").unwrap_or(msg).trim();
    if msg.is_empty() {
        return None;
    }

    let (maybe_code, rest) = msg.split_once(':')?;
    let code = maybe_code.trim();
    if code.is_empty() {
        return None;
    }
    let mut chars = code.chars();
    let first = chars.next()?;
    if !first.is_ascii_uppercase() {
        return None;
    }
    if !chars.all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_') {
        return None;
    }
    Some((code, rest.trim()))
}

impl From<String> for AppError {
    fn from(value: String) -> Self {
        if let Some((code, rest)) = split_code_message(&value) {
            let message = if rest.is_empty() { value.trim() } else { rest };
            return AppError::new(code.to_string(), message.to_string());
        }
        AppError::new(INTERNAL_ERROR, value)
    }
}

impl From<&'static str> for AppError {
    fn from(value: &'static str) -> Self {
        AppError::from(value.to_string())
    }
}

impl From<AppError> for String {
    fn from(value: AppError) -> Self {
        value.to_string()
    }
}

/// Single conversion point from thrown-through errors to HTTP responses.
/// Messages are always the service's own wording; upstream bodies never
/// reach this path (token_exchange keeps them in the logs only).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.code, "request failed: {}", self.message);
        } else {
            tracing::debug!(code = %self.code, "request rejected: {}", self.message);
        }

        let decrypt_failed = self.code == DECRYPT_FAILED;
        let mut response = (status, self.message).into_response();
        if decrypt_failed {
            if let Ok(value) = DECRYPT_FAILED_REASON.parse() {
                response.headers_mut().insert("x-reason", value);
            }
        }
        response
    }
}
