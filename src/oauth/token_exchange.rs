//! Usage: Provider token endpoint client (authorization_code, refresh_token
//! and password grants).
//!
//! Every call is a single attempt carrying the request's cancellation (the
//! handler future owns the outbound call). Provider error bodies never reach
//! clients; they are redacted and logged here only.

use std::collections::HashMap;

use serde_json::Value;

use crate::shared::error::AppResult;
use crate::shared::security::mask_token;

#[derive(Debug, Clone)]
pub(crate) struct CodeExchangeRequest {
    pub(crate) token_url: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: String,
    pub(crate) code: String,
    pub(crate) redirect_uri: String,
}

#[derive(Debug, Clone)]
pub(crate) struct RefreshRequest {
    pub(crate) token_url: String,
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) refresh_token: String,
    pub(crate) redirect_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct PasswordGrantRequest {
    pub(crate) token_url: String,
    pub(crate) client_id: String,
    pub(crate) scope: String,
    pub(crate) username: String,
    pub(crate) password: String,
}

/// Parsed token response plus the verbatim body (persisted for V1 entries).
#[derive(Debug, Clone, Default)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: Option<String>,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: Option<i64>,
    pub(crate) expires: Option<i64>,
    pub(crate) raw: String,
}

impl TokenResponse {
    /// Absolute expiry for a stored entry; providers disagree on which
    /// field they send, and some send none, hence the floor.
    pub(crate) fn expires_unix(&self, now_unix: i64) -> i64 {
        let lifetime = self
            .expires
            .unwrap_or(0)
            .max(self.expires_in.unwrap_or(0))
            .max(1000);
        now_unix.saturating_add(lifetime)
    }
}

pub(crate) async fn exchange_authorization_code(
    client: &reqwest::Client,
    req: &CodeExchangeRequest,
) -> AppResult<TokenResponse> {
    let mut form: HashMap<&str, String> = HashMap::new();
    form.insert("client_id", req.client_id.trim().to_string());
    form.insert("redirect_uri", req.redirect_uri.trim().to_string());
    form.insert("client_secret", req.client_secret.trim().to_string());
    form.insert("code", req.code.trim().to_string());
    form.insert("grant_type", "authorization_code".to_string());

    post_token_form(client, req.token_url.trim(), &form).await
}

pub(crate) async fn refresh_access_token(
    client: &reqwest::Client,
    req: &RefreshRequest,
) -> AppResult<TokenResponse> {
    let mut form: HashMap<&str, String> = HashMap::new();
    form.insert("client_id", req.client_id.trim().to_string());
    form.insert("refresh_token", req.refresh_token.trim().to_string());
    form.insert("grant_type", "refresh_token".to_string());
    if let Some(secret) = req.client_secret.as_deref().map(str::trim) {
        if !secret.is_empty() {
            form.insert("client_secret", secret.to_string());
        }
    }
    if let Some(redirect_uri) = req.redirect_uri.as_deref().map(str::trim) {
        if !redirect_uri.is_empty() {
            form.insert("redirect_uri", redirect_uri.to_string());
        }
    }

    post_token_form(client, req.token_url.trim(), &form).await
}

pub(crate) async fn password_grant(
    client: &reqwest::Client,
    req: &PasswordGrantRequest,
) -> AppResult<TokenResponse> {
    let mut form: HashMap<&str, String> = HashMap::new();
    form.insert("grant_type", "password".to_string());
    form.insert("client_id", req.client_id.trim().to_string());
    form.insert("scope", req.scope.trim().to_string());
    form.insert("username", req.username.trim().to_string());
    form.insert("password", req.password.trim().to_string());

    post_token_form(client, req.token_url.trim(), &form).await
}

async fn post_token_form(
    client: &reqwest::Client,
    token_url: &str,
    form: &HashMap<&str, String>,
) -> AppResult<TokenResponse> {
    let response = client.post(token_url).form(form).send().await.map_err(|e| {
        tracing::warn!(token_url = %token_url, "token endpoint request failed: {e}");
        "UPSTREAM_ERROR: provider token endpoint unreachable".to_string()
    })?;

    parse_token_response(response).await
}

async fn parse_token_response(response: reqwest::Response) -> AppResult<TokenResponse> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|_| "UPSTREAM_ERROR: provider token response read failed".to_string())?;

    if !status.is_success() {
        let (error_code, error_message) = parse_oauth_error_details(&body);
        tracing::warn!(
            status = status.as_u16(),
            code = error_code.as_deref().unwrap_or(""),
            message = error_message.as_deref().unwrap_or(""),
            body = %sanitize_error_body_snippet(&body),
            "provider token endpoint rejected the request"
        );
        return Err("UPSTREAM_ERROR: provider token endpoint rejected the request".into());
    }

    let value: Value = serde_json::from_str(&body).map_err(|_| {
        tracing::warn!(body = %sanitize_error_body_snippet(&body), "token response is not JSON");
        "UPSTREAM_ERROR: provider token response was not valid JSON".to_string()
    })?;

    Ok(TokenResponse {
        access_token: string_field(&value, "access_token"),
        refresh_token: string_field(&value, "refresh_token"),
        expires_in: value.get("expires_in").and_then(parse_i64_lossy),
        expires: value.get("expires").and_then(parse_i64_lossy),
        raw: body,
    })
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_i64_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let key_lc = key.trim().to_ascii_lowercase();
    key_lc.contains("token") || key_lc.contains("secret") || key_lc == "authorization"
}

fn redact_sensitive_json_fields(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                if is_sensitive_key(key) {
                    if let Some(raw) = nested.as_str() {
                        *nested = Value::String(mask_token(raw));
                        continue;
                    }
                }
                redact_sensitive_json_fields(nested);
            }
        }
        Value::Array(items) => {
            for nested in items {
                redact_sensitive_json_fields(nested);
            }
        }
        _ => {}
    }
}

/// Log-safe rendering of a provider body: sensitive fields masked, length capped.
fn sanitize_error_body_snippet(body: &str) -> String {
    if let Ok(mut value) = serde_json::from_str::<Value>(body) {
        redact_sensitive_json_fields(&mut value);
        if let Ok(encoded) = serde_json::to_string(&value) {
            return encoded.chars().take(500).collect();
        }
    }
    body.chars().take(500).collect()
}

fn parse_oauth_error_details(body: &str) -> (Option<String>, Option<String>) {
    let value: Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return (None, None),
    };

    let mut code = string_field(&value, "code");
    let mut message = string_field(&value, "error_description");

    if let Some(error_value) = value.get("error") {
        if let Some(err_str) = error_value.as_str() {
            if code.is_none() {
                code = Some(err_str.trim().to_string());
            }
        } else if let Some(err_obj) = error_value.as_object() {
            if code.is_none() {
                code = err_obj
                    .get("code")
                    .and_then(Value::as_str)
                    .or_else(|| err_obj.get("type").and_then(Value::as_str))
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
            if message.is_none() {
                message = err_obj
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string);
            }
        }
    }

    (code, message)
}
