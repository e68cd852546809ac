//! Usage: Refresh subsystem — turns an AuthId into a short-lived access token.
//!
//! Most concurrent refreshes are absorbed by the access-token cache; two
//! simultaneous misses may both call upstream and the last writer wins,
//! which providers tolerate because the refresh token is preserved.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::cache::TtlCache;
use crate::catalog::{Catalog, ServiceConfig};
use crate::oauth::authid::AuthId;
use crate::oauth::token_exchange::{self, RefreshRequest, TokenResponse};
use crate::shared::error::AppResult;
use crate::store::{BlobStore, StoredEntry};

/// A cache hit is only served while this much validity remains.
pub(crate) const MIN_CACHE_REMAINING_SECS: i64 = 30;
/// Clients (and the cache) are told the token lives this much shorter than
/// the provider claims.
pub(crate) const TOKEN_EXPIRY_MARGIN_SECS: i64 = 10;
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
pub(crate) const MIN_REFRESH_TOKEN_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct CachedAccessToken {
    pub token: String,
    pub expires_at_unix: i64,
    pub service_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccessTokenReply {
    pub access_token: String,
    pub expires: i64,
    #[serde(rename = "type")]
    pub service_id: String,
}

pub(crate) async fn refresh_auth_id(
    catalog: &Catalog,
    store: Option<&BlobStore>,
    cache: &TtlCache<CachedAccessToken>,
    client: &reqwest::Client,
    auth_id: &str,
    now_unix: i64,
) -> AppResult<AccessTokenReply> {
    match AuthId::parse(auth_id) {
        Some(AuthId::V2 {
            service_id,
            refresh_token,
        }) => refresh_v2(catalog, cache, client, &service_id, &refresh_token, now_unix).await,
        Some(AuthId::V1 { key_id, password }) => {
            refresh_v1(catalog, store, cache, client, &key_id, &password, now_unix).await
        }
        None => Err("BAD_REQUEST: malformed authid".into()),
    }
}

async fn refresh_v2(
    catalog: &Catalog,
    cache: &TtlCache<CachedAccessToken>,
    client: &reqwest::Client,
    service_id: &str,
    refresh_token: &str,
    now_unix: i64,
) -> AppResult<AccessTokenReply> {
    let service = catalog
        .get(service_id)
        .ok_or_else(|| format!("BAD_REQUEST: no such service {service_id}"))?;
    if refresh_token.len() < MIN_REFRESH_TOKEN_LEN {
        return Err("BAD_REQUEST: refresh token is too short".into());
    }

    let cache_key = v2_cache_key(refresh_token, service_id);
    if let Some(reply) = cached_reply(cache, &cache_key, now_unix) {
        return Ok(reply);
    }

    let response = refresh_against_service(client, service, refresh_token).await?;
    Ok(store_and_reply(cache, &cache_key, &response, service_id, now_unix))
}

async fn refresh_v1(
    catalog: &Catalog,
    store: Option<&BlobStore>,
    cache: &TtlCache<CachedAccessToken>,
    client: &reqwest::Client,
    key_id: &str,
    password: &str,
    now_unix: i64,
) -> AppResult<AccessTokenReply> {
    let store = store.ok_or("BAD_REQUEST: no storage configured")?;

    let cache_key = v1_cache_key(password, key_id);
    if let Some(reply) = cached_reply(cache, &cache_key, now_unix) {
        return Ok(reply);
    }

    let entry = store.get(key_id, password).await?;

    let service = catalog
        .get(&entry.service_id)
        .ok_or_else(|| format!("BAD_REQUEST: no such service {}", entry.service_id))?;
    if entry.refresh_token.len() < MIN_REFRESH_TOKEN_LEN {
        return Err("BAD_REQUEST: stored refresh token is too short".into());
    }

    let response = refresh_against_service(client, service, &entry.refresh_token).await?;

    // Rotation: rewrite the entry under the same keyId/password so the
    // user's AuthId keeps working; empty response fields mean "unchanged".
    let updated = merge_entry(&entry, &response, now_unix);
    store.put(key_id, password, &updated).await?;

    Ok(store_and_reply(
        cache,
        &cache_key,
        &response,
        &entry.service_id,
        now_unix,
    ))
}

async fn refresh_against_service(
    client: &reqwest::Client,
    service: &ServiceConfig,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let request = RefreshRequest {
        token_url: service.auth_url.clone(),
        client_id: service.client_id.clone(),
        client_secret: Some(service.client_secret.clone()).filter(|s| !s.is_empty()),
        refresh_token: refresh_token.to_string(),
        redirect_uri: (!service.no_redirect_uri_for_refresh_request)
            .then(|| service.redirect_uri.clone()),
    };

    let response = token_exchange::refresh_access_token(client, &request).await?;
    if response.access_token.as_deref().unwrap_or("").is_empty() {
        return Err("UPSTREAM_ERROR: refresh response missing access_token".into());
    }
    Ok(response)
}

pub(crate) fn merge_entry(
    entry: &StoredEntry,
    response: &TokenResponse,
    now_unix: i64,
) -> StoredEntry {
    StoredEntry {
        service_id: entry.service_id.clone(),
        expires: response.expires_unix(now_unix),
        access_token: response
            .access_token
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| entry.access_token.clone()),
        refresh_token: response
            .refresh_token
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| entry.refresh_token.clone()),
        json: response.raw.clone(),
    }
}

fn cached_reply(
    cache: &TtlCache<CachedAccessToken>,
    cache_key: &str,
    now_unix: i64,
) -> Option<AccessTokenReply> {
    let cached = cache.get(cache_key, now_unix)?;
    let remaining = cached.expires_at_unix.saturating_sub(now_unix);
    if remaining <= MIN_CACHE_REMAINING_SECS {
        return None;
    }
    Some(AccessTokenReply {
        access_token: cached.token,
        expires: remaining,
        service_id: cached.service_id,
    })
}

fn store_and_reply(
    cache: &TtlCache<CachedAccessToken>,
    cache_key: &str,
    response: &TokenResponse,
    service_id: &str,
    now_unix: i64,
) -> AccessTokenReply {
    let lifetime = response
        .expires_in
        .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS)
        .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS)
        .max(1);
    let token = response.access_token.clone().unwrap_or_default();

    cache.set(
        cache_key,
        CachedAccessToken {
            token: token.clone(),
            expires_at_unix: now_unix.saturating_add(lifetime),
            service_id: service_id.to_string(),
        },
        lifetime,
        now_unix,
    );

    AccessTokenReply {
        access_token: token,
        expires: lifetime,
        service_id: service_id.to_string(),
    }
}

pub(crate) fn v2_cache_key(refresh_token: &str, service_id: &str) -> String {
    format!(
        "/v2/token?id={}&service={}",
        sha256_base64(refresh_token),
        service_id
    )
}

pub(crate) fn v1_cache_key(password: &str, key_id: &str) -> String {
    format!(
        "/v1/token?password={}&id={}",
        sha256_base64(password),
        key_id
    )
}

fn sha256_base64(value: &str) -> String {
    STANDARD.encode(Sha256::digest(value.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_base64_uses_standard_alphabet_with_padding() {
        assert_eq!(
            sha256_base64("abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn cache_keys_embed_hash_and_identity() {
        let key = v2_cache_key("refresh", "gd");
        assert!(key.starts_with("/v2/token?id="));
        assert!(key.ends_with("&service=gd"));

        let key = v1_cache_key("password", "00ff");
        assert!(key.starts_with("/v1/token?password="));
        assert!(key.ends_with("&id=00ff"));
    }

    #[test]
    fn cached_reply_requires_thirty_seconds_of_validity() {
        let cache = TtlCache::new();
        cache.set(
            "k",
            CachedAccessToken {
                token: "T".to_string(),
                expires_at_unix: 1100,
                service_id: "gd".to_string(),
            },
            1000,
            100,
        );

        // 70 seconds remaining: served.
        let reply = cached_reply(&cache, "k", 1030).expect("hit");
        assert_eq!(reply.access_token, "T");
        assert_eq!(reply.expires, 70);

        // 25 seconds remaining: treated as a miss.
        assert!(cached_reply(&cache, "k", 1075).is_none());
    }

    #[test]
    fn store_and_reply_applies_the_ten_second_margin() {
        let cache = TtlCache::new();
        let response = TokenResponse {
            access_token: Some("A".to_string()),
            expires_in: Some(3600),
            ..TokenResponse::default()
        };

        let reply = store_and_reply(&cache, "k", &response, "gd", 1000);
        assert_eq!(reply.expires, 3590);
        assert_eq!(reply.service_id, "gd");

        let cached = cache.get("k", 1000).expect("cached");
        assert_eq!(cached.expires_at_unix, 4590);
    }

    #[test]
    fn merge_entry_preserves_fields_the_response_omitted() {
        let entry = StoredEntry {
            service_id: "gd".to_string(),
            expires: 1000,
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            json: "old".to_string(),
        };
        let response = TokenResponse {
            access_token: Some("A2".to_string()),
            refresh_token: None,
            expires_in: Some(3600),
            expires: None,
            raw: "new".to_string(),
        };

        let merged = merge_entry(&entry, &response, 2000);
        assert_eq!(merged.access_token, "A2");
        assert_eq!(merged.refresh_token, "R1");
        assert_eq!(merged.expires, 5600);
        assert_eq!(merged.json, "new");
    }

    #[test]
    fn merge_entry_adopts_a_rotated_refresh_token() {
        let entry = StoredEntry {
            service_id: "gd".to_string(),
            expires: 1000,
            access_token: "A1".to_string(),
            refresh_token: "R1".to_string(),
            json: "old".to_string(),
        };
        let response = TokenResponse {
            access_token: Some("A2".to_string()),
            refresh_token: Some("R2".to_string()),
            expires_in: Some(3600),
            expires: None,
            raw: "new".to_string(),
        };

        assert_eq!(merge_entry(&entry, &response, 2000).refresh_token, "R2");
    }
}
