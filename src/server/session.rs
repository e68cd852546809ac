//! Usage: Transient per-flow state carried between the OAuth handlers.
//!
//! All three lifetimes are enforced by the TTL caches; nothing here is
//! persisted.

/// Server-side state bound to the opaque `state` key handed to the provider.
pub const REQUEST_STATE_TTL_SECS: i64 = 10 * 60;
/// A pre-registered fetch token waits this long for the browser flow.
pub const FETCH_PENDING_TTL_SECS: i64 = 5 * 60;
/// Once the AuthId (or an error) is attached, the slot shrinks to this.
pub const FETCH_COMPLETED_TTL_SECS: i64 = 30;

const FETCH_TOKEN_MIN_LEN: usize = 8;

/// Fetch-token keys are caller-chosen; anything this short is ignored.
pub fn acceptable_fetch_token(token: &str) -> bool {
    token.len() > FETCH_TOKEN_MIN_LEN
}

/// Stored under the state key by StartLogin, consumed by CompleteLogin.
#[derive(Debug, Clone)]
pub struct RequestState {
    pub service_id: String,
    pub fetch_token: Option<String>,
    pub use_v2: bool,
}

/// Rendezvous slot a CLI polls while the browser flow runs elsewhere.
#[derive(Debug, Clone, Default)]
pub struct FetchSlot {
    pub auth_id: Option<String>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::acceptable_fetch_token;

    #[test]
    fn fetch_tokens_must_be_longer_than_eight_chars() {
        assert!(!acceptable_fetch_token("12345678"));
        assert!(acceptable_fetch_token("123456789"));
    }
}
