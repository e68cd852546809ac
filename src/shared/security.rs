//! Usage: Log redaction for credential material.
//!
//! Log lines keep just enough of a token to correlate repeated failures
//! (a short prefix plus the length) and never enough to replay it. Short
//! tokens carry no safely printable prefix at all.

/// How many leading characters stay readable on long tokens.
const VISIBLE_PREFIX_CHARS: usize = 4;
/// Below this many characters the whole token is blanked.
const FULL_REDACTION_LEN: usize = 12;

pub(crate) fn mask_token(token: &str) -> String {
    let token = token.trim();
    if token.is_empty() {
        return String::new();
    }

    let char_count = token.chars().count();
    if char_count < FULL_REDACTION_LEN {
        return "<redacted>".to_string();
    }

    let prefix: String = token.chars().take(VISIBLE_PREFIX_CHARS).collect();
    format!("{prefix}...({char_count} chars)")
}
