//! Usage: Credential material generation (passwords and hex key identifiers).
//!
//! One CSPRNG is shared behind a process-wide mutex; handlers on any number
//! of request tasks draw from it without per-call seeding.

use std::sync::{Mutex, OnceLock};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::shared::locking::recover_lock;

pub(crate) const DEFAULT_PASSWORD_LENGTH: usize = 32;
pub(crate) const HEX_KEY_BYTES: usize = 16;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const DIGITS: &[u8] = b"0123456789";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SYMBOLS: &[u8] = b"!-_.";
const CLASSES: [&[u8]; 4] = [LOWER, DIGITS, UPPER, SYMBOLS];

fn shared_rng() -> &'static Mutex<StdRng> {
    static RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();
    RNG.get_or_init(|| Mutex::new(StdRng::from_entropy()))
}

fn alphabet_len() -> usize {
    CLASSES.iter().map(|c| c.len()).sum()
}

/// Map a flat index over the concatenated alphabet to (class index, char).
fn char_at(mut index: usize) -> (usize, char) {
    for (class, chars) in CLASSES.iter().enumerate() {
        if index < chars.len() {
            return (class, chars[index] as char);
        }
        index -= chars.len();
    }
    unreachable!("index is drawn from 0..alphabet_len()");
}

/// Generate a password where consecutive characters never come from the
/// same character class (lowercase, digits, uppercase, `!-_.`).
pub(crate) fn generate_password() -> String {
    generate_password_with_length(DEFAULT_PASSWORD_LENGTH)
}

pub(crate) fn generate_password_with_length(length: usize) -> String {
    let mut rng = recover_lock(shared_rng());
    let mut out = String::with_capacity(length);
    let mut previous_class: Option<usize> = None;

    while out.len() < length {
        let (class, ch) = char_at(rng.gen_range(0..alphabet_len()));
        if previous_class == Some(class) {
            continue;
        }
        previous_class = Some(class);
        out.push(ch);
    }

    out
}

/// 32 lowercase-hex characters; used for OAuth state keys and V1 keyIds.
pub(crate) fn random_hex_key() -> String {
    let mut bytes = [0u8; HEX_KEY_BYTES];
    recover_lock(shared_rng()).fill_bytes(&mut bytes);

    let mut out = String::with_capacity(HEX_KEY_BYTES * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
