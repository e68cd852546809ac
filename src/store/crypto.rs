//! Usage: AES-256-GCM payload encryption for the blob store and the secrets file.
//!
//! Key = SHA-256(password); blob layout = nonce || ciphertext. Decryption
//! failures are reported through one opaque error kind so callers cannot
//! distinguish a wrong password from a corrupt or truncated blob.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use sha2::{Digest, Sha256};

use crate::shared::error::AppResult;

const NONCE_LEN: usize = 12;

fn derive_key(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

pub(crate) fn encrypt(password: &str, plaintext: &[u8]) -> AppResult<Vec<u8>> {
    let key = derive_key(password);
    let cipher = Aes256Gcm::new((&key).into());
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| "INTERNAL_ERROR: payload encryption failed".to_string())?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

pub(crate) fn decrypt(password: &str, blob: &[u8]) -> AppResult<Vec<u8>> {
    if blob.len() <= NONCE_LEN {
        return Err("DECRYPT_FAILED: stored payload could not be decrypted".into());
    }

    let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
    let key = derive_key(password);
    let cipher = Aes256Gcm::new((&key).into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| "DECRYPT_FAILED: stored payload could not be decrypted".into())
}
