//! Usage: Encrypted filesystem store for V1 credentials.
//!
//! One directory, one file per credential, file name = keyId (lowercase
//! hex). Writes go through a `.tmp` sibling and a rename so a reader never
//! observes a half-written blob; a torn write fails decryption and surfaces
//! as the same opaque error as a wrong password.

pub(crate) mod crypto;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::shared::error::AppResult;

/// The persisted payload referenced by a V1 AuthId. `json` carries the
/// provider's token response verbatim; empty strings mean "not present".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub service_id: String,
    pub expires: i64,
    pub access_token: String,
    pub refresh_token: String,
    pub json: String,
}

#[derive(Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn open(root: impl Into<PathBuf>) -> AppResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| format!("INTERNAL_ERROR: storage dir {} unusable: {e}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn put(&self, key_id: &str, password: &str, entry: &StoredEntry) -> AppResult<()> {
        let path = self
            .entry_path(key_id)
            .ok_or_else(|| format!("INTERNAL_ERROR: invalid storage key {key_id}"))?;
        let plain = serde_json::to_vec(entry)
            .map_err(|e| format!("INTERNAL_ERROR: entry serialization failed: {e}"))?;
        let blob = crypto::encrypt(password, &plain)?;

        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, &blob)
            .await
            .map_err(|e| format!("INTERNAL_ERROR: entry write failed: {e}"))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| format!("INTERNAL_ERROR: entry rename failed: {e}"))?;
        Ok(())
    }

    /// Read and decrypt one entry. Every failure mode (unknown key, wrong
    /// password, corrupt or unparsable blob) collapses into `DECRYPT_FAILED`
    /// so the caller cannot probe which keys exist.
    pub async fn get(&self, key_id: &str, password: &str) -> AppResult<StoredEntry> {
        let opaque = || "DECRYPT_FAILED: stored payload could not be decrypted".to_string();

        let path = self.entry_path(key_id).ok_or_else(opaque)?;
        let blob = tokio::fs::read(&path).await.map_err(|_| opaque())?;
        let plain = crypto::decrypt(password, &blob)?;
        serde_json::from_slice(&plain).map_err(|_| opaque().into())
    }

    pub async fn delete(&self, key_id: &str) -> AppResult<()> {
        let path = self
            .entry_path(key_id)
            .ok_or_else(|| format!("INTERNAL_ERROR: invalid storage key {key_id}"))?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| format!("INTERNAL_ERROR: entry delete failed: {e}"))?;
        Ok(())
    }

    /// Key ids are generated as lowercase hex; anything else never names a
    /// file (and keeps path separators out of the store).
    fn entry_path(&self, key_id: &str) -> Option<PathBuf> {
        if key_id.is_empty() || key_id.len() > 64 {
            return None;
        }
        if !key_id
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        {
            return None;
        }
        Some(self.root.join(key_id))
    }
}
