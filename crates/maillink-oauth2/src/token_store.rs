//! `token.json` persistence with owner-only file permissions.
//!
//! Rotated refresh tokens are written immediately. Writes go to a
//! temporary sibling first and are renamed into place, so a crash never
//! leaves a truncated token file behind.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::OAuthError;
use crate::types::StoredTokens;

/// Handle to a single token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a token file is present (used to pick the auth strategy).
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the stored tokens, `None` when the file does not exist.
    pub fn load(&self) -> Result<Option<StoredTokens>, OAuthError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)
            .map_err(|e| OAuthError::Store(format!("failed to read token file: {e}")))?;
        let tokens: StoredTokens = serde_json::from_str(&json)
            .map_err(|e| OAuthError::Store(format!("failed to parse token file: {e}")))?;

        debug!(path = %self.path.display(), "loaded tokens");
        Ok(Some(tokens))
    }

    /// Persist tokens. File permissions are set to 0600 before the rename.
    pub fn save(&self, tokens: &StoredTokens) -> Result<(), OAuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| OAuthError::Store(format!("failed to create token dir: {e}")))?;
        }

        let json = serde_json::to_string_pretty(tokens)
            .map_err(|e| OAuthError::Store(format!("failed to serialize tokens: {e}")))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| OAuthError::Store(format!("failed to write token file: {e}")))?;
        set_owner_only(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)
            .map_err(|e| OAuthError::Store(format!("failed to rename token file: {e}")))?;

        debug!(path = %self.path.display(), "stored tokens");
        Ok(())
    }
}

fn set_owner_only(path: &Path) -> Result<(), OAuthError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| OAuthError::Store(format!("failed to set file permissions: {e}")))?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}
