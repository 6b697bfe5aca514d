use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::session::Session;
use crate::vault;

use super::SessionStore;

/// Encrypted on-disk session store: one sealed blob at a fixed path.
///
/// A blob that cannot be decrypted or parsed is discarded as "no session"
/// rather than surfaced as an error, so a corrupt cache can never lock a
/// user out of the login flow.
pub struct EncryptedFileStore {
    path: PathBuf,
    passphrase: String,
}

impl EncryptedFileStore {
    pub fn new(path: PathBuf, passphrase: impl Into<String>) -> Self {
        Self {
            path,
            passphrase: passphrase.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for EncryptedFileStore {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let blob = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read session file: {}", self.path.display()))?;

        let plaintext = match vault::open(&self.passphrase, &blob) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                return Ok(None);
            }
        };

        match serde_json::from_slice::<Session>(&plaintext) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Discarding malformed session file");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let plaintext = serde_json::to_vec(session).context("Failed to serialize session")?;
        let blob = vault::seal(&self.passphrase, &plaintext)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        std::fs::write(&self.path, blob)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;

        debug!(path = %self.path.display(), "Session persisted");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            })?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
