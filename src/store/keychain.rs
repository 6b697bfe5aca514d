use anyhow::{Context, Result};
use keyring::Entry;
use rand::distributions::{Alphanumeric, DistString};
use rand::rngs::OsRng;
use tracing::{info, warn};

use crate::session::Session;

use super::SessionStore;

/// Keychain service identifier for all entries owned by this crate
const SERVICE_NAME: &str = "sessionvault";

/// Keychain account holding the serialized session
const SESSION_ACCOUNT: &str = "session";

/// Keychain account holding the generated file-store passphrase
const PASSPHRASE_ACCOUNT: &str = "vault-passphrase";

/// Length of generated passphrases
const PASSPHRASE_LENGTH: usize = 48;

/// Session store backed by the OS keychain.
///
/// The keychain already encrypts at rest, so the session is stored as
/// plain serialized JSON under a single service/account entry.
pub struct KeychainStore {
    service: String,
    account: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME, SESSION_ACCOUNT)
    }

    pub fn with_service(service: &str, account: &str) -> Self {
        Self {
            service: service.to_string(),
            account: account.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeychainStore {
    fn load(&self) -> Result<Option<Session>> {
        let stored = match self.entry()?.get_password() {
            Ok(stored) => stored,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e).context("Failed to read session from keychain"),
        };

        match serde_json::from_str::<Session>(&stored) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "Discarding malformed keychain session");
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        let contents = serde_json::to_string(session).context("Failed to serialize session")?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store session in keychain")
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session from keychain"),
        }
    }
}

/// Passphrase for the encrypted file store, provisioned via the OS
/// keychain: loaded when present, generated and stored on first use.
pub fn vault_passphrase() -> Result<String> {
    let entry = Entry::new(SERVICE_NAME, PASSPHRASE_ACCOUNT)
        .context("Failed to create keyring entry")?;

    match entry.get_password() {
        Ok(passphrase) => Ok(passphrase),
        Err(keyring::Error::NoEntry) => {
            let passphrase = Alphanumeric.sample_string(&mut OsRng, PASSPHRASE_LENGTH);
            entry
                .set_password(&passphrase)
                .context("Failed to store generated passphrase in keychain")?;
            info!("Generated a new vault passphrase in the OS keychain");
            Ok(passphrase)
        }
        Err(e) => Err(e).context("Failed to read passphrase from keychain"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TokenSet;

    // Exercises the real OS keychain; run with --ignored on a desktop.
    #[test]
    #[ignore = "requires an OS keychain"]
    fn test_keychain_round_trip() {
        let store = KeychainStore::with_service("sessionvault-test", "session-test");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());

        let session = Session::new(
            None,
            TokenSet::new("access-1".to_string(), "refresh-1".to_string()),
        );
        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
