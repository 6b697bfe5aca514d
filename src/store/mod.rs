//! Session persistence backends.
//!
//! Everything behind [`SessionStore`] is swappable:
//! - `EncryptedFileStore`: encrypted blob on disk, the production default
//! - `KeychainStore`: the OS keychain, for hosts that prefer it
//! - `MemoryStore`: in-process slot for tests
//!
//! Encryption lives entirely behind the trait; the session manager never
//! touches key material.

pub mod file;
pub mod keychain;
pub mod memory;

pub use file::EncryptedFileStore;
pub use keychain::{vault_passphrase, KeychainStore};
pub use memory::MemoryStore;

use anyhow::Result;

use crate::session::Session;

/// Where the single persisted session lives.
///
/// `load` reports a missing or unreadable session as `Ok(None)`; an `Err`
/// means the backend itself failed in a way worth surfacing. `clear` is
/// idempotent.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    fn save(&self, session: &Session) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
