//! sessionvault - Client-side session management library
//!
//! Keeps a user session alive across process restarts: tokens and the
//! user payload live in an encrypted on-disk cache, access tokens are
//! refreshed on demand with single-flight and throttle guarantees, and
//! every state transition is observable through a watch channel.
//!
//! # Core Modules
//!
//! - [`session`] - The session manager, its state types, and snapshots
//! - [`api`] - HTTP client, auth endpoints, and the 401 retry layer
//! - [`store`] - Pluggable session persistence (encrypted file, keychain, memory)
//! - [`vault`] - Passphrase-based authenticated encryption for the cache
//! - [`config`] - Configuration file handling and environment overrides
//! - [`models`] - Credentials and the user profile payload
//!
//! # Getting started
//!
//! ```no_run
//! use std::sync::Arc;
//! use sessionvault::{Config, Credentials, SessionManager};
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::load()?;
//! let manager = Arc::new(SessionManager::from_config(&config)?);
//!
//! // Decide what the persisted cache is worth before showing any UI.
//! manager.check_auth().await;
//!
//! if !manager.is_authenticated().await {
//!     let user = manager
//!         .login(&Credentials::new("ada@example.com", "correct horse"))
//!         .await?;
//!     println!("signed in as {}", user.display_name());
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod models;
pub mod session;
pub mod store;
pub mod vault;

// Re-export the session types
pub use session::{
    Session, SessionManager, SessionPhase, SessionSettings, SessionSnapshot, TokenSet,
};

// Re-export the API surface
pub use api::{
    with_token_retry, ApiClient, ApiError, AuthApi, AuthorizedClient, LoginReply, TokenSource,
};

// Re-export persistence backends
pub use store::{EncryptedFileStore, KeychainStore, MemoryStore, SessionStore};

// Re-export configuration and model types
pub use config::Config;
pub use models::{Credentials, UserProfile};
