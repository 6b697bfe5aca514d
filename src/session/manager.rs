//! The session manager: login, logout, bootstrap, and token refresh.
//!
//! One `SessionManager` is constructed per process and shared behind an
//! `Arc`. Every state transition is published over a `tokio::sync::watch`
//! channel; subscribers receive a [`SessionSnapshot`] per transition.
//!
//! Refresh discipline:
//! - at most one refresh request is in flight; concurrent callers wait
//!   for the running one and are then served from cache
//! - attempts inside the minimum refresh interval are answered with the
//!   currently cached token, without touching the network
//! - a failed refresh tears the whole session down (forced logout)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::api::{with_token_retry, ApiClient, ApiError, AuthApi, TokenSource};
use crate::config::Config;
use crate::models::{Credentials, UserProfile};
use crate::store::{vault_passphrase, EncryptedFileStore, SessionStore};

use super::{Session, SessionPhase, SessionSnapshot, TokenSet};

// ============================================================================
// Constants
// ============================================================================

/// Default minimum interval between refresh attempts in milliseconds.
/// Rapid-fire callers inside this window share one network refresh.
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 2000;

/// Default maximum cached-session age before bootstrap refetches the
/// user payload.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 300;

/// Environment variable overriding the keychain-provisioned passphrase,
/// for headless environments without a keychain service.
const PASSPHRASE_ENV: &str = "SESSIONVAULT_PASSPHRASE";

/// Timing knobs for the session manager.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    /// Minimum gap between token refresh attempts.
    pub refresh_interval: Duration,
    /// Maximum cached-session age before the user payload is refetched.
    pub freshness_window: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(DEFAULT_REFRESH_INTERVAL_MS),
            freshness_window: Duration::from_secs(DEFAULT_FRESHNESS_WINDOW_SECS),
        }
    }
}

/// In-memory state guarded by one lock: the session plus the bootstrap
/// loading flag. Store writes happen under this lock too, so the
/// persisted blob follows the in-memory transitions in order.
#[derive(Debug)]
struct SessionState {
    session: Option<Session>,
    loading: bool,
}

/// Refresh bookkeeping. Holding the surrounding mutex is the single-flight
/// guarantee; the timestamp inside it is the throttle clock.
#[derive(Debug, Default)]
struct RefreshGate {
    last_attempt: Option<Instant>,
}

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Box<dyn SessionStore>,
    settings: SessionSettings,
    state: RwLock<SessionState>,
    refresh_gate: Mutex<RefreshGate>,
    bootstrap_running: AtomicBool,
    watch_tx: watch::Sender<SessionSnapshot>,
}

impl SessionManager {
    /// Create a manager over the given API and store. Rehydrates from the
    /// store immediately; a missing or unreadable cache means starting
    /// unauthenticated.
    pub fn new(
        api: Arc<dyn AuthApi>,
        store: Box<dyn SessionStore>,
        settings: SessionSettings,
    ) -> Self {
        let session = match store.load() {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted session; starting unauthenticated");
                None
            }
        };
        if session.is_some() {
            debug!("Rehydrated persisted session");
        }

        let snapshot = SessionSnapshot {
            phase: phase_of(&session),
            loading: true,
            user: session.as_ref().and_then(|s| s.user.clone()),
        };
        let (watch_tx, _) = watch::channel(snapshot);

        Self {
            api,
            store,
            settings,
            state: RwLock::new(SessionState {
                session,
                loading: true,
            }),
            refresh_gate: Mutex::new(RefreshGate::default()),
            bootstrap_running: AtomicBool::new(false),
            watch_tx,
        }
    }

    /// Assemble the production stack from configuration: HTTP client,
    /// keychain-provisioned passphrase, and the encrypted on-disk store.
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.api_base_url.is_empty() {
            anyhow::bail!("API base URL is not configured; set SESSIONVAULT_API_URL or api_base_url");
        }

        let api = ApiClient::new(&config.api_base_url, config.request_timeout())
            .context("Failed to build API client")?;

        let passphrase = match std::env::var(PASSPHRASE_ENV) {
            Ok(passphrase) if !passphrase.is_empty() => passphrase,
            _ => vault_passphrase().context("Failed to provision vault passphrase")?,
        };
        let store = EncryptedFileStore::new(config.session_path()?, passphrase);

        Ok(Self::new(
            Arc::new(api),
            Box::new(store),
            config.session_settings(),
        ))
    }

    // ========================================================================
    // Observation
    // ========================================================================

    /// Subscribe to state changes. The receiver sees the current snapshot
    /// immediately and every transition afterwards.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.watch_tx.subscribe()
    }

    /// Current observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.watch_tx.borrow().clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.session.is_some()
    }

    /// Currently held access token, if any.
    pub async fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .session
            .as_ref()
            .map(|s| s.tokens.access_token.clone())
    }

    fn publish(&self, state: &SessionState) {
        let snapshot = SessionSnapshot {
            phase: phase_of(&state.session),
            loading: state.loading,
            user: state.session.as_ref().and_then(|s| s.user.clone()),
        };
        debug!(phase = %snapshot.phase, loading = snapshot.loading, "Session state published");
        self.watch_tx.send_replace(snapshot);
    }

    /// Write the session to the store. Callers hold the state write lock.
    fn persist(&self, session: &Session) {
        if let Err(e) = self.store.save(session) {
            warn!(error = %e, "Failed to persist session");
        }
    }

    // ========================================================================
    // Lifecycle operations
    // ========================================================================

    /// Exchange credentials for a fresh session. Transport and validation
    /// errors propagate unchanged; there is no retry. A successful login
    /// replaces any prior session.
    ///
    /// Callers must not run two logins concurrently.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile> {
        let reply = self.api.login(credentials).await.context("Login failed")?;

        let session = Session::new(
            Some(reply.user.clone()),
            TokenSet::new(reply.access_token, reply.refresh_token),
        );
        {
            let mut state = self.state.write().await;
            state.session = Some(session.clone());
            state.loading = false;
            self.publish(&state);
            self.persist(&session);
        }
        info!("Login succeeded");
        Ok(reply.user)
    }

    /// Log out: best-effort server call, then unconditional local
    /// teardown. Safe to call when already unauthenticated.
    pub async fn logout(&self) {
        if let Some(token) = self.access_token().await {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "Server-side logout failed; clearing local session anyway");
            }
        }
        self.clear_local_session().await;
        info!("Logged out");
    }

    /// Bootstrap pass: decide whether the held session is usable,
    /// refetching the user payload when it is missing or stale. Reentrant
    /// calls while a pass is running return immediately.
    pub async fn check_auth(&self) {
        if self.bootstrap_running.swap(true, Ordering::SeqCst) {
            debug!("Bootstrap already running; skipping");
            return;
        }
        self.run_check_auth().await;
        self.bootstrap_running.store(false, Ordering::SeqCst);
    }

    async fn run_check_auth(&self) {
        let status = {
            let state = self.state.read().await;
            state
                .session
                .as_ref()
                .map(|s| (s.user.is_some(), s.is_fresh(self.settings.freshness_window)))
        };

        match status {
            None => {
                debug!("No session held; finishing bootstrap unauthenticated");
            }
            Some((true, true)) => {
                debug!("Cached session is fresh; bootstrap needs no network traffic");
            }
            Some((_, _)) => {
                if self.fetch_user_data(true).await.is_none() {
                    warn!("Bootstrap could not obtain a user payload");
                    // Teardown publishes loading = false on its way out.
                    self.force_logout().await;
                    return;
                }
            }
        }

        let mut state = self.state.write().await;
        state.loading = false;
        self.publish(&state);
    }

    /// Fetch the current user's profile. Serves the cached payload when it
    /// is fresh and `force` is false; a 401 is recovered by one token
    /// refresh and replay. Returns `None` on any failure.
    pub async fn fetch_user_data(&self, force: bool) -> Option<UserProfile> {
        {
            let state = self.state.read().await;
            match state.session.as_ref() {
                None => {
                    debug!("No session; cannot fetch user payload");
                    return None;
                }
                Some(session) => {
                    if !force
                        && session.user.is_some()
                        && session.is_fresh(self.settings.freshness_window)
                    {
                        debug!("Serving cached user payload");
                        return session.user.clone();
                    }
                }
            }
        }

        let fetched = with_token_retry(self, |token| async move {
            match token {
                Some(token) => self.api.fetch_profile(&token).await,
                None => Err(ApiError::Unauthorized),
            }
        })
        .await;

        match fetched {
            Ok(user) => {
                {
                    let mut state = self.state.write().await;
                    let Some(session) = state.session.as_mut() else {
                        // Logged out mid-fetch; do not resurrect the session.
                        return Some(user);
                    };
                    session.update_user(user.clone());
                    let session = session.clone();
                    self.publish(&state);
                    self.persist(&session);
                }
                debug!("User payload refreshed");
                Some(user)
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch user payload");
                None
            }
        }
    }

    /// Obtain a usable access token, refreshing over the network at most
    /// once per minimum interval. Returns the rotated (or cached) token,
    /// or `None` when no session is held or the refresh failed.
    ///
    /// A failed refresh forces logout: the session is gone either way, and
    /// keeping half a session would just defer the error.
    pub async fn refresh_token(&self) -> Option<String> {
        let mut gate = self.refresh_gate.lock().await;

        if let Some(last) = gate.last_attempt {
            if last.elapsed() < self.settings.refresh_interval {
                debug!("Refresh attempted inside the minimum interval; serving cached token");
                return self.access_token().await;
            }
        }

        let refresh_token = {
            let state = self.state.read().await;
            match state.session.as_ref() {
                Some(session) => session.tokens.refresh_token.clone(),
                None => {
                    debug!("No session to refresh");
                    return None;
                }
            }
        };

        // The attempt timestamp advances regardless of outcome.
        gate.last_attempt = Some(Instant::now());

        match self.api.refresh(&refresh_token).await {
            Ok(access_token) => {
                {
                    let mut state = self.state.write().await;
                    let Some(session) = state.session.as_mut() else {
                        // Logged out while the refresh was in flight.
                        return None;
                    };
                    session.rotate_access_token(access_token.clone());
                    let session = session.clone();
                    self.publish(&state);
                    self.persist(&session);
                }
                debug!("Access token rotated");
                Some(access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed; tearing down session");
                drop(gate);
                self.force_logout().await;
                None
            }
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Tear down local state without a server call. Used for forced logout
    /// on unrecoverable refresh or bootstrap failures.
    async fn force_logout(&self) {
        warn!("Forcing logout");
        self.clear_local_session().await;
    }

    async fn clear_local_session(&self) {
        let mut state = self.state.write().await;
        state.session = None;
        state.loading = false;
        self.publish(&state);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }
    }
}

fn phase_of(session: &Option<Session>) -> SessionPhase {
    if session.is_some() {
        SessionPhase::Authenticated
    } else {
        SessionPhase::Unauthenticated
    }
}

#[async_trait]
impl TokenSource for SessionManager {
    async fn bearer_token(&self) -> Option<String> {
        self.access_token().await
    }

    async fn refresh_bearer_token(&self) -> Option<String> {
        self.refresh_token().await
    }
}

// ============================================================================
// Tests
// ============================================================================
