//! Authorized request execution with single-shot 401 recovery.
//!
//! [`with_token_retry`] runs a request closure with the current bearer
//! token. If the server answers 401 and the request has not been retried
//! yet, the token source is asked for a replacement and the request is
//! replayed exactly once; any further rejection propagates. The refresh
//! endpoint itself never goes through this layer.
//!
//! [`AuthorizedClient`] is the ready-made decorator for typed endpoint
//! calls:
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use sessionvault::{ApiClient, AuthorizedClient, Config, SessionManager};
//!
//! let config = Config::load()?;
//! let api = ApiClient::new(&config.api_base_url, config.request_timeout())?;
//! let manager = Arc::new(SessionManager::from_config(&config)?);
//! let client = AuthorizedClient::new(api, manager);
//! let orders: serde_json::Value = client.get("/orders/recent").await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::{ApiClient, ApiError};

/// Source of bearer tokens for authorized requests.
///
/// Implemented by `SessionManager`; tests inject fakes to exercise the
/// retry policy without a server.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Currently held bearer token, if any.
    async fn bearer_token(&self) -> Option<String>;

    /// Obtain a replacement bearer token after a rejection. `None` means
    /// no replacement could be obtained and the rejection is final.
    async fn refresh_bearer_token(&self) -> Option<String>;
}

/// Run `attempt` with the current bearer token, refreshing and replaying
/// exactly once if the server answers 401.
pub async fn with_token_retry<T, F, Fut>(
    tokens: &dyn TokenSource,
    mut attempt: F,
) -> Result<T, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut token = tokens.bearer_token().await;
    let mut retried = false;

    loop {
        match attempt(token.take()).await {
            Err(ApiError::Unauthorized) if !retried => {
                retried = true;
                match tokens.refresh_bearer_token().await {
                    Some(fresh) => {
                        debug!("Replaying request with refreshed access token");
                        token = Some(fresh);
                    }
                    None => return Err(ApiError::Unauthorized),
                }
            }
            result => return result,
        }
    }
}

/// Decorator over [`ApiClient`] that attaches the session's access token
/// to every request and recovers once from a 401.
#[derive(Clone)]
pub struct AuthorizedClient {
    api: ApiClient,
    tokens: Arc<dyn TokenSource>,
}

impl AuthorizedClient {
    pub fn new(api: ApiClient, tokens: Arc<dyn TokenSource>) -> Self {
        Self { api, tokens }
    }

    /// GET a JSON resource with authorization.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        with_token_retry(self.tokens.as_ref(), |token| async move {
            self.api
                .request_json::<T, ()>(Method::GET, path, token.as_deref(), None)
                .await
        })
        .await
    }

    /// POST a JSON body and decode the JSON reply, with authorization.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        with_token_retry(self.tokens.as_ref(), |token| async move {
            self.api
                .request_json(Method::POST, path, token.as_deref(), Some(body))
                .await
        })
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubTokens {
        token: Mutex<Option<String>>,
        refresh_calls: AtomicUsize,
        refresh_works: bool,
    }

    impl StubTokens {
        fn new(token: Option<&str>, refresh_works: bool) -> Self {
            Self {
                token: Mutex::new(token.map(String::from)),
                refresh_calls: AtomicUsize::new(0),
                refresh_works,
            }
        }
    }

    #[async_trait]
    impl TokenSource for StubTokens {
        async fn bearer_token(&self) -> Option<String> {
            self.token.lock().unwrap().clone()
        }

        async fn refresh_bearer_token(&self) -> Option<String> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            if self.refresh_works {
                let fresh = "fresh-token".to_string();
                *self.token.lock().unwrap() = Some(fresh.clone());
                Some(fresh)
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn test_success_needs_no_refresh() {
        let tokens = StubTokens::new(Some("valid"), true);
        let attempts = AtomicUsize::new(0);

        let result = with_token_retry(&tokens, |token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                assert_eq!(token.as_deref(), Some("valid"));
                Ok::<_, ApiError>("payload")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_and_replays_once() {
        let tokens = StubTokens::new(Some("expired"), true);
        let attempts = AtomicUsize::new(0);

        let result = with_token_retry(&tokens, |token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if token.as_deref() == Some("fresh-token") {
                    Ok("payload")
                } else {
                    Err(ApiError::Unauthorized)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "payload");
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_rejection_is_final() {
        let tokens = StubTokens::new(Some("expired"), true);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = with_token_retry(&tokens, |_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(ApiError::Unauthorized) }
        })
        .await;

        // One replay, no loop: the second 401 surfaces.
        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_propagates_original_rejection() {
        let tokens = StubTokens::new(Some("expired"), false);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = with_token_retry(&tokens, |_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(ApiError::Unauthorized) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_pass_through_without_refresh() {
        let tokens = StubTokens::new(Some("valid"), true);
        let attempts = AtomicUsize::new(0);

        let result: Result<(), ApiError> = with_token_retry(&tokens, |_token| {
            attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(ApiError::ServerError("boom".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(ApiError::ServerError(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.refresh_calls.load(Ordering::SeqCst), 0);
    }
}
