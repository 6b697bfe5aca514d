//! HTTP layer for the authentication API.
//!
//! This module provides the `ApiClient` for talking to the remote
//! authentication endpoints, the `AuthApi` trait the session manager
//! depends on (so tests can inject fakes), and the authorized-request
//! decorator that recovers once from a 401 by refreshing the token.
//!
//! All authorized endpoints use JWT bearer authentication; the refresh
//! endpoint authenticates with the refresh token in the request body.

pub mod authorized;
pub mod client;
pub mod error;

pub use authorized::{with_token_retry, AuthorizedClient, TokenSource};
pub use client::{ApiClient, LoginReply};
pub use error::ApiError;

use async_trait::async_trait;

use crate::models::{Credentials, UserProfile};

/// The remote authentication endpoints the session manager depends on.
///
/// Implemented by [`ApiClient`] for real traffic; tests implement it with
/// in-process fakes.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a user payload and a fresh token pair.
    async fn login(&self, credentials: &Credentials) -> Result<LoginReply, ApiError>;

    /// Invalidate the session server-side. Best-effort; callers log and
    /// ignore failures.
    async fn logout(&self, access_token: &str) -> Result<(), ApiError>;

    /// Exchange the refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError>;

    /// Fetch the profile of the currently authenticated user.
    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError>;
}
