//! HTTP client for the authentication API.
//!
//! `ApiClient` owns one configured `reqwest::Client` and implements the
//! four authentication endpoints behind the [`AuthApi`] trait: login,
//! logout, token refresh, and the current-user profile.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{Credentials, UserProfile};

use super::{ApiError, AuthApi};

// ============================================================================
// Constants
// ============================================================================

/// Login endpoint, relative to the base URL
const LOGIN_PATH: &str = "/auth/login";

/// Server-side logout endpoint
const LOGOUT_PATH: &str = "/auth/logout";

/// Token refresh endpoint; takes the refresh token in the body, no bearer
const REFRESH_PATH: &str = "/auth/refresh-token";

/// Current-user profile endpoint
const PROFILE_PATH: &str = "/user/me";

// ============================================================================
// Wire types
// ============================================================================

/// Login response: the user payload plus both tokens.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginReply {
    pub user: UserProfile,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshReply {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// HTTP client for the authentication API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the given base URL with a request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Check if response is successful, returning a classified error with
    /// the (truncated) body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send a JSON request with an optional bearer token and decode the
    /// JSON reply. The building block for both the trait methods below and
    /// the authorized decorator.
    pub(crate) async fn request_json<T, B>(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        let url = self.url(path);
        let mut request = self.client.request(method, &url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to decode reply from {}: {}", path, e)))
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<LoginReply, ApiError> {
        debug!(path = LOGIN_PATH, "Sending login request");
        self.request_json(Method::POST, LOGIN_PATH, None, Some(credentials))
            .await
    }

    async fn logout(&self, access_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url(LOGOUT_PATH))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        debug!(path = REFRESH_PATH, "Requesting access token refresh");
        let reply: RefreshReply = self
            .request_json(
                Method::POST,
                REFRESH_PATH,
                None,
                Some(&RefreshRequest { refresh_token }),
            )
            .await?;
        Ok(reply.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, ApiError> {
        debug!(path = PROFILE_PATH, "Fetching current user profile");
        self.request_json::<UserProfile, ()>(Method::GET, PROFILE_PATH, Some(access_token), None)
            .await
    }
}
