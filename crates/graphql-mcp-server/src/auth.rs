//! Bearer-token authentication against a configured login endpoint.
//!
//! A single token is cached for the lifetime of the process. The cache is a
//! [`tokio::sync::Mutex`] held across the login exchange, so concurrent
//! first-call header requests coalesce into one login rather than racing.

use crate::errors::AuthError;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use rmcp::serde_json::{Value, json};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::warn;
use url::Url;

/// Login credentials. Auth is "not configured" unless all three fields are
/// present and non-empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The login endpoint to exchange credentials at
    pub login_endpoint: Option<Url>,

    /// The username to log in with
    pub username: String,

    /// The password to log in with
    pub password: String,
}

/// Performs the login exchange and caches the resulting access token.
pub struct AuthClient {
    config: AuthConfig,
    client: reqwest::Client,
    token: Mutex<Option<String>>,
}

impl AuthClient {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// True iff endpoint, username, and password are all configured.
    pub fn is_configured(&self) -> bool {
        self.config.login_endpoint.is_some()
            && !self.config.username.is_empty()
            && !self.config.password.is_empty()
    }

    /// Exchange the configured credentials for an access token.
    ///
    /// On success the cached token is overwritten unconditionally (last login
    /// wins) and the full parsed login response is returned.
    pub async fn login(&self) -> Result<Value, AuthError> {
        let mut token = self.token.lock().await;
        self.login_locked(&mut token).await
    }

    async fn login_locked(&self, token: &mut Option<String>) -> Result<Value, AuthError> {
        if !self.is_configured() {
            return Err(AuthError::NotConfigured);
        }
        let endpoint = self
            .config
            .login_endpoint
            .clone()
            .ok_or(AuthError::NotConfigured)?;

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .json(&json!({
                "username": self.config.username,
                "password": self.config.password,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status(status));
        }

        let body = response.json::<Value>().await?;
        *token = body
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Ok(body)
    }

    /// The headers derived from the cached token, logging in lazily when no
    /// token is cached yet.
    ///
    /// This never fails: a failed lazy login degrades to an empty header set.
    pub async fn auth_headers(&self) -> HeaderMap {
        let mut token = self.token.lock().await;
        if token.is_none() {
            if let Err(error) = self.login_locked(&mut token).await {
                warn!(%error, "Login failed, continuing without auth headers");
            }
        }
        let mut headers = HeaderMap::new();
        if let Some(value) = token
            .as_deref()
            .and_then(|token| HeaderValue::from_str(&format!("Bearer {token}")).ok())
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }
}
