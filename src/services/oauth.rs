// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth login flow.
//!
//! Handles:
//! - Anti-CSRF state generation and single-use session binding
//! - Authorization URL construction
//! - Code exchange and user-info retrieval

use crate::config::Config;
use crate::error::AppError;
use crate::services::session::SessionStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const SCOPES: &str = concat!(
    "https://www.googleapis.com/auth/userinfo.email ",
    "https://www.googleapis.com/auth/userinfo.profile",
);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Profile returned by the Google user-info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
}

/// External identity provider used by the login flow.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to, carrying `state`.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a provider access token.
    async fn exchange_code(&self, code: &str) -> Result<String, AppError>;

    /// Fetch the profile for a provider access token.
    async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AppError>;
}

#[derive(Deserialize)]
struct TokenExchangeResponse {
    access_token: String,
}

/// Google OAuth2 client.
#[derive(Clone)]
pub struct GoogleProvider {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
}

impl GoogleProvider {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("failed building OAuth HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?\
             access_type=online&\
             client_id={}&\
             redirect_uri={}&\
             response_type=code&\
             scope={}&\
             state={}",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_url),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Token exchange failed: HTTP {}: {}",
                status, body
            )));
        }

        let token: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Token exchange JSON parse error: {}", e)))?;
        Ok(token.access_token)
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<GoogleUserInfo, AppError> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("User info request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Provider(format!(
                "unable to retrieve user info: HTTP {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("User info JSON parse error: {}", e)))
    }
}

/// Where to send the browser, and the session it must come back with.
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub session_id: String,
    pub authorization_url: String,
}

/// Drives the two-step login handshake.
#[derive(Clone)]
pub struct OAuthFlow {
    provider: Arc<dyn IdentityProvider>,
    sessions: Arc<dyn SessionStore>,
}

impl OAuthFlow {
    pub fn new(provider: Arc<dyn IdentityProvider>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { provider, sessions }
    }

    /// Start a login: fresh state, fresh session.
    pub async fn login(&self) -> Result<LoginRedirect, AppError> {
        let state = uuid::Uuid::new_v4().to_string();
        let authorization_url = self.provider.authorization_url(&state);
        let session_id = self.sessions.create(state).await?;

        Ok(LoginRedirect {
            session_id,
            authorization_url,
        })
    }

    /// Finish a login.
    ///
    /// The session is consumed before anything else happens, so a failed
    /// callback cannot be retried with the same cookie. The state check runs
    /// before any call to the provider.
    pub async fn callback(
        &self,
        session_id: Option<&str>,
        state: &str,
        code: &str,
    ) -> Result<GoogleUserInfo, AppError> {
        let session = match session_id {
            Some(id) => self.sessions.take(id).await?,
            None => None,
        };

        let state_matches = session
            .map(|s| bool::from(s.state.as_bytes().ct_eq(state.as_bytes())))
            .unwrap_or(false);
        if !state_matches {
            tracing::warn!("OAuth callback with missing session or mismatched state");
            return Err(AppError::Unauthorized(
                "unable to retrieve state".to_string(),
            ));
        }

        tracing::info!("Exchanging authorization code for tokens");
        let provider_token = self.provider.exchange_code(code).await?;
        let profile = self.provider.fetch_user_info(&provider_token).await?;

        tracing::info!(user_id = %profile.id, "OAuth callback completed");
        Ok(profile)
    }

    /// Consume a session without completing the login.
    pub async fn discard_session(&self, session_id: &str) -> Result<(), AppError> {
        if self.sessions.take(session_id).await?.is_some() {
            tracing::info!("Discarded OAuth session after malformed callback");
        }
        Ok(())
    }
}
