// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Built once at startup and handed to the services that need it. Nothing
//! below the router reads the environment directly.

use std::env;
use std::time::Duration;

/// Default lifetime of an issued access token.
pub const DEFAULT_ACCESS_TOKEN_VALIDITY_HOURS: u64 = 24;

/// Longest accepted access token lifetime (one year).
pub const MAX_ACCESS_TOKEN_VALIDITY_HOURS: u64 = 24 * 366;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Google OAuth client ID (public)
    pub google_client_id: String,
    /// Callback URL registered with Google
    pub redirect_url: String,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Email that receives the admin role on first login
    pub admin_email: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Lifetime of issued access tokens
    pub access_token_validity: Duration,

    // --- Secrets ---
    /// Google OAuth client secret
    pub google_client_secret: String,
    /// HMAC key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
}

impl Config {
    /// Config with fixed values for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test_client_id".to_string(),
            redirect_url: "http://localhost:8080/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            admin_email: "admin@example.com".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            access_token_validity: Duration::from_secs(
                DEFAULT_ACCESS_TOKEN_VALIDITY_HOURS * 60 * 60,
            ),
            google_client_secret: "test_secret".to_string(),
            access_token_secret: b"test_access_token_secret_32_byte".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let access_token_validity =
            parse_token_validity(env::var("ACCESS_TOKEN_VALIDITY_HOURS").ok().as_deref())?;

        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
            .into_bytes();
        if access_token_secret.is_empty() {
            return Err(ConfigError::Invalid("ACCESS_TOKEN_SECRET"));
        }

        Ok(Self {
            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            redirect_url: env::var("REDIRECT_URL")
                .map_err(|_| ConfigError::Missing("REDIRECT_URL"))?,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("ADMIN_EMAIL"))?,
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            access_token_validity,

            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            access_token_secret,
        })
    }
}

/// Token lifetime from `ACCESS_TOKEN_VALIDITY_HOURS`, or the default when unset.
fn parse_token_validity(raw: Option<&str>) -> Result<Duration, ConfigError> {
    let Some(raw) = raw else {
        return Ok(Duration::from_secs(DEFAULT_ACCESS_TOKEN_VALIDITY_HOURS * 60 * 60));
    };

    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|hours| (1..=MAX_ACCESS_TOKEN_VALIDITY_HOURS).contains(hours))
        .and_then(|hours| hours.checked_mul(60 * 60))
        .map(Duration::from_secs)
        .ok_or(ConfigError::Invalid("ACCESS_TOKEN_VALIDITY_HOURS"))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", "test_secret");
        env::set_var("REDIRECT_URL", "http://localhost:8080/callback");
        env::set_var("ACCESS_TOKEN_SECRET", "test_access_token_secret_32_byte");
        env::set_var("ADMIN_EMAIL", "admin@example.com");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.admin_email, "admin@example.com");
        assert_eq!(config.port, 8080);
        assert_eq!(
            config.access_token_validity,
            Duration::from_secs(24 * 60 * 60)
        );
    }

    #[test]
    fn test_token_validity_bounds() {
        assert_eq!(
            parse_token_validity(None).unwrap(),
            Duration::from_secs(24 * 60 * 60)
        );
        assert_eq!(
            parse_token_validity(Some(" 2 ")).unwrap(),
            Duration::from_secs(2 * 60 * 60)
        );
        assert!(parse_token_validity(Some(&MAX_ACCESS_TOKEN_VALIDITY_HOURS.to_string())).is_ok());

        for raw in ["0", "-1", "soon", "8785", "999999999999999999", "18446744073709551615"] {
            assert!(
                matches!(
                    parse_token_validity(Some(raw)),
                    Err(ConfigError::Invalid("ACCESS_TOKEN_VALIDITY_HOURS"))
                ),
                "accepted {raw:?}"
            );
        }
    }
}
