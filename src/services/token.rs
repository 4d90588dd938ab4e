// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token issuance, validation and revocation.
//!
//! Tokens are HS256 JWTs carrying `{authorized, user_id, access_uuid, exp}`.
//! A valid signature is necessary but not sufficient: the `access_uuid` must
//! also have a live record in the token store, which is what logout and
//! re-login delete.

use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{AccessDetails, AccessRecord, TokenDetails};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub authorized: bool,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub access_uuid: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token verification failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    SignatureInvalid,

    #[error("token has expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token claims are missing")]
    Unauthorized,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SignatureInvalid | TokenError::Expired | TokenError::Unauthorized => {
                AppError::Unauthorized(err.to_string())
            }
            TokenError::Malformed(msg) => {
                AppError::Internal(anyhow::anyhow!("token parse failed: {msg}"))
            }
        }
    }
}

/// Verify signature and expiry of an access token.
///
/// Only HMAC algorithms are accepted; a token signed with anything else is
/// treated as a bad signature.
pub fn validate_token(token: &str, secret: &[u8]) -> Result<AccessClaims, TokenError> {
    let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;
    if !matches!(
        header.alg,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    ) {
        return Err(TokenError::SignatureInvalid);
    }

    let mut validation = Validation::new(header.alg);
    validation.set_required_spec_claims(&["exp"]);
    validation.leeway = 0;

    decode::<AccessClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::SignatureInvalid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })
}

/// Pull the identity out of verified claims.
///
/// A token without `authorized: true` is rejected like one missing its ids.
pub fn extract_token_metadata(claims: &AccessClaims) -> Result<AccessDetails, TokenError> {
    if !claims.authorized || claims.access_uuid.is_empty() || claims.user_id.is_empty() {
        return Err(TokenError::Unauthorized);
    }
    Ok(AccessDetails {
        access_uuid: claims.access_uuid.clone(),
        user_id: claims.user_id.clone(),
    })
}

/// Issues tokens and manages their revocable records.
#[derive(Clone)]
pub struct TokenManager {
    secret: Vec<u8>,
    validity: Duration,
    store: Arc<dyn TokenStore>,
}

impl TokenManager {
    pub fn new(secret: Vec<u8>, validity: Duration, store: Arc<dyn TokenStore>) -> Self {
        Self {
            secret,
            validity,
            store,
        }
    }

    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Sign a fresh token for `user_id`. Nothing is persisted.
    pub fn generate_token(&self, user_id: &str) -> Result<TokenDetails, AppError> {
        let validity = chrono::Duration::from_std(self.validity)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid token validity: {e}")))?;
        let expires = Utc::now()
            .checked_add_signed(validity)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token expiry out of range")))?;
        self.generate_token_expiring_at(user_id, expires)
    }

    /// Sign a token with an explicit expiry instant.
    pub fn generate_token_expiring_at(
        &self,
        user_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<TokenDetails, AppError> {
        let access_uuid = uuid::Uuid::new_v4().to_string();
        let claims = AccessClaims {
            authorized: true,
            user_id: user_id.to_string(),
            access_uuid: access_uuid.clone(),
            exp: expires_at.timestamp(),
        };

        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {e}")))?;

        if access_token.is_empty() {
            return Err(AppError::Internal(anyhow::anyhow!("access token is empty")));
        }

        Ok(TokenDetails {
            access_token,
            access_uuid,
            at_expires: claims.exp,
        })
    }

    /// Persist the record for a freshly issued token.
    ///
    /// Any existing record for the user is deleted first, so the previous
    /// token stops working. The delete and insert are separate writes; if the
    /// insert fails the user is left with no live token.
    pub async fn save_token(&self, user_id: &str, details: &TokenDetails) -> Result<(), AppError> {
        if self.store.token_exists_for_user(user_id).await? {
            self.store.delete_tokens_for_user(user_id).await?;
            tracing::debug!(user_id, "Replaced previous access token");
        }

        let expires_at = DateTime::<Utc>::from_timestamp(details.at_expires, 0)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("token expiry out of range")))?;

        self.store
            .insert_token(&AccessRecord {
                access_uuid: details.access_uuid.clone(),
                user_id: user_id.to_string(),
                expires_at,
            })
            .await
    }

    pub async fn find_token(&self, access_uuid: &str) -> Result<Option<AccessRecord>, AppError> {
        self.store.find_token(access_uuid).await
    }

    pub async fn is_exists_for_user(&self, user_id: &str) -> Result<bool, AppError> {
        self.store.token_exists_for_user(user_id).await
    }

    pub async fn delete_token(&self, access_uuid: &str) -> Result<(), AppError> {
        self.store.delete_token(access_uuid).await
    }

    pub async fn delete_tokens_for_user(&self, user_id: &str) -> Result<(), AppError> {
        self.store.delete_tokens_for_user(user_id).await
    }

    pub async fn init_token_expiry_index(&self) -> Result<(), AppError> {
        self.store.init_expiry_policy().await
    }

    /// Full check used by the auth middleware: signature, expiry, claims,
    /// and a live store record.
    pub async fn authenticate(&self, token: &str) -> Result<AccessDetails, AppError> {
        let claims = validate_token(token, &self.secret)?;
        let details = extract_token_metadata(&claims)?;

        if self.store.find_token(&details.access_uuid).await?.is_none() {
            return Err(AppError::Unauthorized("token has been revoked".to_string()));
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;

    const SECRET: &[u8] = b"test_access_token_secret_32_byte";

    fn manager() -> TokenManager {
        TokenManager::new(
            SECRET.to_vec(),
            Duration::from_secs(24 * 60 * 60),
            Arc::new(MemoryDb::new()),
        )
    }

    #[test]
    fn test_generate_validate_extract_roundtrip() {
        let tm = manager();
        let details = tm.generate_token("user-123").unwrap();

        let claims = validate_token(&details.access_token, SECRET).unwrap();
        let access = extract_token_metadata(&claims).unwrap();

        assert_eq!(access.user_id, "user-123");
        assert_eq!(access.access_uuid, details.access_uuid);
        assert!(claims.authorized);
        assert_eq!(claims.exp, details.at_expires);
    }

    #[test]
    fn test_expiry_is_validity_window() {
        let tm = manager();
        let before = Utc::now().timestamp();
        let details = tm.generate_token("u").unwrap();

        let delta = details.at_expires - before;
        assert!((24 * 3600 - 5..=24 * 3600 + 5).contains(&delta));
    }

    #[test]
    fn test_each_token_gets_fresh_identifier() {
        let tm = manager();
        let a = tm.generate_token("u").unwrap();
        let b = tm.generate_token("u").unwrap();
        assert_ne!(a.access_uuid, b.access_uuid);
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let details = manager().generate_token("u").unwrap();
        let err = validate_token(&details.access_token, b"some_other_secret").unwrap_err();
        assert_eq!(err, TokenError::SignatureInvalid);
    }

    #[test]
    fn test_tampered_signature_is_signature_invalid() {
        let details = manager().generate_token("u").unwrap();
        let (signed, signature) = details.access_token.rsplit_once('.').unwrap();
        let mut chars: Vec<char> = signature.chars().collect();
        chars[5] = if chars[5] == 'A' { 'B' } else { 'A' };
        let token = format!("{signed}.{}", chars.into_iter().collect::<String>());

        let err = validate_token(&token, SECRET).unwrap_err();
        assert_eq!(err, TokenError::SignatureInvalid);
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let tm = manager();
        let details = tm
            .generate_token_expiring_at("u", Utc::now() - chrono::Duration::minutes(5))
            .unwrap();

        let err = validate_token(&details.access_token, SECRET).unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = validate_token("not-a-jwt", SECRET).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
        assert!(matches!(AppError::from(err), AppError::Internal(_)));
    }

    #[test]
    fn test_extract_rejects_missing_claims() {
        let claims = AccessClaims {
            authorized: true,
            user_id: "u".to_string(),
            access_uuid: String::new(),
            exp: 0,
        };
        assert_eq!(
            extract_token_metadata(&claims).unwrap_err(),
            TokenError::Unauthorized
        );

        let claims = AccessClaims {
            authorized: false,
            user_id: "u".to_string(),
            access_uuid: "id".to_string(),
            exp: 0,
        };
        assert_eq!(
            extract_token_metadata(&claims).unwrap_err(),
            TokenError::Unauthorized
        );

        let err = AppError::from(extract_token_metadata(&claims).unwrap_err());
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "token claims are missing"));
    }

    #[test]
    fn test_out_of_range_validity_is_internal_error() {
        let tm = TokenManager::new(
            SECRET.to_vec(),
            Duration::from_secs(u64::MAX),
            Arc::new(MemoryDb::new()),
        );
        assert!(matches!(tm.generate_token("u"), Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_save_token_replaces_previous_record() {
        let tm = manager();
        let first = tm.generate_token("u").unwrap();
        tm.save_token("u", &first).await.unwrap();
        assert!(tm.authenticate(&first.access_token).await.is_ok());

        let second = tm.generate_token("u").unwrap();
        tm.save_token("u", &second).await.unwrap();

        assert!(tm.find_token(&first.access_uuid).await.unwrap().is_none());
        assert!(matches!(
            tm.authenticate(&first.access_token).await,
            Err(AppError::Unauthorized(_))
        ));
        let access = tm.authenticate(&second.access_token).await.unwrap();
        assert_eq!(access.user_id, "u");
    }

    #[tokio::test]
    async fn test_deleted_record_is_rejected() {
        let tm = manager();
        let details = tm.generate_token("u").unwrap();
        tm.save_token("u", &details).await.unwrap();

        tm.delete_token(&details.access_uuid).await.unwrap();

        assert!(validate_token(&details.access_token, SECRET).is_ok());
        assert!(matches!(
            tm.authenticate(&details.access_token).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_unsaved_token_is_rejected() {
        let tm = manager();
        let details = tm.generate_token("u").unwrap();
        assert!(!tm.is_exists_for_user("u").await.unwrap());
        assert!(tm.authenticate(&details.access_token).await.is_err());
    }
}
