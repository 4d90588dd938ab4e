// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token records and issuance results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Revocable server-side record backing an issued access token.
///
/// Stored at `tokens/{access_uuid}`. The `expires_at` field is a Firestore
/// timestamp so the collection TTL policy can remove it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub access_uuid: String,
    pub user_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
}

impl AccessRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Result of issuing a token.
#[derive(Debug, Clone)]
pub struct TokenDetails {
    /// Signed bearer credential
    pub access_token: String,
    pub access_uuid: String,
    /// Expiry (Unix seconds)
    pub at_expires: i64,
}

/// Identity resolved from a verified token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDetails {
    pub access_uuid: String,
    pub user_id: String,
}
