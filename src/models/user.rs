//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Role assigned once, at account creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(rename = "user")]
    Reader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Reader => "user",
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity provider account ID (also used as document ID)
    pub id: String,
    pub name: String,
    pub email: String,
    /// Whether the provider has verified the email address
    pub is_verified: bool,
    pub role: Role,
    /// Profile picture URL
    pub picture: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A mailing list entry, unique by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscriber {
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The single mailing list document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MailingList {
    #[serde(default)]
    pub subscribers: Vec<Subscriber>,
}

impl MailingList {
    pub fn contains(&self, email: &str) -> bool {
        self.subscribers.iter().any(|s| s.email == email)
    }
}
