// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Blog post, comment and about page models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Blog post stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Post {
    /// Document ID
    pub id: String,
    pub title: String,
    /// URL slug derived from the title, unique across posts
    pub slug: String,
    pub description: String,
    pub content: String,
    /// User IDs that like this post (unique)
    #[serde(default)]
    pub likes: Vec<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Case-insensitive substring match on title, description or content.
    ///
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        [&self.title, &self.description, &self.content]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Comment on a blog post, optionally a reply to another comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Comment {
    /// Document ID
    pub id: String,
    pub author_id: String,
    pub blog_post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub content: String,
    /// User IDs that like this comment (unique)
    #[serde(default)]
    pub likes: Vec<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// The site's single about page, edited by the admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct About {
    pub about_me: String,
    /// Picture URL; empty when none is set
    #[serde(default)]
    pub profile_picture: String,
    /// Admin who last edited the page
    pub updated_by: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

/// Which kind of document a like applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    /// Firestore collection holding documents of this kind.
    pub fn collection(&self) -> &'static str {
        match self {
            LikeTarget::Post => crate::db::collections::POSTS,
            LikeTarget::Comment => crate::db::collections::COMMENTS,
        }
    }

    /// Noun used in user-facing messages.
    pub fn noun(&self) -> &'static str {
        match self {
            LikeTarget::Post => "post",
            LikeTarget::Comment => "comment",
        }
    }
}
