// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer: storage ports plus Firestore and in-memory backends.
//!
//! Services depend only on the traits in this module. Lookups report a
//! missing document as `Ok(None)`/`Ok(false)`, so callers can tell "not
//! found" apart from a failed or timed-out store call. Writes that need an
//! existing document fail with `AppError::NotFound` instead of creating one.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{
    About, AccessRecord, Comment, LikeTarget, MailingList, Post, Role, Subscriber, User,
};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const TOKENS: &str = "tokens";
    pub const POSTS: &str = "posts";
    pub const COMMENTS: &str = "comments";
    pub const MAILING_LIST: &str = "mailing_list";
    /// Document ID of the single mailing list
    pub const MAILING_LIST_DOC: &str = "default";
    pub const ABOUT: &str = "about";
    /// Document ID of the single about page
    pub const ABOUT_DOC: &str = "default";
}

/// Deadline for ordinary store calls.
pub const STORE_TIMEOUT: Duration = Duration::from_secs(20);
/// Deadline for existence checks.
pub const EXISTS_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store call under a deadline, failing with `AppError::Timeout`.
pub async fn with_timeout<T, F>(
    limit: Duration,
    operation: &'static str,
    fut: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| AppError::Timeout(operation))?
}

/// Access token records keyed by `access_uuid`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert_token(&self, record: &AccessRecord) -> Result<(), AppError>;

    /// Returns `None` if the record is absent or already past `expires_at`.
    async fn find_token(&self, access_uuid: &str) -> Result<Option<AccessRecord>, AppError>;

    /// True if the user has at least one unexpired record.
    async fn token_exists_for_user(&self, user_id: &str) -> Result<bool, AppError>;

    async fn delete_token(&self, access_uuid: &str) -> Result<(), AppError>;

    async fn delete_tokens_for_user(&self, user_id: &str) -> Result<(), AppError>;

    /// Set up automatic removal of records once `expires_at` passes.
    async fn init_expiry_policy(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    async fn user_exists_with_email(&self, email: &str) -> Result<bool, AppError>;

    async fn create_user(&self, user: &User) -> Result<(), AppError>;

    async fn list_users_without_role(&self, role: Role) -> Result<Vec<User>, AppError>;
}

/// Blog posts keyed by document id.
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<(), AppError>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError>;

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError>;

    /// Every post, newest first.
    async fn list_posts(&self) -> Result<Vec<Post>, AppError>;

    /// Overwrite the editable fields (title, slug, description, content,
    /// updated_at). The like set is left alone. `NotFound` if the post is gone.
    async fn update_post(&self, post: &Post) -> Result<(), AppError>;

    /// `NotFound` if the post does not exist.
    async fn delete_post(&self, id: &str) -> Result<(), AppError>;
}

/// Comments keyed by document id.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create_comment(&self, comment: &Comment) -> Result<(), AppError>;

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError>;

    /// Comments on one post, oldest first.
    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError>;

    /// Replace the content and bump `updated_at`. `NotFound` if the comment is gone.
    async fn update_comment(&self, comment: &Comment) -> Result<(), AppError>;
}

/// Like sets embedded in post and comment documents.
///
/// `add_like` and `remove_like` are set operations applied atomically by the
/// backend: adding a present id or removing an absent one is a no-op. Both
/// fail with `NotFound` rather than create a document that is missing.
#[async_trait]
pub trait LikeStore: Send + Sync {
    /// The target's like set, or `None` if the document does not exist.
    async fn get_likes(
        &self,
        target: LikeTarget,
        id: &str,
    ) -> Result<Option<Vec<String>>, AppError>;

    async fn add_like(&self, target: LikeTarget, id: &str, user_id: &str) -> Result<(), AppError>;

    async fn remove_like(
        &self,
        target: LikeTarget,
        id: &str,
        user_id: &str,
    ) -> Result<(), AppError>;
}

#[async_trait]
pub trait MailingListStore: Send + Sync {
    async fn get_mailing_list(&self) -> Result<Option<MailingList>, AppError>;

    /// Append a subscriber, creating the list if needed. No-op if the email is present.
    async fn add_subscriber(&self, subscriber: &Subscriber) -> Result<(), AppError>;

    async fn remove_subscriber(&self, email: &str) -> Result<(), AppError>;
}

#[async_trait]
pub trait AboutStore: Send + Sync {
    async fn get_about(&self) -> Result<Option<About>, AppError>;

    /// Create or replace the about page.
    async fn put_about(&self, about: &About) -> Result<(), AppError>;
}

/// Handles to every storage port, usually all backed by one client.
#[derive(Clone)]
pub struct Stores {
    pub tokens: Arc<dyn TokenStore>,
    pub users: Arc<dyn UserStore>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub likes: Arc<dyn LikeStore>,
    pub mailing_list: Arc<dyn MailingListStore>,
    pub about: Arc<dyn AboutStore>,
}

impl Stores {
    /// Use one backend for all ports.
    pub fn from_backend<B>(backend: B) -> Self
    where
        B: TokenStore
            + UserStore
            + PostStore
            + CommentStore
            + LikeStore
            + MailingListStore
            + AboutStore
            + 'static,
    {
        Self::from_shared(Arc::new(backend))
    }

    /// Use one already shared backend for all ports.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: TokenStore
            + UserStore
            + PostStore
            + CommentStore
            + LikeStore
            + MailingListStore
            + AboutStore
            + 'static,
    {
        Self {
            tokens: backend.clone(),
            users: backend.clone(),
            posts: backend.clone(),
            comments: backend.clone(),
            likes: backend.clone(),
            mailing_list: backend.clone(),
            about: backend,
        }
    }
}
