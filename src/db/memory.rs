// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage backend.
//!
//! Mirrors the Firestore semantics closely enough for tests and local runs:
//! expired token records disappear on access, and like sets use the same
//! add-if-absent / remove-all operations on existing documents only.

use crate::db::{
    AboutStore, CommentStore, LikeStore, MailingListStore, PostStore, TokenStore, UserStore,
};
use crate::error::AppError;
use crate::models::{
    About, AccessRecord, Comment, LikeTarget, MailingList, Post, Role, Subscriber, User,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Mutex;

/// Storage backed by concurrent maps. Cheap to construct; not persistent.
#[derive(Default)]
pub struct MemoryDb {
    tokens: DashMap<String, AccessRecord>,
    users: DashMap<String, User>,
    posts: DashMap<String, Post>,
    comments: DashMap<String, Comment>,
    mailing_list: Mutex<Option<MailingList>>,
    about: Mutex<Option<About>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a bare post or comment with an initial like set.
    pub fn insert_likeable(&self, target: LikeTarget, id: &str, likes: Vec<String>) {
        let now = Utc::now();
        match target {
            LikeTarget::Post => {
                self.posts.insert(
                    id.to_string(),
                    Post {
                        id: id.to_string(),
                        title: format!("Post {id}"),
                        slug: id.to_string(),
                        description: String::new(),
                        content: String::new(),
                        likes,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
            LikeTarget::Comment => {
                self.comments.insert(
                    id.to_string(),
                    Comment {
                        id: id.to_string(),
                        author_id: String::new(),
                        blog_post_id: String::new(),
                        parent_id: None,
                        content: String::new(),
                        likes,
                        created_at: now,
                        updated_at: now,
                    },
                );
            }
        }
    }

    /// Drop a post or comment, as a concurrent delete would.
    pub fn remove_likeable(&self, target: LikeTarget, id: &str) {
        match target {
            LikeTarget::Post => {
                self.posts.remove(id);
            }
            LikeTarget::Comment => {
                self.comments.remove(id);
            }
        }
    }

    /// Apply `f` to the like set of an existing document.
    fn with_likes<F>(&self, target: LikeTarget, id: &str, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Vec<String>),
    {
        let found = match target {
            LikeTarget::Post => self.posts.get_mut(id).map(|mut p| f(&mut p.likes)),
            LikeTarget::Comment => self.comments.get_mut(id).map(|mut c| f(&mut c.likes)),
        };
        found.ok_or_else(|| AppError::NotFound(format!("{} {} not found", target.noun(), id)))
    }

    /// Number of stored token records, expired or not.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn purge_expired_tokens(&self) {
        let now = Utc::now();
        self.tokens.retain(|_, record| !record.is_expired_at(now));
    }

    fn lock_mailing_list(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, Option<MailingList>>, AppError> {
        self.mailing_list
            .lock()
            .map_err(|_| AppError::Database("mailing list lock poisoned".to_string()))
    }

    fn lock_about(&self) -> Result<std::sync::MutexGuard<'_, Option<About>>, AppError> {
        self.about
            .lock()
            .map_err(|_| AppError::Database("about lock poisoned".to_string()))
    }
}

#[async_trait]
impl TokenStore for MemoryDb {
    async fn insert_token(&self, record: &AccessRecord) -> Result<(), AppError> {
        self.tokens
            .insert(record.access_uuid.clone(), record.clone());
        Ok(())
    }

    async fn find_token(&self, access_uuid: &str) -> Result<Option<AccessRecord>, AppError> {
        self.purge_expired_tokens();
        Ok(self.tokens.get(access_uuid).map(|r| r.value().clone()))
    }

    async fn token_exists_for_user(&self, user_id: &str) -> Result<bool, AppError> {
        self.purge_expired_tokens();
        Ok(self.tokens.iter().any(|r| r.user_id == user_id))
    }

    async fn delete_token(&self, access_uuid: &str) -> Result<(), AppError> {
        self.tokens.remove(access_uuid);
        Ok(())
    }

    async fn delete_tokens_for_user(&self, user_id: &str) -> Result<(), AppError> {
        self.tokens.retain(|_, record| record.user_id != user_id);
        Ok(())
    }

    async fn init_expiry_policy(&self) -> Result<(), AppError> {
        self.purge_expired_tokens();
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(id).map(|u| u.value().clone()))
    }

    async fn user_exists_with_email(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.iter().any(|u| u.email == email))
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn list_users_without_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self
            .users
            .iter()
            .filter(|u| u.role != role)
            .map(|u| u.value().clone())
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[async_trait]
impl PostStore for MemoryDb {
    async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        self.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        Ok(self.posts.get(id).map(|p| p.value().clone()))
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        Ok(self
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| p.value().clone()))
    }

    async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let mut posts: Vec<Post> = self.posts.iter().map(|p| p.value().clone()).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn update_post(&self, post: &Post) -> Result<(), AppError> {
        let mut stored = self
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", post.id)))?;
        stored.title = post.title.clone();
        stored.slug = post.slug.clone();
        stored.description = post.description.clone();
        stored.content = post.content.clone();
        stored.updated_at = post.updated_at;
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.posts
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", id)))
    }
}

#[async_trait]
impl CommentStore for MemoryDb {
    async fn create_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        Ok(self.comments.get(id).map(|c| c.value().clone()))
    }

    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        let mut comments: Vec<Comment> = self
            .comments
            .iter()
            .filter(|c| c.blog_post_id == post_id)
            .map(|c| c.value().clone())
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), AppError> {
        let mut stored = self
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| AppError::NotFound(format!("comment {} not found", comment.id)))?;
        stored.content = comment.content.clone();
        stored.updated_at = comment.updated_at;
        Ok(())
    }
}

#[async_trait]
impl LikeStore for MemoryDb {
    async fn get_likes(
        &self,
        target: LikeTarget,
        id: &str,
    ) -> Result<Option<Vec<String>>, AppError> {
        Ok(match target {
            LikeTarget::Post => self.posts.get(id).map(|p| p.likes.clone()),
            LikeTarget::Comment => self.comments.get(id).map(|c| c.likes.clone()),
        })
    }

    async fn add_like(&self, target: LikeTarget, id: &str, user_id: &str) -> Result<(), AppError> {
        self.with_likes(target, id, |likes| {
            if !likes.iter().any(|u| u == user_id) {
                likes.push(user_id.to_string());
            }
        })
    }

    async fn remove_like(
        &self,
        target: LikeTarget,
        id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        self.with_likes(target, id, |likes| likes.retain(|u| u != user_id))
    }
}

#[async_trait]
impl MailingListStore for MemoryDb {
    async fn get_mailing_list(&self) -> Result<Option<MailingList>, AppError> {
        Ok(self.lock_mailing_list()?.clone())
    }

    async fn add_subscriber(&self, subscriber: &Subscriber) -> Result<(), AppError> {
        let mut guard = self.lock_mailing_list()?;
        let list = guard.get_or_insert_with(MailingList::default);
        if !list.contains(&subscriber.email) {
            list.subscribers.push(subscriber.clone());
        }
        Ok(())
    }

    async fn remove_subscriber(&self, email: &str) -> Result<(), AppError> {
        if let Some(list) = self.lock_mailing_list()?.as_mut() {
            list.subscribers.retain(|s| s.email != email);
        }
        Ok(())
    }
}

#[async_trait]
impl AboutStore for MemoryDb {
    async fn get_about(&self) -> Result<Option<About>, AppError> {
        Ok(self.lock_about()?.clone())
    }

    async fn put_about(&self, about: &About) -> Result<(), AppError> {
        *self.lock_about()? = Some(about.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(access_uuid: &str, user_id: &str, ttl: Duration) -> AccessRecord {
        AccessRecord {
            access_uuid: access_uuid.to_string(),
            user_id: user_id.to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    #[tokio::test]
    async fn test_expired_token_is_not_found() {
        let db = MemoryDb::new();
        db.insert_token(&record("live", "u1", Duration::hours(1)))
            .await
            .unwrap();
        db.insert_token(&record("dead", "u2", Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(db.find_token("live").await.unwrap().is_some());
        assert!(db.find_token("dead").await.unwrap().is_none());
        assert!(!db.token_exists_for_user("u2").await.unwrap());
        assert_eq!(db.token_count(), 1, "expired record should be purged");
    }

    #[tokio::test]
    async fn test_add_like_is_set_union() {
        let db = MemoryDb::new();
        db.insert_likeable(LikeTarget::Post, "p1", vec![]);

        db.add_like(LikeTarget::Post, "p1", "alice").await.unwrap();
        db.add_like(LikeTarget::Post, "p1", "alice").await.unwrap();

        let likes = db.get_likes(LikeTarget::Post, "p1").await.unwrap().unwrap();
        assert_eq!(likes, vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_like_sets_are_separate_per_target_kind() {
        let db = MemoryDb::new();
        db.insert_likeable(LikeTarget::Post, "x", vec![]);

        assert!(db.get_likes(LikeTarget::Comment, "x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_like_writes_never_create_documents() {
        let db = MemoryDb::new();

        let err = db.add_like(LikeTarget::Post, "gone", "alice").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        let err = db
            .remove_like(LikeTarget::Comment, "gone", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(db.get_likes(LikeTarget::Post, "gone").await.unwrap().is_none());
        assert!(db.get_post("gone").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_post_keeps_likes() {
        let db = MemoryDb::new();
        db.insert_likeable(LikeTarget::Post, "p1", vec!["bob".to_string()]);

        let mut edited = db.get_post("p1").await.unwrap().unwrap();
        edited.title = "Edited".to_string();
        edited.likes.clear();
        db.update_post(&edited).await.unwrap();

        let stored = db.get_post("p1").await.unwrap().unwrap();
        assert_eq!(stored.title, "Edited");
        assert_eq!(stored.likes, vec!["bob"]);
    }
}
