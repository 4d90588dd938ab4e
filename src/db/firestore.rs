// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper implementing the storage ports.
//!
//! Provides typed operations for:
//! - Users (profile storage)
//! - Tokens (access token records, TTL on `expires_at`)
//! - Posts and comments (content and like sets)
//! - Mailing list and about page (single documents)

use crate::db::{
    collections, with_timeout, AboutStore, CommentStore, LikeStore, MailingListStore, PostStore,
    TokenStore, UserStore, EXISTS_TIMEOUT, STORE_TIMEOUT,
};
use crate::error::AppError;
use crate::models::{
    About, AccessRecord, Comment, LikeTarget, MailingList, Post, Role, Subscriber, User,
};
use async_trait::async_trait;
use chrono::Utc;
use firestore::errors::FirestoreError;
use firestore::{FirestoreQueryDirection, FirestoreWritePrecondition};
use serde::Deserialize;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Projection of a post or comment down to its like set.
#[derive(Deserialize)]
struct LikeSetDoc {
    #[serde(default)]
    likes: Vec<String>,
}

/// Map a failed `Exists(true)` precondition to `NotFound`.
fn not_found_or_database(err: FirestoreError, what: impl FnOnce() -> String) -> AppError {
    match err {
        FirestoreError::DataNotFoundError(_) => AppError::NotFound(what()),
        other => AppError::Database(other.to_string()),
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Query token records for a user (including expired ones).
    async fn tokens_for_user(&self, user_id: &str) -> Result<Vec<AccessRecord>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::TOKENS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete token documents in transactional batches.
    async fn batch_delete_tokens(&self, records: &[AccessRecord]) -> Result<(), AppError> {
        let client = self.get_client()?;

        for chunk in records.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for record in chunk {
                client
                    .fluent()
                    .delete()
                    .from(collections::TOKENS)
                    .document_id(&record.access_uuid)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add token deletion to transaction: {}",
                            e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit token deletion: {}", e))
            })?;
        }

        Ok(())
    }
}

// ─── Token Operations ────────────────────────────────────────

#[async_trait]
impl TokenStore for FirestoreDb {
    async fn insert_token(&self, record: &AccessRecord) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "insert_token", async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::TOKENS)
                .document_id(&record.access_uuid)
                .object(record)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn find_token(&self, access_uuid: &str) -> Result<Option<AccessRecord>, AppError> {
        with_timeout(STORE_TIMEOUT, "find_token", async {
            let record: Option<AccessRecord> = self
                .get_client()?
                .fluent()
                .select()
                .by_id_in(collections::TOKENS)
                .obj()
                .one(access_uuid)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            // TTL deletion lags behind expiry, so filter here as well.
            let now = Utc::now();
            Ok(record.filter(|r| !r.is_expired_at(now)))
        })
        .await
    }

    async fn token_exists_for_user(&self, user_id: &str) -> Result<bool, AppError> {
        with_timeout(EXISTS_TIMEOUT, "token_exists_for_user", async {
            let now = Utc::now();
            let records = self.tokens_for_user(user_id).await?;
            Ok(records.iter().any(|r| !r.is_expired_at(now)))
        })
        .await
    }

    async fn delete_token(&self, access_uuid: &str) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "delete_token", async {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::TOKENS)
                .document_id(access_uuid)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn delete_tokens_for_user(&self, user_id: &str) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "delete_tokens_for_user", async {
            let records = self.tokens_for_user(user_id).await?;
            self.batch_delete_tokens(&records).await?;
            tracing::debug!(user_id, count = records.len(), "Deleted token records");
            Ok(())
        })
        .await
    }

    /// Firestore TTL policies are declared per collection group at deploy
    /// time (`tokens.expires_at`). Here we only clear records that expired
    /// while the service was down.
    async fn init_expiry_policy(&self) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "init_expiry_policy", async {
            let now = firestore::FirestoreTimestamp(Utc::now());
            let expired: Vec<AccessRecord> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::TOKENS)
                .filter(move |q| {
                    q.for_all([q.field("expires_at").less_than_or_equal(now.clone())])
                })
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;

            self.batch_delete_tokens(&expired).await?;

            tracing::info!(
                collection = collections::TOKENS,
                field = "expires_at",
                purged = expired.len(),
                "Token expiry policy initialized"
            );
            Ok(())
        })
        .await
    }
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl UserStore for FirestoreDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_user", async {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collections::USERS)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    async fn user_exists_with_email(&self, email: &str) -> Result<bool, AppError> {
        with_timeout(EXISTS_TIMEOUT, "user_exists_with_email", async {
            let email = email.to_string();
            let users: Vec<User> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::USERS)
                .filter(move |q| q.for_all([q.field("email").eq(email.clone())]))
                .limit(1)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(!users.is_empty())
        })
        .await
    }

    async fn create_user(&self, user: &User) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "create_user", async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::USERS)
                .document_id(&user.id)
                .object(user)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn list_users_without_role(&self, role: Role) -> Result<Vec<User>, AppError> {
        with_timeout(STORE_TIMEOUT, "list_users_without_role", async {
            self.get_client()?
                .fluent()
                .select()
                .from(collections::USERS)
                .filter(move |q| q.for_all([q.field("role").not_equal(role.as_str())]))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }
}

// ─── Post Operations ─────────────────────────────────────────

#[async_trait]
impl PostStore for FirestoreDb {
    async fn create_post(&self, post: &Post) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "create_post", async {
            let _: () = self
                .get_client()?
                .fluent()
                .insert()
                .into(collections::POSTS)
                .document_id(&post.id)
                .object(post)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_post", async {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collections::POSTS)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    async fn get_post_by_slug(&self, slug: &str) -> Result<Option<Post>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_post_by_slug", async {
            let slug = slug.to_string();
            let posts: Vec<Post> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::POSTS)
                .filter(move |q| q.for_all([q.field("slug").eq(slug.clone())]))
                .limit(1)
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(posts.into_iter().next())
        })
        .await
    }

    async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        with_timeout(STORE_TIMEOUT, "list_posts", async {
            self.get_client()?
                .fluent()
                .select()
                .from(collections::POSTS)
                .order_by([("created_at", FirestoreQueryDirection::Descending)])
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    /// Field mask write so a concurrent like is never overwritten.
    async fn update_post(&self, post: &Post) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "update_post", async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .fields(["title", "slug", "description", "content", "updated_at"])
                .in_col(collections::POSTS)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(&post.id)
                .object(post)
                .execute()
                .await
                .map_err(|e| not_found_or_database(e, || format!("post {} not found", post.id)))?;
            Ok(())
        })
        .await
    }

    async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "delete_post", async {
            self.get_client()?
                .fluent()
                .delete()
                .from(collections::POSTS)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .execute()
                .await
                .map_err(|e| not_found_or_database(e, || format!("post {} not found", id)))?;
            Ok(())
        })
        .await
    }
}

// ─── Comment Operations ──────────────────────────────────────

#[async_trait]
impl CommentStore for FirestoreDb {
    async fn create_comment(&self, comment: &Comment) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "create_comment", async {
            let _: () = self
                .get_client()?
                .fluent()
                .insert()
                .into(collections::COMMENTS)
                .document_id(&comment.id)
                .object(comment)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_comment", async {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collections::COMMENTS)
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    /// Sorted here; ordering in the query would need a composite index.
    async fn list_comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        with_timeout(STORE_TIMEOUT, "list_comments_for_post", async {
            let post_id = post_id.to_string();
            let mut comments: Vec<Comment> = self
                .get_client()?
                .fluent()
                .select()
                .from(collections::COMMENTS)
                .filter(move |q| q.for_all([q.field("blog_post_id").eq(post_id.clone())]))
                .obj()
                .query()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
            Ok(comments)
        })
        .await
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "update_comment", async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .fields(["content", "updated_at"])
                .in_col(collections::COMMENTS)
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(&comment.id)
                .object(comment)
                .execute()
                .await
                .map_err(|e| {
                    not_found_or_database(e, || format!("comment {} not found", comment.id))
                })?;
            Ok(())
        })
        .await
    }
}

// ─── Like Operations ─────────────────────────────────────────

#[async_trait]
impl LikeStore for FirestoreDb {
    async fn get_likes(
        &self,
        target: LikeTarget,
        id: &str,
    ) -> Result<Option<Vec<String>>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_likes", async {
            let doc: Option<LikeSetDoc> = self
                .get_client()?
                .fluent()
                .select()
                .by_id_in(target.collection())
                .obj()
                .one(id)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(doc.map(|d| d.likes))
        })
        .await
    }

    /// `arrayUnion` transform: the server adds the id only if missing.
    /// The write requires the document to exist.
    async fn add_like(&self, target: LikeTarget, id: &str, user_id: &str) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "add_like", async {
            let client = self.get_client()?;
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            client
                .fluent()
                .update()
                .in_col(target.collection())
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .transforms(|t| t.fields([t.field("likes").append_missing_elements([user_id])]))
                .only_transform()
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add like to transaction: {}", e))
                })?;

            transaction.commit().await.map_err(|e| {
                not_found_or_database(e, || format!("{} {} not found", target.noun(), id))
            })?;
            Ok(())
        })
        .await
    }

    /// `arrayRemove` transform: removes every occurrence of the id.
    async fn remove_like(
        &self,
        target: LikeTarget,
        id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "remove_like", async {
            let client = self.get_client()?;
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            client
                .fluent()
                .update()
                .in_col(target.collection())
                .precondition(FirestoreWritePrecondition::Exists(true))
                .document_id(id)
                .transforms(|t| t.fields([t.field("likes").remove_all_from_array([user_id])]))
                .only_transform()
                .add_to_transaction(&mut transaction)
                .map_err(|e| {
                    AppError::Database(format!("Failed to add unlike to transaction: {}", e))
                })?;

            transaction.commit().await.map_err(|e| {
                not_found_or_database(e, || format!("{} {} not found", target.noun(), id))
            })?;
            Ok(())
        })
        .await
    }
}

// ─── Mailing List Operations ─────────────────────────────────

impl FirestoreDb {
    async fn write_mailing_list(&self, list: &MailingList) -> Result<(), AppError> {
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::MAILING_LIST)
            .document_id(collections::MAILING_LIST_DOC)
            .object(list)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add mailing list to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Mailing list commit failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl MailingListStore for FirestoreDb {
    async fn get_mailing_list(&self) -> Result<Option<MailingList>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_mailing_list", async {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collections::MAILING_LIST)
                .obj()
                .one(collections::MAILING_LIST_DOC)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    async fn add_subscriber(&self, subscriber: &Subscriber) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "add_subscriber", async {
            let mut list = self.get_mailing_list().await?.unwrap_or_default();
            if list.contains(&subscriber.email) {
                return Ok(());
            }
            list.subscribers.push(subscriber.clone());
            self.write_mailing_list(&list).await
        })
        .await
    }

    async fn remove_subscriber(&self, email: &str) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "remove_subscriber", async {
            let Some(mut list) = self.get_mailing_list().await? else {
                return Ok(());
            };
            list.subscribers.retain(|s| s.email != email);
            self.write_mailing_list(&list).await
        })
        .await
    }
}

// ─── About Page ──────────────────────────────────────────────

#[async_trait]
impl AboutStore for FirestoreDb {
    async fn get_about(&self) -> Result<Option<About>, AppError> {
        with_timeout(STORE_TIMEOUT, "get_about", async {
            self.get_client()?
                .fluent()
                .select()
                .by_id_in(collections::ABOUT)
                .obj()
                .one(collections::ABOUT_DOC)
                .await
                .map_err(|e| AppError::Database(e.to_string()))
        })
        .await
    }

    async fn put_about(&self, about: &About) -> Result<(), AppError> {
        with_timeout(STORE_TIMEOUT, "put_about", async {
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::ABOUT)
                .document_id(collections::ABOUT_DOC)
                .object(about)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
            Ok(())
        })
        .await
    }
}
