// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Posts, comments, search and the about page.
//!
//! Slugs are derived from the title and kept unique: a clash gets a numeric
//! suffix. Editing a post never touches its like set, and only a comment's
//! author may edit it.

use crate::db::{AboutStore, CommentStore, PostStore};
use crate::error::AppError;
use crate::models::{About, Comment, Post};
use chrono::Utc;
use std::sync::Arc;

/// Editable fields of a post.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// A new comment, optionally replying to another comment on the same post.
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub blog_post_id: String,
    pub parent_id: Option<String>,
    pub content: String,
}

#[derive(Clone)]
pub struct BlogService {
    posts: Arc<dyn PostStore>,
    comments: Arc<dyn CommentStore>,
    about: Arc<dyn AboutStore>,
}

impl BlogService {
    pub fn new(
        posts: Arc<dyn PostStore>,
        comments: Arc<dyn CommentStore>,
        about: Arc<dyn AboutStore>,
    ) -> Self {
        Self {
            posts,
            comments,
            about,
        }
    }

    // ─── Posts ───────────────────────────────────────────────

    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, AppError> {
        let slug = self.unique_slug(&draft.title, None).await?;
        let now = Utc::now();
        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            title: draft.title,
            slug,
            description: draft.description,
            content: draft.content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.posts.create_post(&post).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, "Created post");
        Ok(post)
    }

    pub async fn post(&self, id: &str) -> Result<Post, AppError> {
        self.posts
            .get_post(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post {} not found", id)))
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<Post, AppError> {
        self.posts
            .get_post_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("post with slug {} not found", slug)))
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        self.posts.list_posts().await
    }

    /// Replace the editable fields and re-derive the slug.
    pub async fn update_post(&self, id: &str, draft: PostDraft) -> Result<Post, AppError> {
        let mut post = self.post(id).await?;
        post.slug = self.unique_slug(&draft.title, Some(id)).await?;
        post.title = draft.title;
        post.description = draft.description;
        post.content = draft.content;
        post.updated_at = Utc::now();

        self.posts.update_post(&post).await?;
        tracing::info!(post_id = %post.id, slug = %post.slug, "Updated post");
        Ok(post)
    }

    pub async fn delete_post(&self, id: &str) -> Result<(), AppError> {
        self.posts.delete_post(id).await?;
        tracing::info!(post_id = id, "Deleted post");
        Ok(())
    }

    /// Posts whose title, description or content contain `query`, ignoring case.
    pub async fn search_posts(&self, query: &str) -> Result<Vec<Post>, AppError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::BadRequest("query param is required".to_string()));
        }

        let posts = self.posts.list_posts().await?;
        Ok(posts.into_iter().filter(|p| p.matches(&needle)).collect())
    }

    /// Slug for `title`, suffixed `-1`, `-2`, ... until no other post has it.
    async fn unique_slug(&self, title: &str, ignore_id: Option<&str>) -> Result<String, AppError> {
        let base = slug::slugify(title);
        let base = if base.is_empty() {
            format!("post-{}", Utc::now().timestamp())
        } else {
            base
        };

        let mut candidate = base.clone();
        let mut counter = 1u64;
        loop {
            match self.posts.get_post_by_slug(&candidate).await? {
                Some(existing) if Some(existing.id.as_str()) != ignore_id => {
                    candidate = format!("{}-{}", base, counter);
                    counter += 1;
                }
                _ => return Ok(candidate),
            }
        }
    }

    // ─── Comments ────────────────────────────────────────────

    pub async fn post_comment(
        &self,
        author_id: &str,
        draft: CommentDraft,
    ) -> Result<Comment, AppError> {
        self.post(&draft.blog_post_id).await?;

        if let Some(parent_id) = &draft.parent_id {
            let parent = self.comment(parent_id).await?;
            if parent.blog_post_id != draft.blog_post_id {
                return Err(AppError::BadRequest(
                    "parent comment belongs to a different post".to_string(),
                ));
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            blog_post_id: draft.blog_post_id,
            parent_id: draft.parent_id,
            content: draft.content,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.comments.create_comment(&comment).await?;
        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.blog_post_id,
            author_id,
            "Posted comment"
        );
        Ok(comment)
    }

    pub async fn comment(&self, id: &str) -> Result<Comment, AppError> {
        self.comments
            .get_comment(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("comment {} not found", id)))
    }

    pub async fn comments_for_post(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        self.comments.list_comments_for_post(post_id).await
    }

    pub async fn update_comment(
        &self,
        author_id: &str,
        id: &str,
        content: String,
    ) -> Result<Comment, AppError> {
        let mut comment = self.comment(id).await?;
        if comment.author_id != author_id {
            return Err(AppError::Forbidden(
                "only the author can edit this comment".to_string(),
            ));
        }

        comment.content = content;
        comment.updated_at = Utc::now();
        self.comments.update_comment(&comment).await?;
        Ok(comment)
    }

    // ─── About ───────────────────────────────────────────────

    pub async fn about(&self) -> Result<About, AppError> {
        self.about
            .get_about()
            .await?
            .ok_or_else(|| AppError::NotFound("about page has not been written".to_string()))
    }

    pub async fn update_about(
        &self,
        admin_id: &str,
        about_me: String,
        profile_picture: String,
    ) -> Result<About, AppError> {
        let about = About {
            about_me,
            profile_picture,
            updated_by: admin_id.to_string(),
            updated_at: Utc::now(),
        };
        self.about.put_about(&about).await?;
        tracing::info!(admin_id, "Updated about page");
        Ok(about)
    }
}
