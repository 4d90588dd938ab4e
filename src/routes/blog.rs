// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post, comment, search and about page routes.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{About, Comment, Post};
use crate::routes::auth::MessageResponse;
use crate::routes::validated;
use crate::services::{CommentDraft, PostDraft};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

/// Read-only routes open to everyone.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blog", get(list_posts))
        .route("/blog/{id}", get(get_post))
        .route("/blog/slug/{slug}", get(get_post_by_slug))
        .route("/search", get(search))
        .route("/comment/{id}", get(get_comment))
        .route("/comments/{post_id}", get(list_comments))
        .route("/about", get(get_about))
}

/// Routes for any logged-in user.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/comment", post(create_comment))
        .route("/comment/{id}", put(update_comment))
}

/// Routes for admins only.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/blog", post(create_post))
        .route("/blog/{id}", put(update_post).delete(delete_post))
        .route("/about", put(update_about))
}

// ─── Posts ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct PostRequest {
    #[validate(length(min = 1, message = "title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "description is required"))]
    pub description: String,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

impl From<PostRequest> for PostDraft {
    fn from(request: PostRequest) -> Self {
        Self {
            title: request.title,
            description: request.description,
            content: request.content,
        }
    }
}

async fn create_post(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>)> {
    let request = validated(payload)?;
    let post = state.blog.create_post(request.into()).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn list_posts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Post>>> {
    Ok(Json(state.blog.list_posts().await?))
}

async fn get_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(state.blog.post(&id).await?))
}

async fn get_post_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Post>> {
    Ok(Json(state.blog.post_by_slug(&slug).await?))
}

async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<PostRequest>, JsonRejection>,
) -> Result<Json<Post>> {
    let request = validated(payload)?;
    Ok(Json(state.blog.update_post(&id, request.into()).await?))
}

async fn delete_post(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.blog.delete_post(&id).await?;
    Ok(Json(MessageResponse {
        message: "post deleted".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Post>>> {
    Ok(Json(state.blog.search_posts(&params.q).await?))
}

// ─── Comments ────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, message = "blog_post_id is required"))]
    pub blog_post_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CommentUpdateRequest {
    #[validate(length(min = 1, message = "content is required"))]
    pub content: String,
}

async fn create_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>)> {
    let request = validated(payload)?;
    let draft = CommentDraft {
        blog_post_id: request.blog_post_id,
        parent_id: request.parent_id.filter(|id| !id.is_empty()),
        content: request.content,
    };
    let comment = state.blog.post_comment(&user.user_id, draft).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn get_comment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Comment>> {
    Ok(Json(state.blog.comment(&id).await?))
}

async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<Comment>>> {
    Ok(Json(state.blog.comments_for_post(&post_id).await?))
}

async fn update_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CommentUpdateRequest>, JsonRejection>,
) -> Result<Json<Comment>> {
    let request = validated(payload)?;
    let comment = state
        .blog
        .update_comment(&user.user_id, &id, request.content)
        .await?;
    Ok(Json(comment))
}

// ─── About ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct AboutRequest {
    #[validate(length(min = 1, message = "about_me is required"))]
    pub about_me: String,
    /// Already hosted picture; uploads are not handled here.
    #[validate(url(message = "profile_picture must be a URL"))]
    #[serde(default)]
    pub profile_picture: Option<String>,
}

async fn get_about(State(state): State<Arc<AppState>>) -> Result<Json<About>> {
    Ok(Json(state.blog.about().await?))
}

async fn update_about(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<AboutRequest>, JsonRejection>,
) -> Result<Json<About>> {
    let request = validated(payload)?;
    let about = state
        .blog
        .update_about(
            &user.user_id,
            request.about_me,
            request.profile_picture.unwrap_or_default(),
        )
        .await?;
    Ok(Json(about))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_request_requires_every_field() {
        let request = PostRequest {
            title: "Title".to_string(),
            description: String::new(),
            content: "Body".to_string(),
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("description"));
    }

    #[test]
    fn test_about_picture_must_be_url() {
        let request = AboutRequest {
            about_me: "hi".to_string(),
            profile_picture: Some("not a url".to_string()),
        };
        assert!(request.validate().is_err());

        let request = AboutRequest {
            about_me: "hi".to_string(),
            profile_picture: None,
        };
        assert!(request.validate().is_ok());
    }
}
