// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{LikeTarget, Role, Subscriber, User};
use crate::routes::auth::MessageResponse;
use crate::routes::validated;
use crate::services::LikeOption;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Routes for any logged-in user.
/// The auth middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/like-unlike-post", post(like_unlike_post))
        .route("/like-unlike-comment", post(like_unlike_comment))
        .route("/subscribe", post(subscribe))
        .route("/unsubscribe", delete(unsubscribe))
}

/// Routes for admins only.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/mailing-list", get(get_mailing_list))
}

// ─── Users ───────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub is_verified: bool,
    pub role: Role,
    pub picture: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            is_verified: user.is_verified,
            role: user.role,
            picture: user.picture,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let profile = state.users.profile(&user.user_id).await?;
    Ok(Json(profile.into()))
}

/// Every non-admin account.
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserResponse>>> {
    let users = state.users.list_readers().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

// ─── Likes ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
pub struct LikeRequest {
    #[validate(length(min = 1, message = "id is required"))]
    pub id: String,
    pub option: LikeOption,
}

async fn like_unlike(
    state: &AppState,
    user: &AuthUser,
    target: LikeTarget,
    request: LikeRequest,
) -> Result<Json<MessageResponse>> {
    state
        .engagement
        .apply(target, &request.id, &user.user_id, request.option)
        .await?;

    let message = match request.option {
        LikeOption::Like => format!("{} liked", target.noun()),
        LikeOption::Unlike => format!("{} unliked", target.noun()),
    };
    Ok(Json(MessageResponse { message }))
}

async fn like_unlike_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<LikeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    like_unlike(&state, &user, LikeTarget::Post, validated(payload)?).await
}

async fn like_unlike_comment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<LikeRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    like_unlike(&state, &user, LikeTarget::Comment, validated(payload)?).await
}

// ─── Mailing List ────────────────────────────────────────────

async fn subscribe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    state.users.subscribe(&user.user_id).await?;
    Ok(Json(MessageResponse {
        message: "subscribed to mailing list".to_string(),
    }))
}

async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    state.users.unsubscribe(&user.user_id).await?;
    Ok(Json(MessageResponse {
        message: "unsubscribed from mailing list".to_string(),
    }))
}

async fn get_mailing_list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Subscriber>>> {
    Ok(Json(state.users.mailing_list().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_user_response_from_user() {
        let created = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let user = User {
            id: "u1".to_string(),
            name: "Reader".to_string(),
            email: "r@example.com".to_string(),
            is_verified: true,
            role: Role::Reader,
            picture: String::new(),
            created_at: created,
            updated_at: created,
        };

        let response = UserResponse::from(user);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["created_at"], "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn test_like_request_requires_id() {
        let request = LikeRequest {
            id: String::new(),
            option: LikeOption::Like,
        };
        assert!(request.validate().is_err());
    }
}
