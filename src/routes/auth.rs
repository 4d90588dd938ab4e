// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google login routes and logout.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Redirect,
    routing::{delete, get},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::session::OAUTH_SESSION_TTL;
use crate::AppState;

/// Cookie carrying the login session id between `/login` and `/callback`.
pub const OAUTH_SESSION_COOKIE: &str = "bloggy_oauth_session";
const CALLBACK_PATH: &str = "/callback";

/// Routes reachable without a token.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route(CALLBACK_PATH, get(callback))
}

/// Routes that need `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/logout", delete(logout))
}

fn secure_cookies(state: &AppState) -> bool {
    state.config.redirect_url.starts_with("https://")
}

fn session_cookie(session_id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_SESSION_COOKIE, session_id))
        .path(CALLBACK_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(OAUTH_SESSION_TTL.as_secs() as i64))
        .build()
}

fn removal_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build(OAUTH_SESSION_COOKIE)
        .path(CALLBACK_PATH)
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Start login: remember a fresh state and send the browser to Google.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let redirect = state.oauth.login().await?;
    tracing::info!("Starting OAuth flow, redirecting to Google");

    let jar = jar.add(session_cookie(redirect.session_id, secure_cookies(&state)));
    Ok((jar, Redirect::temporary(&redirect.authorization_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    state: String,
    #[serde(default)]
    code: String,
}

/// Successful login body.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub access_token: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub at_expires: i64,
    pub id: String,
    pub email: String,
    pub verified_email: bool,
    pub name: String,
    pub picture: String,
    pub locale: String,
}

/// Finish login. The session and its cookie are consumed whatever the
/// outcome, including a query string that does not parse.
async fn callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    params: std::result::Result<Query<CallbackParams>, QueryRejection>,
) -> (CookieJar, Result<Json<LoginResponse>>) {
    let session_id = jar.get(OAUTH_SESSION_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(removal_cookie(secure_cookies(&state)));

    let result = match params {
        Ok(Query(params)) => complete_login(&state, session_id.as_deref(), &params).await,
        Err(rejection) => reject_callback(&state, session_id.as_deref(), rejection).await,
    };
    (jar, result.map(Json))
}

async fn reject_callback(
    state: &AppState,
    session_id: Option<&str>,
    rejection: QueryRejection,
) -> Result<LoginResponse> {
    if let Some(session_id) = session_id {
        state.oauth.discard_session(session_id).await?;
    }
    Err(AppError::BadRequest(rejection.body_text()))
}

async fn complete_login(
    state: &AppState,
    session_id: Option<&str>,
    params: &CallbackParams,
) -> Result<LoginResponse> {
    let profile = state
        .oauth
        .callback(session_id, &params.state, &params.code)
        .await?;

    state.users.save_user(&profile).await?;

    let details = state.tokens.generate_token(&profile.id)?;
    state.tokens.save_token(&profile.id, &details).await?;

    tracing::info!(user_id = %profile.id, "User logged in");

    Ok(LoginResponse {
        access_token: details.access_token,
        at_expires: details.at_expires,
        id: profile.id,
        email: profile.email,
        verified_email: profile.verified_email,
        name: profile.name,
        picture: profile.picture,
        locale: profile.locale,
    })
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageResponse {
    pub message: String,
}

/// Revoke the token used for this request.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MessageResponse>> {
    state.tokens.delete_token(&user.access_uuid).await?;
    tracing::info!(user_id = %user.user_id, "User logged out");

    Ok(Json(MessageResponse {
        message: "Successfully logged out".to_string(),
    }))
}
