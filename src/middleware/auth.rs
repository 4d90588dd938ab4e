// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access token authentication and role authorization middleware.

use crate::error::AppError;
use crate::models::Role;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub access_uuid: String,
}

/// Token from an `Authorization: <scheme> <token>` header.
///
/// The header must split on spaces into exactly two parts.
pub fn extract_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [_, token] if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Middleware that requires a valid, unrevoked access token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_token(request.headers())
        .ok_or_else(|| AppError::Unauthorized("token is required".to_string()))?
        .to_string();

    let access = state.tokens.authenticate(&token).await.map_err(|err| {
        tracing::debug!(error = %err, "Rejected access token");
        err
    })?;

    request.extensions_mut().insert(AuthUser {
        user_id: access.user_id,
        access_uuid: access.access_uuid,
    });

    Ok(next.run(request).await)
}

/// Check that the authenticated caller holds one of `allowed`.
///
/// Must run after `require_auth`.
pub async fn require_role(
    state: &AppState,
    auth_user: Option<AuthUser>,
    allowed: &[Role],
) -> Result<(), AppError> {
    let auth_user = auth_user.ok_or_else(|| {
        AppError::Forbidden("you are not authorized to access this resource".to_string())
    })?;

    let user = state.users.profile(&auth_user.user_id).await.map_err(|err| {
        tracing::warn!(user_id = %auth_user.user_id, error = %err, "Role lookup failed");
        AppError::Forbidden(
            "unable to load user: you are not authorized to access this resource".to_string(),
        )
    })?;

    if !allowed.contains(&user.role) {
        tracing::info!(
            user_id = %auth_user.user_id,
            role = user.role.as_str(),
            "Blocked request: role not allowed"
        );
        return Err(AppError::Forbidden(
            "you are not authorized to access this resource".to_string(),
        ));
    }

    Ok(())
}

/// Middleware that restricts a route to admins.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = request.extensions().get::<AuthUser>().cloned();
    require_role(&state, auth_user, &[Role::Admin]).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_extract_token_two_parts() {
        assert_eq!(extract_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        // Scheme is not checked, only the shape.
        assert_eq!(extract_token(&headers("Token abc")), Some("abc"));
    }

    #[test]
    fn test_extract_token_rejects_other_shapes() {
        assert_eq!(extract_token(&HeaderMap::new()), None);
        assert_eq!(extract_token(&headers("abc.def.ghi")), None);
        assert_eq!(extract_token(&headers("Bearer a b")), None);
        assert_eq!(extract_token(&headers("Bearer  abc")), None);
        assert_eq!(extract_token(&headers("Bearer ")), None);
    }
}
