// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use bloggy::error::AppError;

mod common;
use common::body_json;

#[tokio::test]
async fn test_status_codes() {
    let cases = [
        (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
        (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
        (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
        (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
        (AppError::Conflict("x".into()), StatusCode::CONFLICT),
        (AppError::Provider("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Timeout("find_token"), StatusCode::INTERNAL_SERVER_ERROR),
        (AppError::Database("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (
            AppError::Internal(anyhow::anyhow!("x")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (err, expected) in cases {
        assert_eq!(err.into_response().status(), expected);
    }
}

#[tokio::test]
async fn test_server_errors_hide_details() {
    let response = AppError::Database("connection string with secrets".into()).into_response();
    let body = body_json(response).await;
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let response = AppError::Timeout("find_token").into_response();
    let body = body_json(response).await;
    assert_eq!(body["error"], "timeout");
    assert!(body.get("details").is_none());

    let response = AppError::Provider("invalid_grant: code reuse".into()).into_response();
    let body = body_json(response).await;
    assert_eq!(body["error"], "provider_error");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_client_errors_carry_details() {
    let response = AppError::Unauthorized("token is required".into()).into_response();
    let body = body_json(response).await;
    assert_eq!(body["details"], "unauthorized: token is required");

    let response = AppError::Conflict("already liked post".into()).into_response();
    let body = body_json(response).await;
    assert_eq!(body["error"], "conflict");
    assert_eq!(body["details"], "already liked post");
}
