// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Mailing list subscription routes.

use axum::http::StatusCode;
use bloggy::models::Role;
use tower::ServiceExt;

mod common;
use common::{bearer, body_json, create_test_app, empty_request, login_token, seed_user};

#[tokio::test]
async fn test_subscribe_unsubscribe_and_admin_view() {
    let app = create_test_app();
    seed_user(&app, "admin", "admin@example.com", Role::Admin).await;
    seed_user(&app, "reader", "reader@example.com", Role::Reader).await;
    let admin = bearer(&login_token(&app, "admin").await);
    let reader = bearer(&login_token(&app, "reader").await);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("POST", "/subscribe", Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("POST", "/subscribe", Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/mailing-list", Some(&admin)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let subscribers = body.as_array().unwrap();
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["email"], "reader@example.com");

    let response = app
        .router
        .clone()
        .oneshot(empty_request("GET", "/mailing-list", Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/unsubscribe", Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(empty_request("DELETE", "/unsubscribe", Some(&reader)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["details"], "user is not subscribed to mailing list");
}

#[tokio::test]
async fn test_empty_mailing_list() {
    let app = create_test_app();
    seed_user(&app, "admin", "admin@example.com", Role::Admin).await;
    let admin = bearer(&login_token(&app, "admin").await);

    let response = app
        .router
        .oneshot(empty_request("GET", "/mailing-list", Some(&admin)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, serde_json::json!([]));
}
