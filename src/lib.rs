// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Bloggy: blog backend with Google login and likes.
//!
//! This crate provides access-token authentication, role-gated routes,
//! posts and comments with likes, and a mailing list, persisted in Firestore.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::Stores;
use services::{
    BlogService, EngagementService, IdentityProvider, OAuthFlow, SessionStore, TokenManager,
    UserService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub tokens: TokenManager,
    pub oauth: OAuthFlow,
    pub users: UserService,
    pub blog: BlogService,
    pub engagement: EngagementService,
}

impl AppState {
    /// Wire services to their storage ports and identity provider.
    pub fn new(
        config: Config,
        stores: Stores,
        provider: Arc<dyn IdentityProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let tokens = TokenManager::new(
            config.access_token_secret.clone(),
            config.access_token_validity,
            stores.tokens.clone(),
        );
        let oauth = OAuthFlow::new(provider, sessions);
        let users = UserService::new(
            stores.users.clone(),
            stores.mailing_list.clone(),
            config.admin_email.clone(),
        );
        let blog = BlogService::new(
            stores.posts.clone(),
            stores.comments.clone(),
            stores.about.clone(),
        );
        let engagement = EngagementService::new(stores.likes.clone());

        Self {
            config,
            tokens,
            oauth,
            users,
            blog,
            engagement,
        }
    }
}
