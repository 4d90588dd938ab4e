// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod blog;
pub mod engagement;
pub mod oauth;
pub mod session;
pub mod token;
pub mod users;

pub use blog::{BlogService, CommentDraft, PostDraft};
pub use engagement::{EngagementService, LikeOption};
pub use oauth::{GoogleProvider, GoogleUserInfo, IdentityProvider, LoginRedirect, OAuthFlow};
pub use session::{MemorySessionStore, SessionStore};
pub use token::{TokenError, TokenManager};
pub use users::UserService;
