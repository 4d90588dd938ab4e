// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod post;
pub mod token;
pub mod user;

pub use post::{About, Comment, LikeTarget, Post};
pub use token::{AccessDetails, AccessRecord, TokenDetails};
pub use user::{MailingList, Role, Subscriber, User};
