// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Like/unlike on posts and comments.
//!
//! A user appears at most once in a like set. Repeating a like or removing a
//! like that is not there is rejected with a conflict rather than ignored.
//!
//! The membership check and the write are separate calls, but the write is a
//! set operation in the store. Two concurrent likes from one user can both
//! pass the check; the set still gains a single entry and both calls report
//! success.

use crate::db::LikeStore;
use crate::error::AppError;
use crate::models::LikeTarget;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Requested engagement action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeOption {
    Like,
    Unlike,
}

#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn LikeStore>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn LikeStore>) -> Self {
        Self { store }
    }

    pub async fn apply(
        &self,
        target: LikeTarget,
        id: &str,
        user_id: &str,
        option: LikeOption,
    ) -> Result<(), AppError> {
        match option {
            LikeOption::Like => self.like(target, id, user_id).await,
            LikeOption::Unlike => self.unlike(target, id, user_id).await,
        }
    }

    pub async fn like(&self, target: LikeTarget, id: &str, user_id: &str) -> Result<(), AppError> {
        let likes = self.load(target, id).await?;
        if likes.iter().any(|u| u == user_id) {
            return Err(AppError::Conflict(format!("already liked {}", target.noun())));
        }

        self.store.add_like(target, id, user_id).await?;
        tracing::debug!(kind = target.noun(), id, user_id, "Liked");
        Ok(())
    }

    pub async fn unlike(
        &self,
        target: LikeTarget,
        id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        let likes = self.load(target, id).await?;
        if !likes.iter().any(|u| u == user_id) {
            return Err(AppError::Conflict(format!(
                "{} is not currently liked",
                target.noun()
            )));
        }

        self.store.remove_like(target, id, user_id).await?;
        tracing::debug!(kind = target.noun(), id, user_id, "Unliked");
        Ok(())
    }

    async fn load(&self, target: LikeTarget, id: &str) -> Result<Vec<String>, AppError> {
        self.store
            .get_likes(target, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {} not found", target.noun(), id)))
    }
}
