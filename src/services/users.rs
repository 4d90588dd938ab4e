// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User accounts and mailing list membership.

use crate::db::{MailingListStore, UserStore};
use crate::error::AppError;
use crate::models::{Role, Subscriber, User};
use crate::services::oauth::GoogleUserInfo;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserStore>,
    mailing_list: Arc<dyn MailingListStore>,
    admin_email: String,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailing_list: Arc<dyn MailingListStore>,
        admin_email: String,
    ) -> Self {
        Self {
            users,
            mailing_list,
            admin_email,
        }
    }

    /// Create the account on first login. Existing accounts (matched by
    /// email) are left untouched, including their role.
    pub async fn save_user(&self, profile: &GoogleUserInfo) -> Result<(), AppError> {
        if self.users.user_exists_with_email(&profile.email).await? {
            return Ok(());
        }

        let role = if profile.email == self.admin_email {
            Role::Admin
        } else {
            Role::Reader
        };
        let now = Utc::now();
        let user = User {
            id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            is_verified: profile.verified_email,
            role,
            picture: profile.picture.clone(),
            created_at: now,
            updated_at: now,
        };

        self.users.create_user(&user).await?;
        tracing::info!(user_id = %user.id, role = role.as_str(), "Created user");
        Ok(())
    }

    pub async fn profile(&self, user_id: &str) -> Result<User, AppError> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }

    /// Every non-admin account.
    pub async fn list_readers(&self) -> Result<Vec<User>, AppError> {
        self.users.list_users_without_role(Role::Admin).await
    }

    pub async fn subscribe(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.profile(user_id).await?;
        let list = self.mailing_list.get_mailing_list().await?.unwrap_or_default();
        if list.contains(&user.email) {
            return Err(AppError::Conflict(
                "user is already subscribed to mailing list".to_string(),
            ));
        }

        self.mailing_list
            .add_subscriber(&Subscriber {
                email: user.email,
                name: user.name,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn unsubscribe(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.profile(user_id).await?;
        let list = self.mailing_list.get_mailing_list().await?.unwrap_or_default();
        if !list.contains(&user.email) {
            return Err(AppError::Conflict(
                "user is not subscribed to mailing list".to_string(),
            ));
        }

        self.mailing_list.remove_subscriber(&user.email).await
    }

    pub async fn mailing_list(&self) -> Result<Vec<Subscriber>, AppError> {
        Ok(self
            .mailing_list
            .get_mailing_list()
            .await?
            .map(|list| list.subscribers)
            .unwrap_or_default())
    }
}
