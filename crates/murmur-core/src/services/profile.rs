//! Own-profile reads/updates and public profiles.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::{FollowStats, ProfileChanges, User, validation};
use crate::error::{DomainError, DomainResult};
use crate::ports::{FollowRepository, UserRepository};

use super::Repositories;

/// What anyone may see about a user.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: i64,
    pub username: String,
    pub full_name: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub stats: FollowStats,
    /// `None` for anonymous viewers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl ProfileService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            follows: repos.follows.clone(),
        }
    }

    pub async fn me(&self, user_id: i64) -> DomainResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::not_found("User", user_id))
    }

    /// Apply a partial update; a new username or email must be valid and unused by anyone else.
    pub async fn update_me(&self, user_id: i64, changes: ProfileChanges) -> DomainResult<User> {
        let mut user = self.me(user_id).await?;
        if changes.is_empty() {
            return Ok(user);
        }

        if let Some(username) = changes.username.as_deref() {
            validation::username(username)?;
            if let Some(other) = self.users.find_by_username(username).await? {
                if other.id != user_id {
                    return Err(DomainError::conflict("Username has been used"));
                }
            }
        }

        if let Some(email) = changes.email.as_deref() {
            validation::email(email)?;
            if let Some(other) = self.users.find_by_email(email).await? {
                if other.id != user_id {
                    return Err(DomainError::conflict("Email has been used"));
                }
            }
        }

        changes.apply(&mut user);
        let user = self.users.update(user).await?;
        tracing::debug!(user_id, "Profile updated");
        Ok(user)
    }

    pub async fn public_profile(
        &self,
        user_id: i64,
        viewer: Option<i64>,
    ) -> DomainResult<PublicProfile> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(DomainError::not_found("User", user_id))?;

        let stats = FollowStats {
            followers: self.follows.count_followers(user_id).await?,
            following: self.follows.count_following(user_id).await?,
        };

        let is_following = match viewer {
            Some(viewer) if viewer == user_id => Some(false),
            Some(viewer) => Some(self.follows.exists(viewer, user_id).await?),
            None => None,
        };

        Ok(PublicProfile {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            description: user.description,
            avatar_url: user.avatar_url,
            stats,
            is_following,
        })
    }
}
