//! Social graph: follow edges between users.

use std::sync::Arc;

use crate::domain::{FollowStats, Page, PageRequest, UserSummary};
use crate::error::{DomainError, DomainResult, RepoError};
use crate::ports::{FollowRepository, UserRepository};

use super::Repositories;

pub struct GraphService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl GraphService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            follows: repos.follows.clone(),
        }
    }

    pub async fn follow(&self, follower_id: i64, target_id: i64) -> DomainResult<()> {
        if follower_id == target_id {
            return Err(DomainError::validation("You cannot follow yourself"));
        }
        self.ensure_user(target_id).await?;

        if self.follows.exists(follower_id, target_id).await? {
            return Err(DomainError::conflict("Already following this user"));
        }

        self.follows
            .add(follower_id, target_id)
            .await
            .map_err(|e| match e {
                RepoError::Constraint(_) => DomainError::conflict("Already following this user"),
                other => other.into(),
            })?;

        tracing::debug!(follower_id, target_id, "Follow edge created");
        Ok(())
    }

    pub async fn unfollow(&self, follower_id: i64, target_id: i64) -> DomainResult<()> {
        self.ensure_user(target_id).await?;

        if !self.follows.remove(follower_id, target_id).await? {
            return Err(DomainError::validation("You are not following this user"));
        }
        Ok(())
    }

    pub async fn following(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> DomainResult<Page<UserSummary>> {
        self.ensure_user(user_id).await?;
        self.follows
            .following(user_id, request)
            .await?
            .ensure_in_range()
    }

    pub async fn followers(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> DomainResult<Page<UserSummary>> {
        self.ensure_user(user_id).await?;
        self.follows
            .followers(user_id, request)
            .await?
            .ensure_in_range()
    }

    pub async fn stats(&self, user_id: i64) -> DomainResult<FollowStats> {
        self.ensure_user(user_id).await?;
        Ok(FollowStats {
            followers: self.follows.count_followers(user_id).await?,
            following: self.follows.count_following(user_id).await?,
        })
    }

    /// A user never counts as following themself, independent of the self-follow rejection above.
    pub async fn is_following(&self, viewer_id: i64, target_id: i64) -> DomainResult<bool> {
        if viewer_id == target_id {
            return Ok(false);
        }
        self.ensure_user(target_id).await?;
        Ok(self.follows.exists(viewer_id, target_id).await?)
    }

    async fn ensure_user(&self, user_id: i64) -> DomainResult<()> {
        match self.users.find_by_id(user_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("User", user_id)),
        }
    }
}
