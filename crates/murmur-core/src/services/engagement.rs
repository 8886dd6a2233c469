//! Engagement store: likes on posts and comments.

use std::sync::Arc;

use crate::domain::{LikeKind, LikeTarget, Page, PageRequest, UserSummary};
use crate::error::{DomainError, DomainResult, RepoError};
use crate::ports::{CommentRepository, LikeRepository, PostRepository};

use super::Repositories;

pub struct EngagementService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    likes: Arc<dyn LikeRepository>,
}

impl EngagementService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            posts: repos.posts.clone(),
            comments: repos.comments.clone(),
            likes: repos.likes.clone(),
        }
    }

    /// Like a target, returning its new like count.
    ///
    /// Two concurrent likes by the same user race on the storage uniqueness
    /// constraint; the loser gets `Conflict`.
    pub async fn like(&self, user_id: i64, target: LikeTarget) -> DomainResult<u64> {
        self.ensure_target(target).await?;

        if self.likes.exists(user_id, target).await? {
            return Err(DomainError::conflict("Already liked"));
        }

        self.likes.add(user_id, target).await.map_err(|e| match e {
            RepoError::Constraint(_) => DomainError::conflict("Already liked"),
            other => other.into(),
        })?;

        self.count(target).await
    }

    /// Remove a like, returning the target's new like count.
    pub async fn unlike(&self, user_id: i64, target: LikeTarget) -> DomainResult<u64> {
        self.ensure_target(target).await?;

        if !self.likes.remove(user_id, target).await? {
            return Err(DomainError::validation("You have not liked this yet"));
        }

        self.count(target).await
    }

    /// Users who liked the target.
    pub async fn likers(
        &self,
        target: LikeTarget,
        request: PageRequest,
    ) -> DomainResult<Page<UserSummary>> {
        self.ensure_target(target).await?;
        self.likes.likers(target, request).await?.ensure_in_range()
    }

    async fn count(&self, target: LikeTarget) -> DomainResult<u64> {
        let counts = self.likes.count_by_target(target.kind, &[target.id]).await?;
        Ok(counts.get(&target.id).copied().unwrap_or(0))
    }

    async fn ensure_target(&self, target: LikeTarget) -> DomainResult<()> {
        let found = match target.kind {
            LikeKind::Post => self.posts.find_by_id(target.id).await?.is_some(),
            LikeKind::Comment => self.comments.find_by_id(target.id).await?.is_some(),
        };
        if !found {
            return Err(DomainError::not_found(target.kind.entity_name(), target.id));
        }
        Ok(())
    }
}
