//! PostgreSQL repositories for likes and follow edges.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, EntityTrait, JoinType, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};

use murmur_core::domain::{LikeKind, LikeTarget, Page, PageRequest, UserSummary};
use murmur_core::error::RepoError;
use murmur_core::ports::{FollowRepository, LikeRepository};

use super::entity::comment_like::{self, Entity as CommentLikeEntity};
use super::entity::follow::{self, Entity as FollowEntity};
use super::entity::post_like::{self, Entity as PostLikeEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::map_db_err;
use super::postgres_repo::grouped_counts;

/// PostgreSQL like repository, covering both `post_likes` and `comment_likes`.
pub struct PostgresLikeRepository {
    db: DbConn,
}

impl PostgresLikeRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn add(&self, user_id: i64, target: LikeTarget) -> Result<(), RepoError> {
        let now = Utc::now();
        let txn = self.db.begin().await.map_err(map_db_err)?;

        match target.kind {
            LikeKind::Post => {
                post_like::ActiveModel {
                    user_id: Set(user_id),
                    post_id: Set(target.id),
                    created_at: Set(now.into()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(map_db_err)?;
            }
            LikeKind::Comment => {
                comment_like::ActiveModel {
                    user_id: Set(user_id),
                    comment_id: Set(target.id),
                    created_at: Set(now.into()),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(map_db_err)?;
            }
        }

        txn.commit().await.map_err(map_db_err)
    }

    async fn remove(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;

        let result = match target.kind {
            LikeKind::Post => {
                PostLikeEntity::delete_many()
                    .filter(post_like::Column::UserId.eq(user_id))
                    .filter(post_like::Column::PostId.eq(target.id))
                    .exec(&txn)
                    .await
            }
            LikeKind::Comment => {
                CommentLikeEntity::delete_many()
                    .filter(comment_like::Column::UserId.eq(user_id))
                    .filter(comment_like::Column::CommentId.eq(target.id))
                    .exec(&txn)
                    .await
            }
        }
        .map_err(map_db_err)?;

        txn.commit().await.map_err(map_db_err)?;
        Ok(result.rows_affected > 0)
    }

    async fn exists(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError> {
        let count = match target.kind {
            LikeKind::Post => {
                PostLikeEntity::find()
                    .filter(post_like::Column::UserId.eq(user_id))
                    .filter(post_like::Column::PostId.eq(target.id))
                    .count(&self.db)
                    .await
            }
            LikeKind::Comment => {
                CommentLikeEntity::find()
                    .filter(comment_like::Column::UserId.eq(user_id))
                    .filter(comment_like::Column::CommentId.eq(target.id))
                    .count(&self.db)
                    .await
            }
        }
        .map_err(map_db_err)?;

        Ok(count > 0)
    }

    async fn count_by_target(
        &self,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, u64>, RepoError> {
        match kind {
            LikeKind::Post => {
                grouped_counts::<PostLikeEntity, _>(
                    &self.db,
                    post_like::Column::PostId,
                    Condition::all(),
                    ids,
                )
                .await
            }
            LikeKind::Comment => {
                grouped_counts::<CommentLikeEntity, _>(
                    &self.db,
                    comment_like::Column::CommentId,
                    Condition::all(),
                    ids,
                )
                .await
            }
        }
    }

    async fn liked_by(
        &self,
        user_id: i64,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashSet<i64>, RepoError> {
        if ids.is_empty() {
            return Ok(HashSet::new());
        }

        let liked: Vec<i64> = match kind {
            LikeKind::Post => {
                PostLikeEntity::find()
                    .select_only()
                    .column(post_like::Column::PostId)
                    .filter(post_like::Column::UserId.eq(user_id))
                    .filter(post_like::Column::PostId.is_in(ids.iter().copied()))
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await
            }
            LikeKind::Comment => {
                CommentLikeEntity::find()
                    .select_only()
                    .column(comment_like::Column::CommentId)
                    .filter(comment_like::Column::UserId.eq(user_id))
                    .filter(comment_like::Column::CommentId.is_in(ids.iter().copied()))
                    .into_tuple::<i64>()
                    .all(&self.db)
                    .await
            }
        }
        .map_err(map_db_err)?;

        Ok(liked.into_iter().collect())
    }

    async fn likers(
        &self,
        target: LikeTarget,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        let query = match target.kind {
            LikeKind::Post => UserEntity::find()
                .join(JoinType::InnerJoin, post_like::Relation::User.def().rev())
                .filter(post_like::Column::PostId.eq(target.id))
                .order_by_desc(post_like::Column::CreatedAt)
                .order_by_desc(post_like::Column::Id),
            LikeKind::Comment => UserEntity::find()
                .join(JoinType::InnerJoin, comment_like::Relation::User.def().rev())
                .filter(comment_like::Column::CommentId.eq(target.id))
                .order_by_desc(comment_like::Column::CreatedAt)
                .order_by_desc(comment_like::Column::Id),
        };

        let paginator = query.paginate(&self.db, request.per_page());
        let total = paginator.num_items().await.map_err(map_db_err)?;
        let rows = paginator
            .fetch_page(request.page() - 1)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            request,
            total,
            rows.into_iter().map(UserSummary::from).collect(),
        ))
    }
}

/// PostgreSQL follow-edge repository.
pub struct PostgresFollowRepository {
    db: DbConn,
}

impl PostgresFollowRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }

    /// Users on the far side of `user_id`'s edges, newest edge first.
    async fn neighbours(
        &self,
        edge: follow::Relation,
        anchor: follow::Column,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        let paginator = UserEntity::find()
            .join(JoinType::InnerJoin, edge.def().rev())
            .filter(anchor.eq(user_id))
            .order_by_desc(follow::Column::CreatedAt)
            .order_by_desc(follow::Column::Id)
            .paginate(&self.db, request.per_page());

        let total = paginator.num_items().await.map_err(map_db_err)?;
        let rows: Vec<user::Model> = paginator
            .fetch_page(request.page() - 1)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            request,
            total,
            rows.into_iter().map(UserSummary::from).collect(),
        ))
    }
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn add(&self, follower_id: i64, followee_id: i64) -> Result<(), RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        follow::ActiveModel {
            follower_id: Set(follower_id),
            followee_id: Set(followee_id),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)
    }

    async fn remove(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = FollowEntity::delete_many()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .exec(&txn)
            .await
            .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(result.rows_affected > 0)
    }

    async fn exists(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError> {
        let count = FollowEntity::find()
            .filter(follow::Column::FollowerId.eq(follower_id))
            .filter(follow::Column::FolloweeId.eq(followee_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(count > 0)
    }

    async fn following(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.neighbours(
            follow::Relation::Followee,
            follow::Column::FollowerId,
            user_id,
            request,
        )
        .await
    }

    async fn followers(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.neighbours(
            follow::Relation::Follower,
            follow::Column::FolloweeId,
            user_id,
            request,
        )
        .await
    }

    async fn count_followers(&self, user_id: i64) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::FolloweeId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        FollowEntity::find()
            .filter(follow::Column::FollowerId.eq(user_id))
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }
}
