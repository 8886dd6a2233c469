//! PostgreSQL repository implementations for users, posts and comments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DbConn, EntityTrait, FromQueryResult,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use murmur_core::domain::{
    Comment, NewComment, NewPost, NewUser, Page, PageRequest, Post, PostImage, User, UserSummary,
};
use murmur_core::error::RepoError;
use murmur_core::ports::{CommentRepository, PostRepository, UserRepository};

use super::entity::comment::{self, Entity as CommentEntity};
use super::entity::post::{self, Entity as PostEntity};
use super::entity::post_image::{self, Entity as PostImageEntity};
use super::entity::user::{self, Entity as UserEntity};
use super::postgres_base::{PostgresBaseRepository, map_db_err};

/// PostgreSQL user repository.
pub type PostgresUserRepository = PostgresBaseRepository<UserEntity>;

/// PostgreSQL post repository.
pub type PostgresPostRepository = PostgresBaseRepository<PostEntity>;

/// PostgreSQL comment repository.
pub type PostgresCommentRepository = PostgresBaseRepository<CommentEntity>;

/// Mask an email for logging to avoid PII in logs.
pub(crate) fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let masked_local = match local.chars().next() {
                Some(first) if local.chars().count() > 1 => format!("{first}***"),
                _ => "***".to_string(),
            };
            format!("{masked_local}@{domain}")
        }
        None => "***".to_string(),
    }
}

/// One row of a `GROUP BY target` count.
#[derive(Debug, FromQueryResult)]
pub(crate) struct GroupCount {
    pub target_id: i64,
    pub total: i64,
}

/// `SELECT col, COUNT(col) ... WHERE col IN ids GROUP BY col` in a single round trip.
pub(crate) async fn grouped_counts<E, C>(
    db: &DbConn,
    group_col: C,
    extra: Condition,
    ids: &[i64],
) -> Result<HashMap<i64, u64>, RepoError>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = E::find()
        .select_only()
        .column_as(group_col, "target_id")
        .column_as(Expr::col(group_col).count(), "total")
        .filter(group_col.is_in(ids.iter().copied()))
        .filter(extra)
        .group_by(group_col)
        .into_model::<GroupCount>()
        .all(db)
        .await
        .map_err(map_db_err)?;

    Ok(rows
        .into_iter()
        .map(|row| (row.target_id, row.total.max(0) as u64))
        .collect())
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        tracing::debug!(user_email = %mask_email(&new_user.email), "Creating user");
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let model = user::ActiveModel {
            username: Set(new_user.username),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            full_name: Set(None),
            description: Set(None),
            avatar_url: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        tracing::debug!(user_email = %mask_email(email), "Finding user by email");

        let result = UserEntity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let result = UserEntity::find()
            .filter(
                Condition::any()
                    .add(user::Column::Username.eq(identifier))
                    .add(user::Column::Email.eq(identifier)),
            )
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(result.map(Into::into))
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let active: user::ActiveModel = user.into();

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let model = active.update(&txn).await.map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>, RepoError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = UserEntity::find()
            .filter(user::Column::Id.is_in(ids.iter().copied()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows
            .into_iter()
            .map(|model| (model.id, UserSummary::from(model)))
            .collect())
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, new_post: NewPost, image_urls: Vec<String>) -> Result<Post, RepoError> {
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let model = post::ActiveModel {
            user_id: Set(new_post.user_id),
            content: Set(new_post.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;

        if !image_urls.is_empty() {
            let images = image_urls.into_iter().map(|url| post_image::ActiveModel {
                post_id: Set(model.id),
                url: Set(url),
                ..Default::default()
            });
            PostImageEntity::insert_many(images)
                .exec(&txn)
                .await
                .map_err(map_db_err)?;
        }

        // Dropping `txn` on any error above rolls the post row back.
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn update_content(&self, id: i64, content: String) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let mut active = PostEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?
            .into_active_model();
        active.content = Set(content);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(&txn).await.map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn page(&self, request: PageRequest) -> Result<Page<Post>, RepoError> {
        let paginator = PostEntity::find()
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .paginate(&self.db, request.per_page());

        let total = paginator.num_items().await.map_err(map_db_err)?;
        let rows = paginator
            .fetch_page(request.page() - 1)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            request,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn images_for(&self, post_ids: &[i64]) -> Result<Vec<PostImage>, RepoError> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = PostImageEntity::find()
            .filter(post_image::Column::PostId.is_in(post_ids.iter().copied()))
            .order_by_asc(post_image::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, RepoError> {
        let now = Utc::now();

        let txn = self.db.begin().await.map_err(map_db_err)?;
        let model = comment::ActiveModel {
            user_id: Set(new_comment.user_id),
            post_id: Set(new_comment.post_id),
            content: Set(new_comment.content),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn update_content(&self, id: i64, content: String) -> Result<Comment, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let mut active = CommentEntity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(map_db_err)?
            .ok_or(RepoError::NotFound)?
            .into_active_model();
        active.content = Set(content);
        active.updated_at = Set(Utc::now().into());
        let model = active.update(&txn).await.map_err(map_db_err)?;
        txn.commit().await.map_err(map_db_err)?;

        Ok(model.into())
    }

    async fn page_for_post(
        &self,
        post_id: i64,
        request: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let paginator = CommentEntity::find()
            .filter(comment::Column::PostId.eq(post_id))
            .order_by_desc(comment::Column::CreatedAt)
            .order_by_desc(comment::Column::Id)
            .paginate(&self.db, request.per_page());

        let total = paginator.num_items().await.map_err(map_db_err)?;
        let rows = paginator
            .fetch_page(request.page() - 1)
            .await
            .map_err(map_db_err)?;

        Ok(Page::new(
            request,
            total,
            rows.into_iter().map(Into::into).collect(),
        ))
    }

    async fn count_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>, RepoError> {
        grouped_counts::<CommentEntity, _>(
            &self.db,
            comment::Column::PostId,
            Condition::all(),
            post_ids,
        )
        .await
    }
}
