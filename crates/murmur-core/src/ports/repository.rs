use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::domain::{
    Comment, LikeKind, LikeTarget, NewComment, NewPost, NewUser, Page, PageRequest, Post,
    PostImage, User, UserSummary,
};
use crate::error::RepoError;

/// Generic repository trait for id lookups and deletes.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID, cascading to whatever it owns.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, i64> {
    /// Insert a new user; a taken username or email surfaces as [`RepoError::Constraint`].
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;

    /// Match `identifier` against username or email.
    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, RepoError>;

    /// Persist changed profile fields of an existing user.
    async fn update(&self, user: User) -> Result<User, RepoError>;

    /// Batched display-field lookup.
    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i64> {
    /// Insert a post and its image rows in one transaction.
    async fn create(&self, post: NewPost, image_urls: Vec<String>) -> Result<Post, RepoError>;

    async fn update_content(&self, id: i64, content: String) -> Result<Post, RepoError>;

    /// Newest first, ties broken by id descending.
    async fn page(&self, request: PageRequest) -> Result<Page<Post>, RepoError>;

    /// Batched image lookup for a set of posts.
    async fn images_for(&self, post_ids: &[i64]) -> Result<Vec<PostImage>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i64> {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError>;

    async fn update_content(&self, id: i64, content: String) -> Result<Comment, RepoError>;

    /// One post's comments, newest first, ties broken by id descending.
    async fn page_for_post(
        &self,
        post_id: i64,
        request: PageRequest,
    ) -> Result<Page<Comment>, RepoError>;

    /// Comment counts grouped by post id; posts without comments are absent.
    async fn count_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>, RepoError>;
}

/// Likes on posts and comments.
#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Insert a like; an existing (user, target) pair surfaces as [`RepoError::Constraint`].
    async fn add(&self, user_id: i64, target: LikeTarget) -> Result<(), RepoError>;

    /// Remove a like, reporting whether one existed.
    async fn remove(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError>;

    async fn exists(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError>;

    /// Like counts grouped by target id; targets without likes are absent.
    async fn count_by_target(
        &self,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, u64>, RepoError>;

    /// The subset of `ids` the user has liked.
    async fn liked_by(
        &self,
        user_id: i64,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashSet<i64>, RepoError>;

    /// Users who liked the target, most recent first.
    async fn likers(
        &self,
        target: LikeTarget,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError>;
}

/// Follower/followee edges.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Insert an edge; an existing ordered pair surfaces as [`RepoError::Constraint`].
    async fn add(&self, follower_id: i64, followee_id: i64) -> Result<(), RepoError>;

    async fn remove(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError>;

    async fn exists(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError>;

    /// Users `user_id` follows.
    async fn following(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError>;

    /// Users following `user_id`.
    async fn followers(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError>;

    async fn count_followers(&self, user_id: i64) -> Result<u64, RepoError>;

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError>;
}
