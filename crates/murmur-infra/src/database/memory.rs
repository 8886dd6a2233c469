//! In-memory repositories - used as fallback when PostgreSQL is unavailable, and in tests.
//!
//! One store backs every repository port so cascades and uniqueness behave the
//! way the relational schema does.
//! Note: Data is lost on process restart.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use murmur_core::domain::{
    Comment, LikeKind, LikeTarget, NewComment, NewPost, NewUser, Page, PageRequest, Post,
    PostImage, User, UserSummary,
};
use murmur_core::error::RepoError;
use murmur_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, LikeRepository, PostRepository,
    UserRepository,
};
use murmur_core::services::Repositories;

#[derive(Debug, Clone)]
struct LikeRow {
    id: i64,
    user_id: i64,
    target: LikeTarget,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct FollowRow {
    id: i64,
    follower_id: i64,
    followee_id: i64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    posts: BTreeMap<i64, Post>,
    images: Vec<PostImage>,
    comments: BTreeMap<i64, Comment>,
    likes: Vec<LikeRow>,
    follows: Vec<FollowRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn summary(&self, user_id: i64) -> Option<UserSummary> {
        self.users.get(&user_id).map(User::summary)
    }

    fn remove_comment(&mut self, comment_id: i64) -> bool {
        let removed = self.comments.remove(&comment_id).is_some();
        self.likes
            .retain(|l| l.target != LikeTarget::comment(comment_id));
        removed
    }

    fn remove_post(&mut self, post_id: i64) -> bool {
        let removed = self.posts.remove(&post_id).is_some();
        let orphaned: Vec<i64> = self
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();
        for comment_id in orphaned {
            self.remove_comment(comment_id);
        }
        self.images.retain(|i| i.post_id != post_id);
        self.likes.retain(|l| l.target != LikeTarget::post(post_id));
        removed
    }
}

/// Newest first, ties broken by id descending.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn slice<T: Clone>(rows: &[T], request: PageRequest) -> Page<T> {
    let items = rows
        .iter()
        .skip(request.offset() as usize)
        .take(request.per_page() as usize)
        .cloned()
        .collect();
    Page::new(request, rows.len() as u64, items)
}

/// Every repository port over one shared set of tables.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wire one shared store into every port.
    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            posts: self.clone(),
            comments: self.clone(),
            likes: self.clone(),
            follows: self.clone(),
        }
    }
}

#[async_trait]
impl BaseRepository<User, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        let authored: Vec<i64> = tables
            .posts
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        let commented: Vec<i64> = tables
            .comments
            .values()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        for comment_id in commented {
            tables.remove_comment(comment_id);
        }
        tables.likes.retain(|l| l.user_id != id);
        tables
            .follows
            .retain(|f| f.follower_id != id && f.followee_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, new_user: NewUser) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == new_user.username || u.email == new_user.email)
        {
            return Err(RepoError::Constraint(
                "duplicate key value violates unique constraint on users".to_string(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            full_name: None,
            description: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_login(&self, identifier: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == identifier || u.email == identifier)
            .cloned())
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| {
            u.id != user.id && (u.username == user.username || u.email == user.email)
        }) {
            return Err(RepoError::Constraint(
                "duplicate key value violates unique constraint on users".to_string(),
            ));
        }
        match tables.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(user)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn summaries(&self, ids: &[i64]) -> Result<HashMap<i64, UserSummary>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.summary(*id).map(|s| (*id, s)))
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Post, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        if self.tables.write().await.remove_post(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, new_post: NewPost, image_urls: Vec<String>) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&new_post.user_id) {
            return Err(RepoError::Query(format!(
                "foreign key violation: user {} does not exist",
                new_post.user_id
            )));
        }

        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            user_id: new_post.user_id,
            content: new_post.content,
            created_at: now,
            updated_at: now,
        };
        for url in image_urls {
            let id = tables.next_id();
            tables.images.push(PostImage {
                id,
                post_id: post.id,
                url,
            });
        }
        tables.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn update_content(&self, id: i64, content: String) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        let post = tables.posts.get_mut(&id).ok_or(RepoError::NotFound)?;
        post.content = content;
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn page(&self, request: PageRequest) -> Result<Page<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Post> = tables.posts.values().cloned().collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(slice(&rows, request))
    }

    async fn images_for(&self, post_ids: &[i64]) -> Result<Vec<PostImage>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .images
            .iter()
            .filter(|i| post_ids.contains(&i.post_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, i64> for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        if self.tables.write().await.remove_comment(id) {
            Ok(())
        } else {
            Err(RepoError::NotFound)
        }
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, new_comment: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&new_comment.post_id) {
            return Err(RepoError::Query(format!(
                "foreign key violation: post {} does not exist",
                new_comment.post_id
            )));
        }

        let now = Utc::now();
        let comment = Comment {
            id: tables.next_id(),
            user_id: new_comment.user_id,
            post_id: new_comment.post_id,
            content: new_comment.content,
            created_at: now,
            updated_at: now,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_content(&self, id: i64, content: String) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        let comment = tables.comments.get_mut(&id).ok_or(RepoError::NotFound)?;
        comment.content = content;
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn page_for_post(
        &self,
        post_id: i64,
        request: PageRequest,
    ) -> Result<Page<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(slice(&rows, request))
    }

    async fn count_by_post(&self, post_ids: &[i64]) -> Result<HashMap<i64, u64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl LikeRepository for InMemoryStore {
    async fn add(&self, user_id: i64, target: LikeTarget) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.target == target)
        {
            return Err(RepoError::Constraint(format!(
                "duplicate like by user {user_id} on {:?} {}",
                target.kind, target.id
            )));
        }
        let id = tables.next_id();
        tables.likes.push(LikeRow {
            id,
            user_id,
            target,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn remove(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.likes.len();
        tables
            .likes
            .retain(|l| !(l.user_id == user_id && l.target == target));
        Ok(tables.likes.len() < before)
    }

    async fn exists(&self, user_id: i64, target: LikeTarget) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .any(|l| l.user_id == user_id && l.target == target))
    }

    async fn count_by_target(
        &self,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, u64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for like in &tables.likes {
            if like.target.kind == kind && ids.contains(&like.target.id) {
                *counts.entry(like.target.id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn liked_by(
        &self,
        user_id: i64,
        kind: LikeKind,
        ids: &[i64],
    ) -> Result<HashSet<i64>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && l.target.kind == kind && ids.contains(&l.target.id))
            .map(|l| l.target.id)
            .collect())
    }

    async fn likers(
        &self,
        target: LikeTarget,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&LikeRow> = tables.likes.iter().filter(|l| l.target == target).collect();
        newest_first(&mut rows, |l| (l.created_at, l.id));
        let users: Vec<UserSummary> = rows
            .into_iter()
            .filter_map(|l| tables.summary(l.user_id))
            .collect();
        Ok(slice(&users, request))
    }
}

impl InMemoryStore {
    async fn neighbours(
        &self,
        user_id: i64,
        request: PageRequest,
        outgoing: bool,
    ) -> Result<Page<UserSummary>, RepoError> {
        let tables = self.tables.read().await;
        let mut edges: Vec<&FollowRow> = tables
            .follows
            .iter()
            .filter(|f| {
                if outgoing {
                    f.follower_id == user_id
                } else {
                    f.followee_id == user_id
                }
            })
            .collect();
        newest_first(&mut edges, |f| (f.created_at, f.id));
        let users: Vec<UserSummary> = edges
            .into_iter()
            .filter_map(|f| {
                tables.summary(if outgoing {
                    f.followee_id
                } else {
                    f.follower_id
                })
            })
            .collect();
        Ok(slice(&users, request))
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn add(&self, follower_id: i64, followee_id: i64) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id)
        {
            return Err(RepoError::Constraint(format!(
                "duplicate follow {follower_id} -> {followee_id}"
            )));
        }
        let id = tables.next_id();
        tables.follows.push(FollowRow {
            id,
            follower_id,
            followee_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn remove(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.followee_id == followee_id));
        Ok(tables.follows.len() < before)
    }

    async fn exists(&self, follower_id: i64, followee_id: i64) -> Result<bool, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.followee_id == followee_id))
    }

    async fn following(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.neighbours(user_id, request, true).await
    }

    async fn followers(
        &self,
        user_id: i64,
        request: PageRequest,
    ) -> Result<Page<UserSummary>, RepoError> {
        self.neighbours(user_id, request, false).await
    }

    async fn count_followers(&self, user_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.followee_id == user_id)
            .count() as u64)
    }

    async fn count_following(&self, user_id: i64) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .filter(|f| f.follower_id == user_id)
            .count() as u64)
    }
}
