//! Feed aggregator: paginated post and comment listings enriched with engagement.
//!
//! Each page costs a fixed number of queries regardless of its size: the page
//! itself, then one batched lookup each for like counts, comment counts, the
//! viewer's own likes, author display fields and images.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::{
    CommentView, DEFAULT_EXCERPT_LENGTH, LikeKind, Page, PageRequest, Post, PostView,
    excerpt,
};
use crate::error::{DomainError, DomainResult};
use crate::ports::{CommentRepository, LikeRepository, PostRepository, UserRepository};

use super::Repositories;

pub struct FeedService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    likes: Arc<dyn LikeRepository>,
    excerpt_length: usize,
}

impl FeedService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            posts: repos.posts.clone(),
            comments: repos.comments.clone(),
            likes: repos.likes.clone(),
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
        }
    }

    pub fn with_excerpt_length(mut self, excerpt_length: usize) -> Self {
        self.excerpt_length = excerpt_length;
        self
    }

    /// Newest posts first, contents cut to the excerpt length.
    pub async fn list_posts(
        &self,
        request: PageRequest,
        viewer: Option<i64>,
    ) -> DomainResult<Page<PostView>> {
        let page = self.posts.page(request).await?.ensure_in_range()?;
        let excerpt_length = self.excerpt_length;
        self.enrich_posts(page, viewer, |content| excerpt(content, excerpt_length))
            .await
    }

    /// A single post with its full content.
    pub async fn get_post(&self, post_id: i64, viewer: Option<i64>) -> DomainResult<PostView> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::not_found("Post", post_id))?;

        let page = Page::new(PageRequest::default(), 1, vec![post]);
        let mut views = self.enrich_posts(page, viewer, str::to_string).await?;
        views
            .items
            .pop()
            .ok_or_else(|| DomainError::Internal("post view vanished".to_string()))
    }

    /// Newest comments of one post first.
    pub async fn list_comments(
        &self,
        post_id: i64,
        request: PageRequest,
        viewer: Option<i64>,
    ) -> DomainResult<Page<CommentView>> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("Post", post_id));
        }

        let page = self
            .comments
            .page_for_post(post_id, request)
            .await?
            .ensure_in_range()?;
        if page.items.is_empty() {
            return Ok(page.with_items(Vec::new()));
        }

        let ids = page.ids(|c| c.id);
        let author_ids: Vec<i64> = page.items.iter().map(|c| c.user_id).collect();

        let like_counts = self.likes.count_by_target(LikeKind::Comment, &ids).await?;
        let liked = self.liked_set(viewer, LikeKind::Comment, &ids).await?;
        let authors = self.users.summaries(&author_ids).await?;

        Ok(page.map(|comment| CommentView {
            likes: like_counts.get(&comment.id).copied().unwrap_or(0),
            is_liked: liked.contains(&comment.id),
            author: authors.get(&comment.user_id).cloned(),
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at: comment.created_at,
        }))
    }

    async fn enrich_posts(
        &self,
        page: Page<Post>,
        viewer: Option<i64>,
        render: impl Fn(&str) -> String,
    ) -> DomainResult<Page<PostView>> {
        if page.items.is_empty() {
            return Ok(page.with_items(Vec::new()));
        }

        let ids = page.ids(|p| p.id);
        let author_ids: Vec<i64> = page.items.iter().map(|p| p.user_id).collect();

        let like_counts = self.likes.count_by_target(LikeKind::Post, &ids).await?;
        let comment_counts = self.comments.count_by_post(&ids).await?;
        let liked = self.liked_set(viewer, LikeKind::Post, &ids).await?;
        let authors = self.users.summaries(&author_ids).await?;

        let mut images: HashMap<i64, Vec<String>> = HashMap::new();
        for image in self.posts.images_for(&ids).await? {
            images.entry(image.post_id).or_default().push(image.url);
        }

        Ok(page.map(|post| PostView {
            id: post.id,
            user_id: post.user_id,
            author: authors.get(&post.user_id).cloned(),
            content: render(&post.content),
            images: images.remove(&post.id).unwrap_or_default(),
            created_at: post.created_at,
            likes: like_counts.get(&post.id).copied().unwrap_or(0),
            comments: comment_counts.get(&post.id).copied().unwrap_or(0),
            is_liked: liked.contains(&post.id),
        }))
    }

    /// Skipped entirely for anonymous viewers.
    async fn liked_set(
        &self,
        viewer: Option<i64>,
        kind: LikeKind,
        ids: &[i64],
    ) -> DomainResult<HashSet<i64>> {
        match viewer {
            Some(user_id) => Ok(self.likes.liked_by(user_id, kind, ids).await?),
            None => Ok(HashSet::new()),
        }
    }
}
