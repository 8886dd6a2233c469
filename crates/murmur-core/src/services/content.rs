//! Content store: posts (with images) and comments, mutable by their authors only.

use std::sync::Arc;

use crate::domain::{Comment, NewComment, NewPost, Post, validation};
use crate::error::{DomainError, DomainResult};
use crate::ports::{CommentRepository, MediaError, MediaUploader, PostRepository};

use super::Repositories;

pub struct ContentService {
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    media: Arc<dyn MediaUploader>,
}

impl ContentService {
    pub fn new(repos: &Repositories, media: Arc<dyn MediaUploader>) -> Self {
        Self {
            posts: repos.posts.clone(),
            comments: repos.comments.clone(),
            media,
        }
    }

    /// Create a post with up to two images.
    ///
    /// Every image is decode-checked before anything is uploaded. Uploads happen
    /// before the post and image rows are inserted together; if the insert fails
    /// the uploaded objects are discarded.
    pub async fn create_post(
        &self,
        author_id: i64,
        content: &str,
        images: Vec<Vec<u8>>,
    ) -> DomainResult<Post> {
        validation::content(content, validation::POST_MAX_CHARS)?;
        if images.len() > validation::MAX_POST_IMAGES {
            return Err(DomainError::validation(format!(
                "A post can have at most {} images",
                validation::MAX_POST_IMAGES
            )));
        }

        let mut checked = Vec::with_capacity(images.len());
        for (idx, bytes) in images.into_iter().enumerate() {
            let image = self.media.inspect(bytes).await.map_err(|e| match e {
                MediaError::Upload(msg) => DomainError::Internal(msg),
                other => DomainError::validation(format!("image {}: {}", idx + 1, other)),
            })?;
            checked.push(image);
        }

        let mut urls = Vec::with_capacity(checked.len());
        for image in checked {
            match self.media.upload(image).await {
                Ok(url) => urls.push(url),
                Err(e) => {
                    self.discard_all(&urls).await;
                    return Err(DomainError::Internal(e.to_string()));
                }
            }
        }

        let new_post = NewPost {
            user_id: author_id,
            content: content.to_string(),
        };
        match self.posts.create(new_post, urls.clone()).await {
            Ok(post) => {
                tracing::info!(post_id = post.id, author_id, images = urls.len(), "Post created");
                Ok(post)
            }
            Err(e) => {
                self.discard_all(&urls).await;
                Err(e.into())
            }
        }
    }

    pub async fn update_post(&self, actor_id: i64, post_id: i64, content: &str) -> DomainResult<Post> {
        let post = self.owned_post(actor_id, post_id).await?;
        validation::content(content, validation::POST_MAX_CHARS)?;
        Ok(self
            .posts
            .update_content(post.id, content.to_string())
            .await?)
    }

    /// Deleting a post removes its comments, images and likes with it.
    pub async fn delete_post(&self, actor_id: i64, post_id: i64) -> DomainResult<()> {
        let post = self.owned_post(actor_id, post_id).await?;
        self.posts.delete(post.id).await?;
        tracing::info!(post_id, actor_id, "Post deleted");
        Ok(())
    }

    pub async fn create_comment(
        &self,
        author_id: i64,
        post_id: i64,
        content: &str,
    ) -> DomainResult<Comment> {
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::not_found("Post", post_id));
        }
        validation::content(content, validation::COMMENT_MAX_CHARS)?;

        Ok(self
            .comments
            .create(NewComment {
                user_id: author_id,
                post_id,
                content: content.to_string(),
            })
            .await?)
    }

    pub async fn update_comment(
        &self,
        actor_id: i64,
        comment_id: i64,
        content: &str,
    ) -> DomainResult<Comment> {
        let comment = self.owned_comment(actor_id, comment_id).await?;
        validation::content(content, validation::COMMENT_MAX_CHARS)?;
        Ok(self
            .comments
            .update_content(comment.id, content.to_string())
            .await?)
    }

    pub async fn delete_comment(&self, actor_id: i64, comment_id: i64) -> DomainResult<()> {
        let comment = self.owned_comment(actor_id, comment_id).await?;
        self.comments.delete(comment.id).await?;
        Ok(())
    }

    async fn owned_post(&self, actor_id: i64, post_id: i64) -> DomainResult<Post> {
        let post = self
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or(DomainError::not_found("Post", post_id))?;
        if post.user_id != actor_id {
            return Err(DomainError::Forbidden);
        }
        Ok(post)
    }

    async fn owned_comment(&self, actor_id: i64, comment_id: i64) -> DomainResult<Comment> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .ok_or(DomainError::not_found("Comment", comment_id))?;
        if comment.user_id != actor_id {
            return Err(DomainError::Forbidden);
        }
        Ok(comment)
    }

    async fn discard_all(&self, urls: &[String]) {
        for url in urls {
            if let Err(e) = self.media.discard(url).await {
                tracing::warn!(%url, error = %e, "Failed to discard uploaded image");
            }
        }
    }
}
