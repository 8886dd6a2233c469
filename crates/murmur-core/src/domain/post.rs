use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity - a piece of authored content, optionally with images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to insert a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub content: String,
}

/// An image attached to a post, stored remotely and referenced by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostImage {
    pub id: i64,
    pub post_id: i64,
    pub url: String,
}
