//! Read models assembled by the feed aggregator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::UserSummary;

pub const DEFAULT_EXCERPT_LENGTH: usize = 100;
pub const CONTINUATION_MARKER: &str = "...";

/// Cuts `content` to `max_chars` characters and appends the continuation
/// marker when anything was dropped. Counts chars, not bytes.
pub fn excerpt(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => {
            let mut out = String::with_capacity(cut + CONTINUATION_MARKER.len());
            out.push_str(&content[..cut]);
            out.push_str(CONTINUATION_MARKER);
            out
        }
        None => content.to_string(),
    }
}

/// A post as shown in listings and detail views.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i64,
    pub user_id: i64,
    pub author: Option<UserSummary>,
    pub content: String,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub comments: u64,
    pub is_liked: bool,
}

/// A comment as shown under a post.
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub author: Option<UserSummary>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub is_liked: bool,
}
