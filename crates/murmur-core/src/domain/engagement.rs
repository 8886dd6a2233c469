//! Likes on posts and comments.

use serde::{Deserialize, Serialize};

/// The kind of content a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeKind {
    Post,
    Comment,
}

impl LikeKind {
    pub fn entity_name(self) -> &'static str {
        match self {
            LikeKind::Post => "Post",
            LikeKind::Comment => "Comment",
        }
    }
}

/// A concrete like target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LikeTarget {
    pub kind: LikeKind,
    pub id: i64,
}

impl LikeTarget {
    pub fn post(id: i64) -> Self {
        Self {
            kind: LikeKind::Post,
            id,
        }
    }

    pub fn comment(id: i64) -> Self {
        Self {
            kind: LikeKind::Comment,
            id,
        }
    }
}
