//! Services - the operations exposed to the HTTP layer, written against ports only.

use std::sync::Arc;

use crate::ports::{
    CommentRepository, FollowRepository, LikeRepository, PostRepository, UserRepository,
};

mod auth;
mod content;
mod engagement;
mod feed;
mod graph;
mod profile;

pub use auth::{AuthService, IssuedToken, Registration, SessionTokens};
pub use content::ContentService;
pub use engagement::EngagementService;
pub use feed::FeedService;
pub use graph::GraphService;
pub use profile::{ProfileService, PublicProfile};

/// Every storage port the services need, bundled for construction.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub likes: Arc<dyn LikeRepository>,
    pub follows: Arc<dyn FollowRepository>,
}
