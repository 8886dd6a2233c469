//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod media;
mod repository;

pub use auth::{AuthError, PasswordService, TokenClaims, TokenKind, TokenService};
pub use media::{CheckedImage, ImageInfo, MediaError, MediaUploader};
pub use repository::{
    BaseRepository, CommentRepository, FollowRepository, LikeRepository, PostRepository,
    UserRepository,
};
