//! Domain entities - the core business objects.

mod comment;
mod engagement;
mod feed;
mod follow;
mod page;
mod post;
mod user;

pub mod validation;

pub use comment::{Comment, NewComment};
pub use engagement::{LikeKind, LikeTarget};
pub use feed::{CONTINUATION_MARKER, CommentView, DEFAULT_EXCERPT_LENGTH, PostView, excerpt};
pub use follow::FollowStats;
pub use page::{DEFAULT_PER_PAGE, MAX_PER_PAGE, Page, PageRequest};
pub use post::{NewPost, Post, PostImage};
pub use user::{NewUser, ProfileChanges, User, UserSummary};
