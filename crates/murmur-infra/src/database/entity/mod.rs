//! SeaORM entities, one module per table.

pub mod comment;
pub mod comment_like;
pub mod follow;
pub mod post;
pub mod post_image;
pub mod post_like;
pub mod user;
