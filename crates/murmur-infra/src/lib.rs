//! # Murmur Infrastructure
//!
//! Concrete implementations of the ports defined in `murmur-core`.
//! This crate contains database, credential, and media storage integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL database support via SeaORM
//! - `auth` - JWT + Argon2 authentication
//! - `remote-media` - Image uploads to an HTTP object store via reqwest

pub mod database;
pub mod media;

#[cfg(feature = "auth")]
pub mod auth;

// Re-exports - In-Memory
pub use database::{DatabaseConfig, InMemoryStore};
pub use media::{InMemoryMediaUploader, LocalMediaUploader, check_image, inspect_image};

#[cfg(feature = "postgres")]
pub use database::DatabaseConnections;

#[cfg(feature = "auth")]
pub use auth::{Argon2PasswordService, JwtConfig, JwtTokenService};

#[cfg(feature = "remote-media")]
pub use media::{HttpMediaConfig, HttpMediaUploader};
