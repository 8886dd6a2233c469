//! # Murmur Shared
//!
//! Wire types shared by the API server and its clients: request bodies,
//! response payloads, and the response envelope.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, Paginated, Status};
