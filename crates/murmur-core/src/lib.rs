//! # Murmur Core
//!
//! The domain layer of the Murmur social backend.
//! This crate contains pure business logic with zero infrastructure dependencies:
//! entities, input rules, the ports adapters implement, and the services built on them.

pub mod domain;
pub mod error;
pub mod ports;
pub mod services;

pub use error::{DomainError, DomainResult, RepoError};
