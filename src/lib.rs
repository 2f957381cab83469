//! # apply-flow
//!
//! Bearer token caching for the apply-flow job tracking API.
//!
//! Modules:
//! - `cache`: single-token cache with proactive refresh, and its auto-refresh task
//! - `sources`: token-issuing endpoints (client credentials, session route)
//! - `parser`: mapping token endpoint responses onto issued tokens
//! - `api`: REST client for applications and resumes
//! - `server`: HTTP gateway serving cached tokens
//! - `config`: YAML service configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod helpers;
pub mod observability;
pub mod parser;
pub mod resilience;
pub mod server;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::token_cache::TokenCache;
pub use crate::config::sources::*;
pub use crate::error::{ApiError, AuthError};
