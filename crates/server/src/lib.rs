//! HTTP API server for splice resumable uploads.
//!
//! This crate provides the HTTP surface over the chunk store and merge engine:
//! - Chunk upload (multipart or raw body)
//! - Resume query
//! - Merge into a named artifact
//! - Artifact listing and streaming download

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
