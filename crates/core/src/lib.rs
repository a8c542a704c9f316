//! Core domain types and shared logic for splice.
//!
//! This crate defines the data model shared by the server and the client:
//! - Fingerprints and the sampled-window fingerprinter
//! - Chunk plans (fixed-size, indexed byte ranges)
//! - Merged artifact naming and classification
//! - JSON wire protocol types
//! - Configuration

pub mod artifact;
pub mod chunk;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod protocol;

pub use artifact::{ArtifactKind, ArtifactName};
pub use chunk::{ChunkPlan, ChunkSpan, chunk_count};
pub use error::{Error, Result};
pub use fingerprint::{Fingerprint, Fingerprinter, SampleWindow, sample_windows};
pub use hash::{DigestAlgorithm, SampleHasher};

/// Default chunk size: 1 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// Maximum chunk size: 64 MiB
pub const MAX_CHUNK_SIZE: u64 = 64 * 1024 * 1024;

/// Minimum chunk size: 64 KiB
pub const MIN_CHUNK_SIZE: u64 = 64 * 1024;

/// Default fingerprint sample window: 2 MiB
pub const DEFAULT_SAMPLE_WINDOW: u64 = 2 * 1024 * 1024;
