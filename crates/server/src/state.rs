//! Application state shared across handlers.

use splice_core::config::AppConfig;
use splice_storage::{ChunkStore, MergeEngine, NamespaceLocks, ObjectStore};
use std::sync::Arc;

/// Shared application state.
///
/// The chunk store and merge engine share one lock table so that a merge
/// excludes chunk writes to the same fingerprint.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub chunks: ChunkStore,
    pub merger: MergeEngine,
}

impl AppState {
    /// Create a new application state over an injected storage root.
    pub fn new(config: AppConfig, storage: Arc<dyn ObjectStore>) -> Self {
        let locks = NamespaceLocks::new();
        Self {
            config: Arc::new(config),
            chunks: ChunkStore::new(storage.clone(), locks.clone()),
            merger: MergeEngine::new(storage.clone(), locks),
            storage,
        }
    }

    /// Largest accepted chunk body in bytes.
    pub fn max_chunk_size(&self) -> usize {
        usize::try_from(self.config.server.max_chunk_size).unwrap_or(usize::MAX)
    }
}
