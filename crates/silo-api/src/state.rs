//! Application state shared across handlers.

use silo_store::{BucketManager, StorageEngine};

/// Capabilities bound once at process start and cloned per handler.
#[derive(Clone)]
pub struct AppState {
    /// Upload/download/delete/list orchestration.
    pub engine: StorageEngine,
    /// Bucket lifecycle operations.
    pub buckets: BucketManager,
}
