pub mod memory;
pub mod records;
pub mod slots;

use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;

pub use memory::MemoryProjectStore;
pub use records::{ProjectMetadata, ProjectRecord, ProjectStore, SqliteProjectStore};
pub use slots::{validate_repo_name, RepoStore, SlotGuard};

/// Build the record store for the configured backend.
///
/// The directory backend has no records, only slots, so it yields `None`.
pub fn open_project_store(config: &StorageConfig) -> Result<Option<Arc<dyn ProjectStore>>> {
    let store: Option<Arc<dyn ProjectStore>> = match config.backend {
        StorageBackend::Sqlite => Some(Arc::new(SqliteProjectStore::open(&config.database_path)?)),
        StorageBackend::Memory => Some(Arc::new(MemoryProjectStore::new())),
        StorageBackend::Directory => None,
    };
    Ok(store)
}
