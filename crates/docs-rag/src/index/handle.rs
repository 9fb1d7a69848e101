//! Swappable shared reference to the live index

use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::VectorIndex;
use crate::error::{Error, Result};

/// Shared pointer to the current [`VectorIndex`]
///
/// Readers clone the inner `Arc` and keep using that snapshot; a swap only
/// affects queries started afterwards.
pub struct IndexHandle {
    current: RwLock<Arc<VectorIndex>>,
    location: Option<PathBuf>,
}

impl IndexHandle {
    /// Wrap an in-memory index
    pub fn new(index: VectorIndex) -> Self {
        Self {
            current: RwLock::new(Arc::new(index)),
            location: None,
        }
    }

    /// Load the index persisted at `location`
    pub async fn open(location: &Path) -> Result<Self> {
        let index = load_blocking(location.to_path_buf()).await?;
        Ok(Self {
            current: RwLock::new(Arc::new(index)),
            location: Some(location.to_path_buf()),
        })
    }

    /// Snapshot of the current index
    pub fn current(&self) -> Arc<VectorIndex> {
        self.current.read().clone()
    }

    /// Replace the current index, returning the previous one
    pub fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        std::mem::replace(&mut *self.current.write(), Arc::new(index))
    }

    /// Where the index was loaded from
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Reload from disk and swap in, provided the new index was built by the
    /// same embedding function as the current one
    pub async fn reload(&self) -> Result<Arc<VectorIndex>> {
        let location = self
            .location
            .clone()
            .ok_or_else(|| Error::config("Index handle has no storage location"))?;

        let fresh = load_blocking(location).await?;
        let current = self.current();
        fresh.ensure_compatible(&current.info().embedding_model, current.dimensions())?;

        tracing::info!("Reloaded index with {} entries", fresh.len());
        Ok(self.swap(fresh))
    }
}

async fn load_blocking(location: PathBuf) -> Result<VectorIndex> {
    tokio::task::spawn_blocking(move || VectorIndex::load(&location))
        .await
        .map_err(|e| Error::internal(format!("Index load task failed: {}", e)))?
}
