// Temp blob adapter - whole-resource blobs stored as temp files

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Blob store writing each blob to its own temp file
pub struct TempBlobStoreAdapter {
    dir: PathBuf,
    next_id: AtomicU64,
    blobs: Mutex<HashMap<u64, TempPath>>,
}

impl TempBlobStoreAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_id: AtomicU64::new(1),
            blobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }

    /// On-disk location of a live blob
    pub fn path_of(&self, handle: &BlobHandle) -> Option<PathBuf> {
        self.blobs.lock().get(&handle.id).map(|p| p.to_path_buf())
    }
}

#[async_trait]
impl BlobStorePort for TempBlobStoreAdapter {
    async fn create(&self, body: Bytes, content_type: &str) -> Result<BlobHandle, DomainError> {
        let named = tempfile::Builder::new()
            .prefix("cutstream-blob-")
            .tempfile_in(&self.dir)
            .map_err(|e| DomainError::StorageFailed(format!("Failed to create blob: {}", e)))?;
        let (file, path) = named.into_parts();

        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&body)
            .await
            .map_err(|e| DomainError::StorageFailed(format!("Failed to write blob: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| DomainError::StorageFailed(format!("Failed to write blob: {}", e)))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = BlobHandle {
            id,
            locator: format!("blob:cutstream/{}", id),
            content_type: content_type.to_string(),
            size: body.len() as u64,
        };
        debug!(blob = id, size = handle.size, path = %path.display(), "Created blob");
        self.blobs.lock().insert(id, path);
        Ok(handle)
    }

    async fn revoke(&self, handle: &BlobHandle) -> Result<(), DomainError> {
        let removed = self.blobs.lock().remove(&handle.id);
        if let Some(path) = removed {
            if let Err(e) = path.close() {
                warn!(blob = handle.id, error = %e, "Failed to delete blob file");
                return Err(DomainError::StorageFailed(e.to_string()));
            }
            debug!(blob = handle.id, "Revoked blob");
        }
        Ok(())
    }

    async fn export(&self, handle: &BlobHandle, dest: &Path) -> Result<u64, DomainError> {
        let source = self.path_of(handle).ok_or_else(|| {
            DomainError::InvalidState(format!("Blob {} has been revoked", handle.locator))
        })?;
        tokio::fs::copy(&source, dest)
            .await
            .map_err(|e| DomainError::StorageFailed(format!("Failed to export blob: {}", e)))
    }

    fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }
}
