// In-memory adapters - media buffer and blob store kept in process memory
//
// Both record what happens to them so callers can check ordering and
// resource release after a session has run.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Shared record of every buffer a `MemoryMediaBufferAdapter` has opened
#[derive(Debug, Default)]
pub struct BufferInstrument {
    opened: AtomicUsize,
    released: AtomicUsize,
    appends: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    ended: AtomicBool,
    data: Mutex<BytesMut>,
}

impl BufferInstrument {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Buffers dropped so far
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// Successful appends across all buffers
    pub fn appends(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    /// Highest number of appends observed pending at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Bytes appended to the most recently opened buffer
    pub fn data(&self) -> Bytes {
        self.data.lock().clone().freeze()
    }
}

/// Media buffer factory keeping appended bytes in memory
#[derive(Default)]
pub struct MemoryMediaBufferAdapter {
    instrument: Arc<BufferInstrument>,
    fail_append_at: Option<usize>,
    rejected_types: Vec<String>,
}

impl MemoryMediaBufferAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th append (1-based) of a buffer fail
    pub fn fail_append_at(mut self, chunk: usize) -> Self {
        self.fail_append_at = Some(chunk);
        self
    }

    /// Refuse to open buffers of this content type
    pub fn reject_type(mut self, content_type: &str) -> Self {
        self.rejected_types.push(content_type.to_ascii_lowercase());
        self
    }

    pub fn instrument(&self) -> Arc<BufferInstrument> {
        Arc::clone(&self.instrument)
    }
}

#[async_trait]
impl MediaBufferPort for MemoryMediaBufferAdapter {
    fn is_type_supported(&self, content_type: &str) -> bool {
        let lowered = content_type.to_ascii_lowercase();
        !self.rejected_types.iter().any(|t| lowered.starts_with(t))
    }

    async fn open(&self, session: &StreamSession) -> Result<Box<dyn MediaBuffer>, DomainError> {
        if !self.is_type_supported(session.content_type()) {
            return Err(DomainError::BufferAppendFailed(format!(
                "Unsupported media type: {}",
                session.content_type()
            )));
        }
        self.instrument.opened.fetch_add(1, Ordering::SeqCst);
        self.instrument.ended.store(false, Ordering::SeqCst);
        self.instrument.data.lock().clear();

        Ok(Box::new(MemoryMediaBuffer {
            instrument: Arc::clone(&self.instrument),
            locator: format!("memory://session/{}", session.id().0),
            content_type: session.content_type().to_string(),
            appended: 0,
            fail_append_at: self.fail_append_at,
        }))
    }
}

pub struct MemoryMediaBuffer {
    instrument: Arc<BufferInstrument>,
    locator: String,
    content_type: String,
    appended: usize,
    fail_append_at: Option<usize>,
}

#[async_trait]
impl MediaBuffer for MemoryMediaBuffer {
    async fn append(&mut self, chunk: Bytes) -> Result<(), DomainError> {
        let pending = self.instrument.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.instrument
            .max_in_flight
            .fetch_max(pending, Ordering::SeqCst);

        // let other tasks run while the append is pending
        tokio::task::yield_now().await;

        let attempt = self.appended + 1;
        let result = if self.fail_append_at == Some(attempt) {
            Err(DomainError::BufferAppendFailed(format!(
                "Buffer rejected chunk {}",
                attempt
            )))
        } else {
            self.instrument.data.lock().extend_from_slice(&chunk);
            self.instrument.appends.fetch_add(1, Ordering::SeqCst);
            self.appended = attempt;
            Ok(())
        };

        self.instrument.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn end_of_stream(&mut self) -> Result<(), DomainError> {
        self.instrument.ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn locator(&self) -> &str {
        &self.locator
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn export(&self, dest: &Path) -> Result<u64, DomainError> {
        let data = self.instrument.data();
        tokio::fs::write(dest, &data)
            .await
            .map_err(|e| DomainError::StorageFailed(e.to_string()))?;
        Ok(data.len() as u64)
    }
}

impl Drop for MemoryMediaBuffer {
    fn drop(&mut self) {
        self.instrument.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Blob store keeping bodies in a map
#[derive(Default)]
pub struct MemoryBlobStoreAdapter {
    next_id: AtomicU64,
    created: AtomicUsize,
    blobs: Mutex<HashMap<u64, Bytes>>,
    revoked: Mutex<Vec<u64>>,
}

impl MemoryBlobStoreAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Ids revoked so far, in order
    pub fn revoked(&self) -> Vec<u64> {
        self.revoked.lock().clone()
    }

    pub fn body(&self, handle: &BlobHandle) -> Option<Bytes> {
        self.blobs.lock().get(&handle.id).cloned()
    }
}

#[async_trait]
impl BlobStorePort for MemoryBlobStoreAdapter {
    async fn create(&self, body: Bytes, content_type: &str) -> Result<BlobHandle, DomainError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.created.fetch_add(1, Ordering::SeqCst);
        let handle = BlobHandle {
            id,
            locator: format!("blob:memory/{}", id),
            content_type: content_type.to_string(),
            size: body.len() as u64,
        };
        self.blobs.lock().insert(id, body);
        Ok(handle)
    }

    async fn revoke(&self, handle: &BlobHandle) -> Result<(), DomainError> {
        if self.blobs.lock().remove(&handle.id).is_some() {
            self.revoked.lock().push(handle.id);
        }
        Ok(())
    }

    async fn export(&self, handle: &BlobHandle, dest: &Path) -> Result<u64, DomainError> {
        let body = self.body(handle).ok_or_else(|| {
            DomainError::InvalidState(format!("Blob {} has been revoked", handle.locator))
        })?;
        tokio::fs::write(dest, &body)
            .await
            .map_err(|e| DomainError::StorageFailed(e.to_string()))?;
        Ok(body.len() as u64)
    }

    fn live_count(&self) -> usize {
        self.blobs.lock().len()
    }
}
