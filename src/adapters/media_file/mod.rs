// Media file adapter - incremental media buffer backed by a temp file

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace};
use url::Url;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Container types the file buffer accepts
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/x-matroska",
    "video/quicktime",
    "audio/mp4",
    "audio/mpeg",
    "audio/webm",
];

/// Strip codec parameters (`video/mp4; codecs="avc1"` -> `video/mp4`)
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase()
}

fn extension_for(content_type: &str) -> &'static str {
    match essence(content_type).as_str() {
        "video/webm" | "audio/webm" => ".webm",
        "video/x-matroska" => ".mkv",
        "video/quicktime" => ".mov",
        "audio/mpeg" => ".mp3",
        "audio/mp4" => ".m4a",
        _ => ".mp4",
    }
}

/// Creates file-backed media buffers in a directory
pub struct FileMediaBufferAdapter {
    dir: PathBuf,
}

impl FileMediaBufferAdapter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Buffers in the system temp directory
    pub fn in_temp_dir() -> Self {
        Self::new(std::env::temp_dir())
    }
}

#[async_trait]
impl MediaBufferPort for FileMediaBufferAdapter {
    fn is_type_supported(&self, content_type: &str) -> bool {
        let essence = essence(content_type);
        SUPPORTED_MEDIA_TYPES.contains(&essence.as_str())
    }

    async fn open(&self, session: &StreamSession) -> Result<Box<dyn MediaBuffer>, DomainError> {
        let content_type = session.content_type().to_string();
        if !self.is_type_supported(&content_type) {
            return Err(DomainError::BufferAppendFailed(format!(
                "Unsupported media type: {}",
                content_type
            )));
        }

        let named = tempfile::Builder::new()
            .prefix(&format!("cutstream-{}-", session.video_id()))
            .suffix(extension_for(&content_type))
            .tempfile_in(&self.dir)
            .map_err(|e| {
                DomainError::BufferAppendFailed(format!("Failed to create media buffer: {}", e))
            })?;
        let (file, path) = named.into_parts();
        let locator = Url::from_file_path(&path)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| path.display().to_string());

        debug!(session = %session.id(), path = %path.display(), %content_type, "Opened file media buffer");
        Ok(Box::new(FileMediaBuffer {
            file: File::from_std(file),
            path,
            locator,
            content_type,
            written: 0,
            ended: false,
        }))
    }
}

/// Media buffer writing appended chunks to a temp file, deleted on drop
pub struct FileMediaBuffer {
    file: File,
    path: TempPath,
    locator: String,
    content_type: String,
    written: u64,
    ended: bool,
}

impl FileMediaBuffer {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

#[async_trait]
impl MediaBuffer for FileMediaBuffer {
    async fn append(&mut self, chunk: Bytes) -> Result<(), DomainError> {
        if self.ended {
            return Err(DomainError::BufferAppendFailed(
                "Append after end of stream".to_string(),
            ));
        }
        self.file
            .write_all(&chunk)
            .await
            .map_err(|e| DomainError::BufferAppendFailed(e.to_string()))?;
        self.file
            .flush()
            .await
            .map_err(|e| DomainError::BufferAppendFailed(e.to_string()))?;
        self.written += chunk.len() as u64;
        trace!(bytes = chunk.len(), total = self.written, "Appended chunk to file buffer");
        Ok(())
    }

    async fn end_of_stream(&mut self) -> Result<(), DomainError> {
        self.file
            .sync_data()
            .await
            .map_err(|e| DomainError::BufferAppendFailed(e.to_string()))?;
        self.ended = true;
        Ok(())
    }

    fn locator(&self) -> &str {
        &self.locator
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    async fn export(&self, dest: &Path) -> Result<u64, DomainError> {
        tokio::fs::copy(&self.path, dest)
            .await
            .map_err(|e| DomainError::StorageFailed(format!("Failed to export buffer: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(content_type: &str) -> StreamSession {
        let mut session = StreamSession::new(
            SessionId(1),
            VideoId::new("abc").unwrap(),
            Url::parse("http://localhost:3000/api/videos/stream/abc").unwrap(),
        );
        session
            .attach_metadata(
                ResourceMetadata {
                    content_type: Some(content_type.to_string()),
                    total_length: Some(8),
                },
                4,
                1,
            )
            .unwrap();
        session
    }

    #[test]
    fn test_supported_types_ignore_codec_parameters() {
        let adapter = FileMediaBufferAdapter::in_temp_dir();
        assert!(adapter.is_type_supported("video/mp4; codecs=\"avc1.42E01E\""));
        assert!(adapter.is_type_supported("VIDEO/WEBM"));
        assert!(!adapter.is_type_supported("application/octet-stream"));
    }

    #[tokio::test]
    async fn test_file_buffer_appends_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = FileMediaBufferAdapter::new(dir.path());
        let mut buffer = adapter.open(&session("video/mp4")).await.unwrap();

        buffer.append(Bytes::from_static(b"abcd")).await.unwrap();
        buffer.append(Bytes::from_static(b"efgh")).await.unwrap();
        buffer.end_of_stream().await.unwrap();
        assert!(buffer.append(Bytes::from_static(b"x")).await.is_err());

        let dest = dir.path().join("out.mp4");
        assert_eq!(buffer.export(&dest).await.unwrap(), 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abcdefgh");

        drop(buffer);
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .map(|e| e.file_name().to_string_lossy().starts_with("cutstream-"))
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_unsupported_type_fails_to_open() {
        let adapter = FileMediaBufferAdapter::in_temp_dir();
        let err = adapter.open(&session("text/html")).await.err().unwrap();
        assert!(matches!(err, DomainError::BufferAppendFailed(_)));
    }
}
