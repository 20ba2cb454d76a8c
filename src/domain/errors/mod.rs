// Domain errors - Error types for the domain layer

use std::fmt;

/// Domain-specific error types
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Invalid arguments provided
    BadArgs(String),
    /// Total length or content type of the stream could not be determined
    MetadataUnavailable(String),
    /// A range request failed during priming or streaming
    ChunkFetchFailed {
        status: Option<u16>,
        message: String,
    },
    /// The incremental media buffer could not be created or rejected appended bytes
    BufferAppendFailed(String),
    /// The whole-resource fallback fetch failed
    WholeFileFetchFailed {
        status: Option<u16>,
        message: String,
    },
    /// Session superseded or torn down
    Cancelled,
    /// Backend answered with a non-success status
    BackendRejected { status: u16, message: String },
    /// Network-level failure talking to the backend
    TransportFailed(String),
    /// Backend answered with a body we could not interpret
    InvalidResponse(String),
    /// Operation not allowed in the current state
    InvalidState(String),
    /// Local blob or buffer storage failed
    StorageFailed(String),
}

impl DomainError {
    /// Cancellation is never surfaced and never retried.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DomainError::Cancelled)
    }

    /// Errors that end the incremental attempt and hand over to the whole-file strategy.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            DomainError::MetadataUnavailable(_)
                | DomainError::ChunkFetchFailed { .. }
                | DomainError::BufferAppendFailed(_)
        )
    }

    /// HTTP status attached to the failure, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DomainError::ChunkFetchFailed { status, .. }
            | DomainError::WholeFileFetchFailed { status, .. } => *status,
            DomainError::BackendRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn write_status(f: &mut fmt::Formatter<'_>, status: &Option<u16>, message: &str) -> fmt::Result {
    match status {
        Some(code) => write!(f, "HTTP {}: {}", code, message),
        None => write!(f, "{}", message),
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::BadArgs(msg) => write!(f, "Bad arguments: {}", msg),
            DomainError::MetadataUnavailable(msg) => write!(f, "Stream metadata unavailable: {}", msg),
            DomainError::ChunkFetchFailed { status, message } => {
                write!(f, "Chunk fetch failed: ")?;
                write_status(f, status, message)
            }
            DomainError::BufferAppendFailed(msg) => write!(f, "Media buffer rejected data: {}", msg),
            DomainError::WholeFileFetchFailed { status, message } => {
                write!(f, "Video download failed: ")?;
                write_status(f, status, message)
            }
            DomainError::Cancelled => write!(f, "Cancelled"),
            DomainError::BackendRejected { status, message } => {
                write!(f, "Backend error ({}): {}", status, message)
            }
            DomainError::TransportFailed(msg) => write!(f, "Transport error: {}", msg),
            DomainError::InvalidResponse(msg) => write!(f, "Unexpected response format from server: {}", msg),
            DomainError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            DomainError::StorageFailed(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
