//! CutStream Library
//!
//! Client for a remote video cutting backend. Videos are previewed by feeding
//! byte ranges into an incremental media buffer, falling back to a single
//! whole-file download when incremental playback fails.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{
    ByteRange, ChunkPlan, CutRange, FeederState, PlaybackSource, SessionId, Strategy,
    StreamSession, TimeSpec, VideoId,
};
pub use error::{CutStreamError, CutStreamResult};
