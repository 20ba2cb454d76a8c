// Adapters - External system implementations

pub mod blob_temp;
pub mod http_backend;
pub mod http_range;
pub mod media_file;
pub mod memory;
pub mod toml_config;

// Re-export adapters
pub use blob_temp::TempBlobStoreAdapter;
pub use http_backend::HttpBackendClient;
pub use http_range::{HttpRangeClient, TunnelBypass};
pub use media_file::FileMediaBufferAdapter;
pub use memory::{MemoryBlobStoreAdapter, MemoryMediaBufferAdapter};
pub use toml_config::{Settings, TomlConfigAdapter};
