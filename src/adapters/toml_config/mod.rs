// TOML config adapter - Settings loaded from TOML files

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::http_range::TunnelBypass;
use crate::domain::rules::{ChunkPolicy, RetryPolicy, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_PRIMING_CHUNKS};
use crate::error::{CutStreamError, CutStreamResult};
use crate::utils::logging::LoggingConfig;

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Config files tried when none is given explicitly
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["cutstream.toml", "config/cutstream.toml"];

/// Backend connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub base_url: String,
    /// Connect timeout in seconds; no timeout when absent
    pub connect_timeout_secs: Option<u64>,
    pub tunnel_bypass: TunnelBypass,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            connect_timeout_secs: Some(10),
            tunnel_bypass: TunnelBypass::Auto,
        }
    }
}

/// Incremental streaming settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    pub chunk_size: u64,
    pub priming_chunks: u32,
    /// Directory for media buffer files; system temp dir when absent
    pub buffer_dir: Option<PathBuf>,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            priming_chunks: DEFAULT_PRIMING_CHUNKS,
            buffer_dir: None,
        }
    }
}

/// Whole-file fallback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub max_retries: u32,
    /// Directory for blob files; system temp dir when absent
    pub blob_dir: Option<PathBuf>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            blob_dir: None,
        }
    }
}

/// All runtime settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: BackendSettings,
    pub streaming: StreamingSettings,
    pub playback: PlaybackSettings,
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn chunk_policy(&self) -> CutStreamResult<ChunkPolicy> {
        Ok(ChunkPolicy::new(
            self.streaming.chunk_size,
            self.streaming.priming_chunks,
        )?)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.playback.max_retries)
    }

    pub fn validate(&self) -> CutStreamResult<()> {
        self.chunk_policy()?;
        let url = url::Url::parse(&self.backend.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CutStreamError::config(format!(
                "Backend URL must use http or https: {}",
                self.backend.base_url
            )));
        }
        Ok(())
    }
}

/// Reads and writes `Settings` as TOML
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    pub fn parse(content: &str, origin: &str) -> CutStreamResult<Settings> {
        toml::from_str(content).map_err(|source| CutStreamError::ConfigParse {
            path: origin.to_string(),
            source,
        })
    }

    pub fn load(path: &Path) -> CutStreamResult<Settings> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::parse(&content, &path.display().to_string())?;
        info!("Loaded configuration from: {}", path.display());
        Ok(settings)
    }

    /// First existing default config file, if any
    pub fn find_default() -> Option<PathBuf> {
        DEFAULT_CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|p| p.is_file())
    }

    pub fn save(path: &Path, settings: &Settings) -> CutStreamResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(settings)
            .map_err(|e| CutStreamError::config(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content)?;
        debug!("Saved configuration to: {}", path.display());
        Ok(())
    }
}
