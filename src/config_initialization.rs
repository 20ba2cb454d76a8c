//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::http_range::TunnelBypass;
use crate::adapters::{Settings, TomlConfigAdapter};
use crate::cli::Cli;
use crate::error::{CutStreamError, CutStreamResult};

/// Environment variables and the setting each one overrides
pub const ENV_MAPPINGS: &[(&str, &str)] = &[
    ("CUTSTREAM_BACKEND_URL", "backend.base_url"),
    ("CUTSTREAM_LOG_LEVEL", "logging.level"),
    ("CUTSTREAM_LOG_FORMAT", "logging.format"),
    ("CUTSTREAM_CHUNK_SIZE", "streaming.chunk_size"),
    ("CUTSTREAM_PRIMING_CHUNKS", "streaming.priming_chunks"),
    ("CUTSTREAM_MAX_RETRIES", "playback.max_retries"),
    ("CUTSTREAM_TUNNEL_BYPASS", "backend.tunnel_bypass"),
];

/// Initialize configuration hierarchy following precedence: CLI > Env > File > Defaults
pub fn initialize_configuration_hierarchy(cli: &Cli) -> Result<Settings> {
    // Step 1: Defaults, or the config file
    let mut settings = load_config_file(cli)?;

    // Step 2: Override with environment variables
    let env_overrides = apply_environment(&mut settings, |key| std::env::var(key).ok())
        .context("Invalid environment override")?;

    // Step 3: Override with CLI arguments
    let cli_overrides = apply_cli_overrides(&mut settings, cli).context("Invalid argument")?;

    settings.validate().context("Invalid configuration")?;
    info!(env_overrides, cli_overrides, backend = %settings.backend.base_url, "Configuration initialized");
    Ok(settings)
}

/// Load the explicit config file, else the first default one, else defaults
fn load_config_file(cli: &Cli) -> Result<Settings> {
    if let Some(path) = &cli.config {
        return TomlConfigAdapter::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()));
    }
    match TomlConfigAdapter::find_default() {
        Some(path) => TomlConfigAdapter::load(&path)
            .with_context(|| format!("Failed to load config file {}", path.display())),
        None => Ok(Settings::default()),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CutStreamResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CutStreamError::config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}

/// Apply environment overrides. Returns how many were applied.
pub fn apply_environment(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> CutStreamResult<usize> {
    let mut applied = 0;
    for &(key, _) in ENV_MAPPINGS {
        let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        match key {
            "CUTSTREAM_BACKEND_URL" => settings.backend.base_url = value.trim().to_string(),
            "CUTSTREAM_LOG_LEVEL" => settings.logging.level = value.parse()?,
            "CUTSTREAM_LOG_FORMAT" => settings.logging.format = value.parse()?,
            "CUTSTREAM_CHUNK_SIZE" => settings.streaming.chunk_size = parse_number(key, &value)?,
            "CUTSTREAM_PRIMING_CHUNKS" => {
                settings.streaming.priming_chunks = parse_number(key, &value)?
            }
            "CUTSTREAM_MAX_RETRIES" => settings.playback.max_retries = parse_number(key, &value)?,
            "CUTSTREAM_TUNNEL_BYPASS" => settings.backend.tunnel_bypass = TunnelBypass::parse(&value)?,
            _ => continue,
        }
        info!("Found environment override: {}", key);
        applied += 1;
    }
    Ok(applied)
}

/// Apply CLI argument overrides. Returns how many were applied.
pub fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) -> CutStreamResult<usize> {
    let mut applied = 0;
    if let Some(url) = &cli.backend_url {
        settings.backend.base_url = url.trim().to_string();
        applied += 1;
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.parse()?;
        applied += 1;
    }
    if let Some(format) = &cli.log_format {
        settings.logging.format = format.parse()?;
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::{LogFormat, LogLevel};
    use clap::Parser;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_environment_overrides() {
        let mut settings = Settings::default();
        let applied = apply_environment(
            &mut settings,
            lookup(&[
                ("CUTSTREAM_BACKEND_URL", "https://api.example.com"),
                ("CUTSTREAM_CHUNK_SIZE", "1048576"),
                ("CUTSTREAM_MAX_RETRIES", "4"),
                ("CUTSTREAM_TUNNEL_BYPASS", "never"),
                ("CUTSTREAM_LOG_FORMAT", ""),
            ]),
        )
        .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(settings.backend.base_url, "https://api.example.com");
        assert_eq!(settings.streaming.chunk_size, 1_048_576);
        assert_eq!(settings.playback.max_retries, 4);
        assert_eq!(settings.backend.tunnel_bypass, TunnelBypass::Never);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_environment_value() {
        let mut settings = Settings::default();
        let result = apply_environment(&mut settings, lookup(&[("CUTSTREAM_PRIMING_CHUNKS", "three")]));
        assert!(matches!(result, Err(CutStreamError::Config { .. })));
    }

    #[test]
    fn test_cli_wins_over_environment() {
        let mut settings = Settings::default();
        apply_environment(
            &mut settings,
            lookup(&[
                ("CUTSTREAM_BACKEND_URL", "https://env.example.com"),
                ("CUTSTREAM_LOG_LEVEL", "warn"),
            ]),
        )
        .unwrap();

        let cli = Cli::parse_from([
            "cutstream",
            "--backend-url",
            "https://cli.example.com",
            "--log-level",
            "debug",
            "original",
            "--video",
            "abc",
        ]);
        assert_eq!(apply_cli_overrides(&mut settings, &cli).unwrap(), 2);
        assert_eq!(settings.backend.base_url, "https://cli.example.com");
        assert_eq!(settings.logging.level, LogLevel::Debug);
    }
}
