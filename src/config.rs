//! Configuration for enrichment deadlines and fetch limits.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TELEGRAPH_REFERENCE_TIMEOUT_MS, ...)
//! 2. Config file (.telegraph/config.yaml, or an explicit path)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .telegraph/config.yaml

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_REFERENCE_TIMEOUT: &str = "TELEGRAPH_REFERENCE_TIMEOUT_MS";
pub const ENV_IMAGE_TIMEOUT: &str = "TELEGRAPH_IMAGE_TIMEOUT_MS";
pub const ENV_VIDEO_TIMEOUT: &str = "TELEGRAPH_VIDEO_TIMEOUT_MS";
pub const ENV_MAX_CONCURRENT_FETCHES: &str = "TELEGRAPH_MAX_CONCURRENT_FETCHES";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicesConfig {
    pub reference: Option<ServiceConfig>,
    pub images: Option<ServiceConfig>,
    pub videos: Option<ServiceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub max_concurrent_fetches: Option<usize>,
}

/// Per-call deadlines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub reference: Duration,
    pub image: Duration,
    pub video: Duration,
}

impl Timeouts {
    pub fn from_millis(reference: u64, image: u64, video: u64) -> Self {
        Self {
            reference: Duration::from_millis(reference),
            image: Duration::from_millis(image),
            video: Duration::from_millis(video),
        }
    }
}

/// Resolved, validated settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnricherSettings {
    pub reference_timeout_ms: u64,
    pub image_timeout_ms: u64,
    pub video_timeout_ms: u64,
    /// Bound on concurrent outbound asset fetches (unbounded if unset)
    pub max_concurrent_fetches: Option<usize>,
    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl Default for EnricherSettings {
    fn default() -> Self {
        Self {
            reference_timeout_ms: 1000,
            image_timeout_ms: 1000,
            video_timeout_ms: 1000,
            max_concurrent_fetches: None,
            config_file: None,
        }
    }
}

impl EnricherSettings {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts::from_millis(
            self.reference_timeout_ms,
            self.image_timeout_ms,
            self.video_timeout_ms,
        )
    }

    /// Reject zero timeouts and a zero fetch bound
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("reference", self.reference_timeout_ms),
            ("images", self.image_timeout_ms),
            ("videos", self.video_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::NonPositiveTimeout {
                    service: name.to_string(),
                });
            }
        }

        if self.max_concurrent_fetches == Some(0) {
            return Err(ConfigError::ZeroFetchLimit);
        }

        Ok(())
    }
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Timeout for '{service}' must be a positive number of milliseconds")]
    NonPositiveTimeout { service: String },

    #[error("max_concurrent_fetches must be at least 1")]
    ZeroFetchLimit,

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".telegraph").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Overlay file values on top of the defaults
fn apply_file(settings: &mut EnricherSettings, file: &ConfigFile) {
    let timeout = |service: &Option<ServiceConfig>| service.as_ref().and_then(|s| s.timeout_ms);

    if let Some(ms) = timeout(&file.services.reference) {
        settings.reference_timeout_ms = ms;
    }
    if let Some(ms) = timeout(&file.services.images) {
        settings.image_timeout_ms = ms;
    }
    if let Some(ms) = timeout(&file.services.videos) {
        settings.video_timeout_ms = ms;
    }
    if let Some(max) = file.cache.as_ref().and_then(|c| c.max_concurrent_fetches) {
        settings.max_concurrent_fetches = Some(max);
    }
}

/// Overlay environment values; `lookup` stands in for `std::env::var`
fn apply_env<F>(settings: &mut EnricherSettings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let parse = |var: &str| -> Result<Option<u64>, ConfigError> {
        match lookup(var) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|_| ConfigError::InvalidEnv {
                    var: var.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    };

    if let Some(ms) = parse(ENV_REFERENCE_TIMEOUT)? {
        settings.reference_timeout_ms = ms;
    }
    if let Some(ms) = parse(ENV_IMAGE_TIMEOUT)? {
        settings.image_timeout_ms = ms;
    }
    if let Some(ms) = parse(ENV_VIDEO_TIMEOUT)? {
        settings.video_timeout_ms = ms;
    }
    if let Some(max) = parse(ENV_MAX_CONCURRENT_FETCHES)? {
        settings.max_concurrent_fetches = Some(max as usize);
    }

    Ok(())
}

/// Load settings from all sources
///
/// `explicit` overrides config file discovery.
pub fn load_settings(explicit: Option<&Path>) -> Result<EnricherSettings> {
    let config_file = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    let mut settings = EnricherSettings::default();

    if let Some(ref path) = config_file {
        let file = load_config_file(path)?;
        apply_file(&mut settings, &file);
    }

    apply_env(&mut settings, |var| std::env::var(var).ok())?;
    settings.validate()?;
    settings.config_file = config_file;

    Ok(settings)
}
