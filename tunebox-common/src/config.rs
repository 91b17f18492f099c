//! Bootstrap configuration loading
//!
//! Every setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`TUNEBOX_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: the service starts with defaults
//! and logs a warning. Only the media-server URL and token have no default.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const ENV_PLEX_BASE_URL: &str = "TUNEBOX_PLEX_BASE_URL";
pub const ENV_PLEX_TOKEN: &str = "TUNEBOX_PLEX_TOKEN";
pub const ENV_CLIENT_NAME: &str = "TUNEBOX_CLIENT_NAME";
pub const ENV_DATABASE_PATH: &str = "TUNEBOX_DATABASE_PATH";
pub const ENV_PORT: &str = "TUNEBOX_PORT";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_LIBRARY_SECTION: &str = "Music";
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 3;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 21_600;

/// Contents of `config.toml`; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub plex_base_url: Option<String>,
    pub plex_token: Option<String>,
    /// Preferred output device name
    pub client_name: Option<String>,
    pub library_section: Option<String>,
    pub accept_invalid_certs: Option<bool>,
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    pub update_interval_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub cache_ttl_secs: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full EnvFilter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub config_path: Option<PathBuf>,
    pub plex_base_url: Option<String>,
    pub plex_token: Option<String>,
    pub client_name: Option<String>,
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
}

/// Fully resolved service settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub plex_base_url: String,
    pub plex_token: String,
    pub client_name: Option<String>,
    pub library_section: String,
    pub accept_invalid_certs: bool,
    pub database_path: PathBuf,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub update_interval: Duration,
    pub poll_interval: Duration,
    pub cache_ttl: Duration,
    pub log_level: String,
}

impl Settings {
    /// Resolve settings from CLI, environment, the TOML file and defaults
    pub fn resolve(cli: CliOverrides) -> Result<Self> {
        let toml_config = match cli.config_path.clone().or_else(default_config_path) {
            Some(path) => load_toml(&path)?,
            None => {
                warn!("No config directory available, using defaults");
                TomlConfig::default()
            }
        };
        Self::from_sources(cli, toml_config)
    }

    /// Merge already-loaded sources (CLI > env > TOML > defaults)
    pub fn from_sources(cli: CliOverrides, toml_config: TomlConfig) -> Result<Self> {
        let plex_base_url = cli
            .plex_base_url
            .or_else(|| env_string(ENV_PLEX_BASE_URL))
            .or(toml_config.plex_base_url)
            .ok_or_else(|| {
                Error::Config(format!(
                    "plex_base_url is required (--plex-base-url, {} or config file)",
                    ENV_PLEX_BASE_URL
                ))
            })?;

        let plex_token = cli
            .plex_token
            .or_else(|| env_string(ENV_PLEX_TOKEN))
            .or(toml_config.plex_token)
            .ok_or_else(|| {
                Error::Config(format!(
                    "plex_token is required (--plex-token, {} or config file)",
                    ENV_PLEX_TOKEN
                ))
            })?;

        let client_name = cli
            .client_name
            .or_else(|| env_string(ENV_CLIENT_NAME))
            .or(toml_config.client_name)
            .filter(|name| !name.trim().is_empty());

        let database_path = cli
            .database_path
            .or_else(|| env_string(ENV_DATABASE_PATH).map(PathBuf::from))
            .or(toml_config.database_path)
            .unwrap_or_else(default_database_path);

        let port = match cli.port {
            Some(port) => port,
            None => match env_string(ENV_PORT) {
                Some(raw) => raw.parse::<u16>().map_err(|e| {
                    Error::Config(format!("{} is not a valid port ({}): {}", ENV_PORT, raw, e))
                })?,
                None => toml_config.port.unwrap_or(DEFAULT_PORT),
            },
        };

        let update_interval_secs = toml_config
            .update_interval_secs
            .unwrap_or(DEFAULT_UPDATE_INTERVAL_SECS);
        if update_interval_secs == 0 {
            return Err(Error::Config("update_interval_secs must be positive".to_string()));
        }
        let poll_interval_ms = toml_config.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms == 0 {
            return Err(Error::Config("poll_interval_ms must be positive".to_string()));
        }

        Ok(Self {
            plex_base_url: plex_base_url.trim_end_matches('/').to_string(),
            plex_token,
            client_name,
            library_section: toml_config
                .library_section
                .unwrap_or_else(|| DEFAULT_LIBRARY_SECTION.to_string()),
            accept_invalid_certs: toml_config.accept_invalid_certs.unwrap_or(true),
            database_path,
            port,
            allowed_origins: toml_config.allowed_origins,
            update_interval: Duration::from_secs(update_interval_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            cache_ttl: Duration::from_secs(
                toml_config.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            log_level: toml_config.logging.level,
        })
    }
}

/// Load a TOML config file; a missing file yields defaults
pub fn load_toml(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file {:?} not found, using defaults", path);
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str::<TomlConfig>(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {:?}: {}", path, e)))?;
    info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// `~/.config/tunebox/config.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunebox").join("config.toml"))
}

/// OS-dependent default location of the queue/cache database
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tunebox").join("tunebox.db"))
        .unwrap_or_else(|| PathBuf::from("./tunebox.db"))
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
