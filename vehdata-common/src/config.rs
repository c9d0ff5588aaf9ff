//! Configuration loading and root folder resolution
//!
//! A missing config file is never fatal: the compiled defaults below are
//! complete enough to talk to the public registries.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "VEHDATA_ROOT_FOLDER";
/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "VEHDATA_CONFIG";

pub const DEFAULT_VPIC_BASE_URL: &str = "https://vpic.nhtsa.dot.gov/api";
pub const DEFAULT_NHTSA_BASE_URL: &str = "https://api.nhtsa.gov";
pub const DEFAULT_FUEL_ECONOMY_BASE_URL: &str = "https://www.fueleconomy.gov/ws/rest";

/// Top-level TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the durable cache database
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub http: HttpConfig,
    pub registries: RegistryConfig,
    pub rate_limits: RateLimitConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when RUST_LOG is unset
    pub level: String,
    /// Write logs to this file instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Outbound HTTP settings shared by every registry client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("vehdata/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Registry base URLs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub vpic_base_url: String,
    /// Recalls, complaints and safety ratings
    pub nhtsa_base_url: String,
    pub fuel_economy_base_url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            vpic_base_url: DEFAULT_VPIC_BASE_URL.to_string(),
            nhtsa_base_url: DEFAULT_NHTSA_BASE_URL.to_string(),
            fuel_economy_base_url: DEFAULT_FUEL_ECONOMY_BASE_URL.to_string(),
        }
    }
}

/// Requests per second allowed against each registry family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub vpic: u32,
    pub nhtsa: u32,
    pub fuel_economy: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            vpic: 5,
            nhtsa: 5,
            fuel_economy: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Use the SQLite tier behind the in-memory tier
    pub durable_enabled: bool,
    /// Persist safety ratings with this TTL (process lifetime only when unset)
    pub safety_ratings_ttl_secs: Option<u64>,
    /// Persist fuel-economy searches and records with this TTL
    pub fuel_economy_ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            durable_enabled: true,
            safety_ratings_ttl_secs: None,
            fuel_economy_ttl_secs: None,
        }
    }
}

/// Load a TOML config file
///
/// A missing file logs a warning and yields defaults; an unreadable or
/// malformed file is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}; using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Locate the config file
///
/// Priority: command-line argument, then `VEHDATA_CONFIG`, then
/// `<config dir>/vehdata/config.toml`.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("vehdata").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `VEHDATA_ROOT_FOLDER`
/// 3. TOML `root_folder`
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/vehdata
        dirs::data_local_dir()
            .map(|d| d.join("vehdata"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/vehdata"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("vehdata"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/vehdata"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("vehdata"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\vehdata"))
    } else {
        PathBuf::from("./vehdata_data")
    }
}
