//! Client configuration resolution
//!
//! Each setting resolves with ENV → TOML → compiled default priority. The
//! result is a [`ClientConfig`], which is all [`crate::VehicleDataClient`]
//! needs to build its adapters and cache policies.

use crate::cache::CachePolicy;
use crate::sources::HttpSettings;
use std::time::Duration;
use tracing::{info, warn};
use vehdata_common::config::TomlConfig;
use vehdata_common::{Error, Result};

pub const VPIC_URL_ENV: &str = "VEHDATA_VPIC_URL";
pub const NHTSA_URL_ENV: &str = "VEHDATA_NHTSA_URL";
pub const FUEL_ECONOMY_URL_ENV: &str = "VEHDATA_FUEL_ECONOMY_URL";
pub const HTTP_TIMEOUT_ENV: &str = "VEHDATA_HTTP_TIMEOUT_SECS";

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Registry base URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub vpic: String,
    /// Recalls, complaints and safety ratings share one host
    pub nhtsa: String,
    pub fuel_economy: String,
}

/// Requests per second per registry family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimits {
    pub vpic: u32,
    pub nhtsa: u32,
    pub fuel_economy: u32,
}

/// Cache policy per data class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicies {
    pub vin_decode: CachePolicy,
    pub recalls: CachePolicy,
    pub complaints: CachePolicy,
    pub safety_ratings: CachePolicy,
    pub fuel_economy: CachePolicy,
}

impl Default for CachePolicies {
    fn default() -> Self {
        Self {
            vin_decode: CachePolicy::durable(30 * DAY),
            recalls: CachePolicy::durable(7 * DAY),
            complaints: CachePolicy::durable(30 * DAY),
            safety_ratings: CachePolicy::process_lifetime(),
            fuel_economy: CachePolicy::process_lifetime(),
        }
    }
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    pub http: HttpSettings,
    pub rate_limits: RateLimits,
    pub cache: CachePolicies,
    /// Whether the binary should open the SQLite tier
    pub durable_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from_toml_only(&TomlConfig::default())
    }
}

impl ClientConfig {
    /// Resolve from a loaded TOML file plus environment overrides
    pub fn resolve(toml_config: &TomlConfig) -> Result<Self> {
        let mut config = Self::from_toml_only(toml_config);

        if let Some(url) = env_override(VPIC_URL_ENV) {
            config.endpoints.vpic = url;
        }
        if let Some(url) = env_override(NHTSA_URL_ENV) {
            config.endpoints.nhtsa = url;
        }
        if let Some(url) = env_override(FUEL_ECONOMY_URL_ENV) {
            config.endpoints.fuel_economy = url;
        }
        if let Some(raw) = env_override(HTTP_TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::Config(format!("{} must be a number of seconds, got {:?}", HTTP_TIMEOUT_ENV, raw))
            })?;
            config.http.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    /// TOML values and defaults, ignoring the environment
    pub fn from_toml_only(toml_config: &TomlConfig) -> Self {
        let cache = &toml_config.cache;
        let mut policies = CachePolicies::default();
        if let Some(secs) = cache.safety_ratings_ttl_secs {
            policies.safety_ratings = CachePolicy::durable(Duration::from_secs(secs));
        }
        if let Some(secs) = cache.fuel_economy_ttl_secs {
            policies.fuel_economy = CachePolicy::durable(Duration::from_secs(secs));
        }

        Self {
            endpoints: Endpoints {
                vpic: toml_config.registries.vpic_base_url.clone(),
                nhtsa: toml_config.registries.nhtsa_base_url.clone(),
                fuel_economy: toml_config.registries.fuel_economy_base_url.clone(),
            },
            http: HttpSettings {
                timeout: Duration::from_secs(toml_config.http.timeout_secs),
                user_agent: toml_config.http.user_agent.clone(),
            },
            rate_limits: RateLimits {
                vpic: toml_config.rate_limits.vpic,
                nhtsa: toml_config.rate_limits.nhtsa,
                fuel_economy: toml_config.rate_limits.fuel_economy,
            },
            cache: policies,
            durable_enabled: cache.durable_enabled,
        }
    }

    /// All registries pointed at one base URL (mock servers in tests)
    pub fn with_single_base_url(base_url: &str) -> Self {
        Self {
            endpoints: Endpoints {
                vpic: base_url.to_string(),
                nhtsa: base_url.to_string(),
                fuel_economy: base_url.to_string(),
            },
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.http.timeout.is_zero() {
            return Err(Error::Config("HTTP timeout must be greater than zero".to_string()));
        }

        for (name, rate) in [
            ("vpic", self.rate_limits.vpic),
            ("nhtsa", self.rate_limits.nhtsa),
            ("fuel_economy", self.rate_limits.fuel_economy),
        ] {
            if rate == 0 {
                warn!("Rate limit for {} is 0; using 1 request per second", name);
            }
        }

        Ok(())
    }
}

fn env_override(var: &str) -> Option<String> {
    let value = std::env::var(var).ok()?;
    if value.trim().is_empty() {
        return None;
    }
    info!("{} loaded from environment variable", var);
    Some(value)
}
