use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use crate::core::{DiscoverySettings, ExclusionPolicy, LookupMode, LookupModeName, PaginatorConfig};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub places: PlacesSettings,
    pub database: DatabaseSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub discovery: DiscoveryTuning,
    #[serde(default)]
    pub exclusion: ExclusionSettings,
    pub auth: AuthSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesSettings {
    #[serde(default = "default_places_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_pagination_timeout_ms")]
    pub pagination_timeout_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for PlacesSettings {
    fn default() -> Self {
        Self {
            endpoint: default_places_endpoint(),
            api_key: String::new(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
            pagination_timeout_ms: default_pagination_timeout_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_places_endpoint() -> String { crate::services::places::DEFAULT_PLACES_ENDPOINT.to_string() }
fn default_max_pages() -> usize { 3 }
fn default_page_delay_ms() -> u64 { 1500 }
fn default_pagination_timeout_ms() -> u64 { 10_000 }
fn default_request_timeout_secs() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CacheSettings {
    /// Redis is optional; without it only the in-process cache is used
    pub redis_url: Option<String>,
    pub ttl_secs: Option<u64>,
    pub l1_cache_size: Option<u64>,
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
}

fn default_cache_enabled() -> bool { true }

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryTuning {
    #[serde(default = "default_radius_miles")]
    pub default_radius_miles: u32,
    #[serde(default)]
    pub lookup_mode: LookupModeName,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for DiscoveryTuning {
    fn default() -> Self {
        Self {
            default_radius_miles: default_radius_miles(),
            lookup_mode: LookupModeName::default(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_radius_miles() -> u32 { 1 }
fn default_concurrency() -> usize { 8 }

#[derive(Debug, Clone, Deserialize)]
pub struct ExclusionSettings {
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_threshold")]
    pub threshold: usize,
}

impl Default for ExclusionSettings {
    fn default() -> Self {
        Self {
            cooldown_days: default_cooldown_days(),
            window_days: default_window_days(),
            threshold: default_threshold(),
        }
    }
}

fn default_cooldown_days() -> u32 { 2 }
fn default_window_days() -> u32 { 30 }
fn default_threshold() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with DISCOVERY_)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., DISCOVERY__PLACES__API_KEY -> places.api_key
            .add_source(environment())
            .build()?;

        with_well_known_env(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        with_well_known_env(settings)?.try_deserialize()
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            paginator: PaginatorConfig {
                max_pages: self.places.max_pages,
                page_delay: Duration::from_millis(self.places.page_delay_ms),
                continuation_timeout: Duration::from_millis(self.places.pagination_timeout_ms),
            },
            lookup: LookupMode::from_name(self.discovery.lookup_mode, self.discovery.concurrency),
            exclusion: ExclusionPolicy {
                cooldown_days: self.exclusion.cooldown_days,
                window_days: self.exclusion.window_days,
                threshold: self.exclusion.threshold,
            },
            default_radius_miles: self.discovery.default_radius_miles,
        }
    }
}

fn environment() -> Environment {
    Environment::with_prefix("DISCOVERY")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Honor the conventional DATABASE_URL and GOOGLE_PLACES_API_KEY variables
fn with_well_known_env(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("DATABASE_URL") {
        builder = builder.set_override("database.url", url)?;
    }
    if let Ok(key) = env::var("GOOGLE_PLACES_API_KEY") {
        builder = builder.set_override("places.api_key", key)?;
    }

    builder.build()
}
