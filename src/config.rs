use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::errors::ServiceError;
use crate::models::PageRequest;
use crate::services::list_view::FilterComposition;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const CONFIG_DIR: &str = "config";
const DEFAULT_API_BASE_URL: &str = "http://localhost:8089/api";
const DEFAULT_PAGE_SIZE: u64 = 10;
const DEFAULT_MAX_PAGE_SIZE: u64 = 100;
const DEFAULT_NOTIFICATION_CAPACITY: usize = 20;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// List/query cache configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// When disabled every list load goes to the backend
    #[serde(default = "default_true_bool")]
    pub enabled: bool,

    /// Entry lifetime; absent means entries live until invalidated
    #[serde(default = "default_cache_ttl")]
    #[validate(range(min = 1, message = "cache.ttl_secs must be at least 1"))]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_cache_ttl(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    #[validate(length(min = 1, message = "environment must not be empty"))]
    pub environment: String,

    /// Base URL of the back-office REST API
    #[serde(default = "default_api_base_url")]
    #[validate(url(message = "api_base_url must be a valid URL"))]
    pub api_base_url: String,

    /// Transport timeout; absent leaves the HTTP client default in place
    #[serde(default)]
    #[validate(range(min = 1, message = "request_timeout_secs must be at least 1"))]
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 100, message = "default_page_size must be between 1 and 100"))]
    pub default_page_size: u64,

    #[serde(default = "default_max_page_size")]
    #[validate(range(min = 1, max = 1000, message = "max_page_size must be between 1 and 1000"))]
    pub max_page_size: u64,

    /// How the list screens combine their text, status and date filters
    #[serde(default)]
    pub filter_mode: FilterComposition,

    #[serde(default = "default_notification_capacity")]
    #[validate(range(min = 1, message = "notification_capacity must be at least 1"))]
    pub notification_capacity: usize,

    /// User stamped into `createdBy` when an input carries none
    #[serde(default)]
    pub acting_user: Option<String>,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    #[serde(default)]
    #[validate]
    pub cache: CacheConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: None,
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            filter_mode: FilterComposition::default(),
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            acting_user: None,
            log_level: default_log_level(),
            log_json: false,
            cache: CacheConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Gets cache TTL in Duration
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.ttl_secs.map(Duration::from_secs)
    }

    /// Caps a requested page size at `max_page_size`, falling back to the default.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .filter(|size| *size > 0)
            .unwrap_or(self.default_page_size)
            .min(self.max_page_size)
    }

    /// Server page request for a 0-based table page index.
    pub fn page_request(&self, page_index: u64, requested_size: Option<u64>) -> PageRequest {
        PageRequest::from_index(page_index, self.page_size(requested_size))
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.max_page_size < self.default_page_size {
            let mut err = ValidationError::new("max_page_size_below_default");
            err.message = Some("max_page_size must not be smaller than default_page_size".into());
            errors.add("max_page_size", err);
        }

        if let Some(user) = &self.acting_user {
            if user.trim().is_empty() {
                let mut err = ValidationError::new("acting_user_blank");
                err.message = Some("acting_user must not be blank when set".into());
                errors.add("acting_user", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl From<AppConfigError> for ServiceError {
    fn from(err: AppConfigError) -> Self {
        ServiceError::ConfigError(err.to_string())
    }
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_max_page_size() -> u64 {
    DEFAULT_MAX_PAGE_SIZE
}

fn default_notification_capacity() -> usize {
    DEFAULT_NOTIFICATION_CAPACITY
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_cache_ttl() -> Option<u64> {
    Some(DEFAULT_CACHE_TTL_SECS)
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("freight_desk={},freight_cli={}", level, level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml), env from RUN_ENV or APP_ENV
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same layering as [`load_config`], reading profile files from `dir`.
pub fn load_config_from(dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::from(dir.join("default")).required(false))
        .add_source(File::from(dir.join(run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
