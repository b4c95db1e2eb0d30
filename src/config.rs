use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const CONFIG_DIR: &str = "config";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Application configuration, layered from `config/default`,
/// `config/{RUN_ENV}` and `APP_*` environment variables.
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Maximum number of pooled connections
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,

    /// Minimum number of pooled connections
    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,

    /// Run migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Deployment environment name
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Tax rate used when no tax config file has been written yet,
    /// as a decimal fraction (0.08 = 8%)
    #[serde(default)]
    pub default_tax_rate: Decimal,

    /// Path of the JSON file the tax-rate service persists to.
    /// None disables persistence (rate is held in memory only).
    #[serde(default)]
    pub tax_config_path: Option<String>,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

/// Initializes tracing using the provided log level as the default filter.
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("giftcenter_api={},sea_orm=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

impl AppConfig {
    /// Loads configuration from files and environment.
    pub fn load() -> Result<Self, ConfigError> {
        let run_env = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let builder = Config::builder()
            .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
            .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"));

        let cfg: AppConfig = builder.build()?.try_deserialize()?;
        cfg.validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {}", e)))?;
        Ok(cfg)
    }

    /// Constructs a minimal configuration programmatically (tests, tools).
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            db_min_connections: DEFAULT_MIN_CONNECTIONS,
            auto_migrate: false,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            environment,
            default_tax_rate: Decimal::ZERO,
            tax_config_path: None,
        }
    }
}
