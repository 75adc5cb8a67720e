use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::alerts::{AlertThresholds, Severity};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_REST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ALERT_REFRESH_SECS: u64 = 60;
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 5;

/// Where dashboard records come from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// Seeded in-memory fixtures
    Mock,
    /// Live REST backend at `rest_base_url`
    Rest,
}

impl Default for DataSourceKind {
    fn default() -> Self {
        DataSourceKind::Mock
    }
}

/// Outbound alert webhooks (email/SMS gateways)
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct NotificationConfig {
    /// Webhook that relays alerts by email
    #[serde(default)]
    #[validate(url)]
    pub email_webhook_url: Option<String>,

    /// Webhook that relays alerts by SMS
    #[serde(default)]
    #[validate(url)]
    pub sms_webhook_url: Option<String>,

    /// Shared secret for the `X-Signature` header; unsigned when absent
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Lowest severity that is sent
    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    #[serde(default = "default_notify_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_webhook_url: None,
            sms_webhook_url: None,
            webhook_secret: None,
            min_severity: default_min_severity(),
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Mock fixtures or live REST backend
    #[serde(default)]
    pub data_source: DataSourceKind,

    /// Base URL of the live REST backend
    #[serde(default)]
    #[validate(url)]
    pub rest_base_url: Option<String>,

    /// Per-request timeout against the REST backend
    #[serde(default = "default_rest_timeout_secs")]
    #[validate(range(min = 1, max = 300))]
    pub rest_timeout_secs: u64,

    /// Serve mock fixtures when a live read fails
    #[serde(default = "default_true_bool")]
    pub fallback_to_mock: bool,

    /// Background alert refresh period; 0 disables the poller
    #[serde(default = "default_alert_refresh_secs")]
    pub alert_refresh_interval_secs: u64,

    /// Alert rule thresholds
    #[serde(default)]
    #[validate(custom = "validate_thresholds")]
    pub alerts: AlertThresholds,

    /// Alert notification webhooks
    #[serde(default)]
    #[validate]
    pub notifications: NotificationConfig,

    /// User selected at startup, before anyone switches
    #[serde(default)]
    pub default_user_id: Option<String>,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            log_json: false,
            data_source: DataSourceKind::Mock,
            rest_base_url: None,
            rest_timeout_secs: default_rest_timeout_secs(),
            fallback_to_mock: true,
            alert_refresh_interval_secs: default_alert_refresh_secs(),
            alerts: AlertThresholds::default(),
            notifications: NotificationConfig::default(),
            default_user_id: None,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
        }
    }
}

impl AppConfig {
    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn rest_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rest_timeout_secs)
    }

    pub fn alert_refresh_interval(&self) -> Option<std::time::Duration> {
        (self.alert_refresh_interval_secs > 0)
            .then(|| std::time::Duration::from_secs(self.alert_refresh_interval_secs))
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.data_source == DataSourceKind::Rest && self.rest_base_url.is_none() {
            let mut err = ValidationError::new("rest_base_url_required");
            err.message = Some(
                "Set APP__REST_BASE_URL when APP__DATA_SOURCE=rest".into(),
            );
            errors.add("rest_base_url", err);
        }

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
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

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_rest_timeout_secs() -> u64 {
    DEFAULT_REST_TIMEOUT_SECS
}

fn default_alert_refresh_secs() -> u64 {
    DEFAULT_ALERT_REFRESH_SECS
}

fn default_notify_timeout_secs() -> u64 {
    DEFAULT_NOTIFY_TIMEOUT_SECS
}

fn default_min_severity() -> Severity {
    Severity::Warning
}

fn default_true_bool() -> bool {
    true
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

fn validate_thresholds(thresholds: &AlertThresholds) -> Result<(), ValidationError> {
    thresholds.check().map_err(|msg| {
        let mut err = ValidationError::new("alerts");
        err.message = Some(msg.into());
        err
    })
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("shopfloor_ops={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt().with_env_filter(EnvFilter::new(filter_directive));
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    load_config_from(Path::new(CONFIG_DIR), &run_env)
}

/// Same as [`load_config`] with an explicit config directory and profile.
pub fn load_config_from(config_dir: &Path, run_env: &str) -> Result<AppConfig, AppConfigError> {
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("environment", run_env)?
        .add_source(File::with_name(&config_dir.join("default").to_string_lossy()).required(false))
        .add_source(File::with_name(&config_dir.join(run_env).to_string_lossy()).required(false))
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
