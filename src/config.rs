use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Payment gateway credentials and connection settings. `key_secret` is
/// the merchant secret, also used to verify confirmation signatures.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway API base URL
    pub base_url: String,

    /// Merchant key identifier
    #[validate(length(min = 1))]
    pub key_id: String,

    /// Merchant key secret (HMAC key for signature reconciliation)
    #[validate(length(min = 16))]
    pub key_secret: String,

    /// Request timeout for gateway calls (seconds)
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,
}

/// Application configuration with validation.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to create the database schema on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// JWT secret used to validate bearer tokens
    #[validate(length(min = 32))]
    pub jwt_secret: String,

    /// ISO currency code used for checkout
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Status assigned to an order at checkout time, before payment is
    /// confirmed: "pending" or "processing". Historical behavior is
    /// "processing"; "pending" defers that transition until the payment
    /// is reconciled.
    #[serde(default = "default_initial_order_status")]
    #[validate(custom = "validate_initial_order_status")]
    pub initial_order_status: String,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// Payment gateway settings
    #[validate]
    pub gateway: GatewayConfig,
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

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_initial_order_status() -> String {
    "processing".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    DEFAULT_GATEWAY_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_min_connections() -> u32 {
    1
}

fn validate_initial_order_status(value: &str) -> Result<(), ValidationError> {
    match value {
        "pending" | "processing" => Ok(()),
        _ => Err(ValidationError::new("initial_order_status")),
    }
}

impl AppConfig {
    pub fn is_development(&self) -> bool {
        self.environment == "development" || self.environment == "test"
    }

    /// Loads configuration from `config/default.toml` (optional),
    /// `config/{environment}.toml` (optional), and `APP__`-prefixed
    /// environment variables, then validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("APP__ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENV.to_string());

        let cfg: AppConfig = Config::builder()
            .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
            .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?
            .try_deserialize()?;

        cfg.validate()
            .map_err(|e| ConfigError::Message(format!("invalid configuration: {e}")))?;

        info!(
            environment = %cfg.environment,
            port = cfg.port,
            currency = %cfg.currency,
            initial_order_status = %cfg.initial_order_status,
            "configuration loaded"
        );
        Ok(cfg)
    }

    /// Minimal configuration for test harnesses.
    pub fn for_tests(database_url: String) -> Self {
        Self {
            database_url,
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_json: false,
            auto_migrate: true,
            jwt_secret: "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            initial_order_status: default_initial_order_status(),
            event_channel_capacity: 64,
            cors_allowed_origins: None,
            db_max_connections: 1,
            db_min_connections: 1,
            gateway: GatewayConfig {
                base_url: "http://127.0.0.1:1/unused".to_string(),
                key_id: "test_key_id".to_string(),
                key_secret: "test_gateway_secret_key".to_string(),
                timeout_secs: 1,
            },
        }
    }
}

/// Initializes the global tracing subscriber. Call once at startup.
pub fn init_tracing(log_level: &str, json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
