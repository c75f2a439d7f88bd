use std::{env, fmt, net::SocketAddr, time::Duration};

use url::Url;

use super::server_bind_address;

pub const DEFAULT_CATALOG_API_BASE: &str = "https://glore-bd-backend-node-mongo.vercel.app/api/";
pub const DEFAULT_STORE_API_BASE: &str = "https://interview-task-green.vercel.app/task/";
pub const DEFAULT_DOMAIN_SUFFIX: &str = ".expressitbd.com";
pub const DEFAULT_DOMAIN_DEBOUNCE_MS: u64 = 500;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SSE_HEARTBEAT_SECS: u64 = 20;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    /// Base URL of the product catalog API; `product` is joined onto it.
    pub catalog_api_base: Url,
    /// Base URL of the store API hosting the domain check and store creation.
    pub store_api_base: Url,
    /// Suffix appended to a proposed subdomain before the availability lookup.
    pub domain_suffix: String,
    pub domain_debounce: Duration,
    pub http_timeout: Duration,
    pub sse_heartbeat: Duration,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let catalog_api_base = base_url("CATALOG_API_BASE", DEFAULT_CATALOG_API_BASE)?;
        let store_api_base = base_url("STORE_API_BASE", DEFAULT_STORE_API_BASE)?;
        let domain_suffix =
            env::var("DOMAIN_SUFFIX").unwrap_or_else(|_| DEFAULT_DOMAIN_SUFFIX.to_string());

        let domain_debounce = Duration::from_millis(positive_u64(
            "DOMAIN_DEBOUNCE_MS",
            DEFAULT_DOMAIN_DEBOUNCE_MS,
        )?);
        let http_timeout =
            Duration::from_secs(positive_u64("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?);
        let sse_heartbeat = Duration::from_secs(positive_u64(
            "SSE_HEARTBEAT_SECS",
            DEFAULT_SSE_HEARTBEAT_SECS,
        )?);

        Ok(Self {
            bind_addr,
            environment,
            catalog_api_base,
            store_api_base,
            domain_suffix,
            domain_debounce,
            http_timeout,
            sse_heartbeat,
        })
    }
}

/// Parses a base URL, forcing a trailing slash so relative joins keep the last segment.
fn base_url(key: &'static str, default: &str) -> Result<Url, ConfigError> {
    let mut raw = env::var(key).unwrap_or_else(|_| default.to_string());
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl { key, source })
}

fn positive_u64(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    let Ok(raw) = env::var(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(ConfigError::InvalidNumber { key, value: raw }),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    InvalidUrl {
        key: &'static str,
        source: url::ParseError,
    },
    InvalidNumber {
        key: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::InvalidUrl { key, source } => write!(f, "invalid {key} value: {source}"),
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
