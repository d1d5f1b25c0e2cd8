use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            scoring: ScoringConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tunables for the scoring engine. Passed explicitly to the service so tests can
/// shorten TTLs or shrink batch chunks without touching process state.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Added to every severity denominator so an all-zero dimension never divides by zero.
    pub epsilon: f64,
    pub cache_ttl: Duration,
    pub batch_chunk_size: usize,
    pub default_question_limit: usize,
    pub max_question_limit: usize,
    pub default_history_limit: usize,
    pub target_score: f64,
    /// Score movement (in points) below which a recomputation is reported as stable.
    pub trend_dead_band: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-10,
            cache_ttl: Duration::from_secs(300),
            batch_chunk_size: 5,
            default_question_limit: 5,
            max_question_limit: 20,
            default_history_limit: 10,
            target_score: 95.0,
            trend_dead_band: 0.5,
        }
    }
}

impl ScoringConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let epsilon = env_number("SCORING_EPSILON", defaults.epsilon)?;
        let ttl_secs = env_number("SCORING_CACHE_TTL_SECS", defaults.cache_ttl.as_secs())?;
        let batch_chunk_size =
            env_number("SCORING_BATCH_CHUNK_SIZE", defaults.batch_chunk_size)?.max(1);
        let default_question_limit =
            env_number("SCORING_NQS_LIMIT", defaults.default_question_limit)?;
        let max_question_limit = env_number("SCORING_NQS_MAX_LIMIT", defaults.max_question_limit)?;
        let default_history_limit =
            env_number("SCORING_HISTORY_LIMIT", defaults.default_history_limit)?;
        let target_score = env_number("SCORING_TARGET_SCORE", defaults.target_score)?;

        Ok(Self {
            epsilon,
            cache_ttl: Duration::from_secs(ttl_secs),
            batch_chunk_size,
            default_question_limit,
            max_question_limit,
            default_history_limit,
            target_score,
            trend_dead_band: defaults.trend_dead_band,
        })
    }

    /// Clamp a caller-supplied ranking limit into `[1, max_question_limit]`.
    pub fn question_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_question_limit)
            .clamp(1, self.max_question_limit.max(1))
    }
}

fn env_number<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be numeric, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
