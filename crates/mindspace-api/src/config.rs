//! Server configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

use mindspace_core::{Error, Result, DEFAULT_MAX_TREE_DEPTH};

pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/mindspace";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://127.0.0.1:5173";
pub const DEFAULT_LOG_FILTER: &str = "mindspace_api=debug,tower_http=debug";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging settings (`LOG_FORMAT`, `LOG_FILE`, `LOG_ANSI`).
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub file: Option<String>,
    /// `None` leaves ANSI detection to the subscriber.
    pub ansi: Option<bool>,
}

/// Global request rate limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests: u32,
    pub period_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub max_tree_depth: usize,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
    pub log: LogConfig,
}

fn flag(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Parse `key` with `lookup`, falling back to `default` when unset. Zero is
/// rejected: every numeric setting here is a size, count or lifetime.
fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid value for {}: {:?}", key, raw)))?;
    if value <= T::default() {
        return Err(Error::Config(format!("{} must be greater than zero", key)));
    }
    Ok(value)
}

impl RateLimitConfig {
    /// Interval at which one request of allowance is restored.
    pub fn replenish_interval(&self) -> Duration {
        Duration::from_secs(self.period_secs) / self.requests.max(1)
    }

    /// Reject quotas the limiter cannot represent: the refill interval must be
    /// at least one nanosecond.
    fn validate(self) -> Result<Self> {
        if self.replenish_interval().is_zero() {
            return Err(Error::Config(format!(
                "RATE_LIMIT_REQUESTS ({}) is too large for RATE_LIMIT_PERIOD_SECS ({})",
                self.requests, self.period_secs
            )));
        }
        Ok(self)
    }
}

impl ServerConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(Error::Config(format!(
                    "Invalid value for LOG_FORMAT: {:?} (expected \"text\" or \"json\")",
                    other
                )))
            }
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: positive(&lookup, "PORT", DEFAULT_PORT)?,
            allowed_origins: lookup("ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string()),
            access_token_ttl_secs: positive(
                &lookup,
                "ACCESS_TOKEN_TTL_SECS",
                mindspace_db::tokens::DEFAULT_ACCESS_TOKEN_TTL_SECS,
            )?,
            refresh_token_ttl_secs: positive(
                &lookup,
                "REFRESH_TOKEN_TTL_SECS",
                mindspace_db::tokens::DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
            max_tree_depth: positive(&lookup, "MAX_TREE_DEPTH", DEFAULT_MAX_TREE_DEPTH)?,
            db_max_connections: positive(
                &lookup,
                "DB_MAX_CONNECTIONS",
                mindspace_db::pool::DEFAULT_MAX_CONNECTIONS,
            )?,
            db_acquire_timeout_secs: positive(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                mindspace_db::pool::DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?,
            rate_limit: RateLimitConfig {
                enabled: lookup("RATE_LIMIT_ENABLED").map(|v| flag(&v)).unwrap_or(true),
                requests: positive(&lookup, "RATE_LIMIT_REQUESTS", 100)?,
                period_secs: positive(&lookup, "RATE_LIMIT_PERIOD_SECS", 60)?,
            }
            .validate()?,
            log: LogConfig {
                format,
                file: lookup("LOG_FILE").filter(|path| !path.trim().is_empty()),
                ansi: lookup("LOG_ANSI").map(|v| flag(&v)),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
