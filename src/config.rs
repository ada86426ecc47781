// SPDX-FileCopyrightText: 2026 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact service.
//!
//! Every value has a default suitable for local development; production
//! deployments override them through environment variables (see
//! [`Config::from_env`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the contact service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// sqlx SQLite URL (default: sqlite://sqlite.db)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Runtime environment
    #[serde(default)]
    pub environment: Environment,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// CSRF configuration
    #[serde(default)]
    pub csrf: CsrfConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LogConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Bearer token guarding the administrative listing. Listing is
    /// disabled when unset.
    #[serde(default)]
    pub admin_token: Option<String>,

    /// Extra origins allowed to fetch tokens and make CORS requests.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn is_development(self) -> bool {
        self == Self::Development
    }
}

/// Sliding-window limits for contact submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum submissions per client address per window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

/// Anti-forgery token configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CsrfConfig {
    /// Hex-encoded 32-byte server key. Generated at startup when unset.
    #[serde(default)]
    pub secret_hex: Option<String>,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub cookie_secure: bool,
}

/// Log sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory holding `access.log` and `error.log` (default: logs)
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Write the access/error files at all (default: true)
    #[serde(default = "default_true")]
    pub files: bool,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_database_url() -> String {
    "sqlite://sqlite.db".to_string()
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: default_database_url(),
            environment: Environment::default(),
            rate_limit: RateLimitConfig::default(),
            csrf: CsrfConfig::default(),
            logging: LogConfig::default(),
            metrics: MetricsConfig::default(),
            admin_token: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            files: default_true(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Fixed message returned to throttled clients.
    pub fn limited_message(&self) -> String {
        let minutes = (self.window_secs / 60).max(1);
        format!("Too many contact requests, please try again after {minutes} minutes")
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `BIND_ADDR`, `DATABASE_URL`, `APP_ENV`, `LOG_DIR`
    /// - `RATE_LIMIT_MAX`, `RATE_LIMIT_WINDOW_SECS`
    /// - `CSRF_SECRET`, `COOKIE_SECURE`
    /// - `ADMIN_TOKEN`, `ALLOWED_ORIGINS` (comma separated)
    /// - `METRICS_ENABLED`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup. Unparseable
    /// numbers and booleans fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let flag = |key: &str, default: bool| {
            non_empty(key)
                .map(|v| {
                    matches!(
                        v.trim().to_ascii_lowercase().as_str(),
                        "1" | "true" | "yes" | "on"
                    )
                })
                .unwrap_or(default)
        };

        Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            database_url: non_empty("DATABASE_URL").unwrap_or(defaults.database_url),
            environment: non_empty("APP_ENV")
                .map(|v| Environment::parse(&v))
                .unwrap_or(defaults.environment),
            rate_limit: RateLimitConfig {
                max_requests: non_empty("RATE_LIMIT_MAX")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_secs: non_empty("RATE_LIMIT_WINDOW_SECS")
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(defaults.rate_limit.window_secs),
            },
            csrf: CsrfConfig {
                secret_hex: non_empty("CSRF_SECRET"),
                cookie_secure: flag("COOKIE_SECURE", defaults.csrf.cookie_secure),
            },
            logging: LogConfig {
                dir: non_empty("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.logging.dir),
                files: defaults.logging.files,
            },
            metrics: MetricsConfig {
                enabled: flag("METRICS_ENABLED", defaults.metrics.enabled),
                path: defaults.metrics.path,
            },
            admin_token: non_empty("ADMIN_TOKEN"),
            allowed_origins: non_empty("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().trim_end_matches('/').to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}
