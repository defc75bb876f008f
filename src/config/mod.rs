/// Configuration management for the IceSync service
///
/// Handles server binding, the local database location, remote API credentials
/// and the background sync cadence. Every value can be overridden through an
/// environment variable for container deployment.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Remote workflow API configuration
    pub remote: RemoteConfig,
    /// Background sync configuration
    pub sync: SyncConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
    /// Origins allowed to call the REST surface from a browser
    pub cors_origins: Vec<String>,
}

/// Local workflow table location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection string, e.g. "sqlite://data/icesync.db"
    pub url: String,
}

/// Remote workflow API credentials and limits
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub company_id: String,
    pub user_id: String,
    pub user_secret: String,
    /// Upper bound for each remote call in seconds
    pub timeout_secs: u64,
}

// Hand-written so the secret never reaches the logs.
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("company_id", &self.company_id)
            .field("user_id", &self.user_id)
            .field("user_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Background reconciliation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between the end of one background pass and the start of the next
    pub interval_secs: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    /// Reject configurations the service cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.trim().is_empty() {
            return Err(SyncError::Config("remote base URL is required".into()));
        }
        if self.remote.timeout_secs == 0 {
            return Err(SyncError::Config("remote timeout must be greater than zero".into()));
        }
        if self.sync.interval_secs == 0 {
            return Err(SyncError::Config("sync interval must be greater than zero".into()));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for k8s/container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env_or("ICESYNC_HOST", "0.0.0.0"),
                port: env_parse("ICESYNC_PORT", 5000),
                cors_origins: env_or(
                    "ICESYNC_CORS_ORIGINS",
                    "http://localhost:3000,https://localhost:3000",
                )
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            },
            database: DatabaseConfig {
                url: env_or("ICESYNC_DATABASE_URL", "sqlite://data/icesync.db"),
            },
            remote: RemoteConfig {
                base_url: env_or("ICESYNC_API_BASE_URL", "https://api-test.universal-loader.com"),
                company_id: env_or("ICESYNC_API_COMPANY_ID", ""),
                user_id: env_or("ICESYNC_API_USER_ID", ""),
                user_secret: env_or("ICESYNC_API_USER_SECRET", ""),
                timeout_secs: env_parse("ICESYNC_API_TIMEOUT_SECS", 30),
            },
            sync: SyncConfig {
                interval_secs: env_parse("ICESYNC_SYNC_INTERVAL_SECS", 30 * 60),
            },
        }
    }
}
