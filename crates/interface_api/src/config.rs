//! API configuration

use std::time::Duration;

use domain_replay::ReplayConfig;
use infra_db::DatabaseConfig;
use serde::Deserialize;

/// API configuration
///
/// Every field can be set from an `API_`-prefixed environment variable;
/// missing ones keep their default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Upper bound of the connection pool
    pub db_max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub db_connect_timeout_secs: u64,
    /// Log level
    pub log_level: String,
    /// Seconds between two scheduled `execute_all` passes; 0 disables them
    pub replay_interval_secs: u64,
    /// Lease taken on a record while its handler runs
    pub claim_lease_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/lx_replay".to_string(),
            db_max_connections: 10,
            db_connect_timeout_secs: 30,
            log_level: "info".to_string(),
            replay_interval_secs: 60,
            claim_lease_secs: 300,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for `infra_db::create_pool`
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(self.database_url.clone())
            .max_connections(self.db_max_connections)
            .min_connections(self.db_max_connections.min(2))
            .connect_timeout(Duration::from_secs(self.db_connect_timeout_secs))
    }

    /// Interval of the replay scheduler, `None` when disabled
    pub fn replay_interval(&self) -> Option<Duration> {
        (self.replay_interval_secs > 0).then(|| Duration::from_secs(self.replay_interval_secs))
    }

    /// Engine settings derived from this configuration
    ///
    /// A lease too large for `chrono::Duration` keeps the engine default.
    pub fn replay_config(&self) -> ReplayConfig {
        let lease = i64::try_from(self.claim_lease_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds);
        match lease {
            Some(lease) => ReplayConfig::default().with_claim_lease(lease),
            None => ReplayConfig::default(),
        }
    }
}
