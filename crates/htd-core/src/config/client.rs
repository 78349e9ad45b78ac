//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;
use crate::error::ConfigError;

/// Configuration for the holdthedoor client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base HTTP(S) URL of the server hosting login, registry and terminal proxy
    pub server_url: String,

    /// How often the machine list is re-fetched, in seconds
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Timeout for login and registry requests, in seconds
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,

    /// File holding the persisted token and expiry
    pub credentials_path: PathBuf,

    /// Log file used while a terminal is attached
    pub log_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let config_dir = super::default_config_dir();

        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            poll_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            credentials_path: config_dir.join("session.json"),
            log_path: config_dir.join("holdthedoor.log"),
        }
    }
}

impl ClientConfig {
    /// Check values that would make the client misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "server_url must start with http:// or https://, got {}",
                self.server_url
            )));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "poll_interval must be at least 1 second".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}
