use std::path::Path;
use std::time::Duration;

use config as cfg;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ClusterError, Result};

/// Settings for the cluster monitor.
///
/// Sources, lowest precedence first:
/// 1. built-in defaults
/// 2. an optional TOML/YAML/JSON file
/// 3. environment variables with the `CLUSTERMON__` prefix (e.g. `CLUSTERMON__BASE_URL`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Workbench base URL of the node to monitor
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Reconciliation period (default: 1000ms)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Per-request timeout (default: 10s)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Bound on waiting for the poller to stop (default: 5s)
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Value of the `Authorization` header sent with every request
    #[serde(default, skip_serializing)]
    pub authorization: Option<SecretString>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_ms: default_poll_interval(),
            request_timeout_secs: default_request_timeout(),
            shutdown_timeout_secs: default_shutdown_timeout(),
            authorization: None,
        }
    }
}

impl MonitorSettings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = cfg::Config::builder();
        if let Some(path) = path {
            debug!("loading monitor settings from {:?}", path);
            builder = builder.add_source(cfg::File::from(path).required(true));
        }
        builder = builder.add_source(
            cfg::Environment::with_prefix("CLUSTERMON")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ClusterError::Config(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ClusterError::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        self.base_url()?;
        Ok(())
    }

    /// Parsed base URL with a trailing slash so relative joins keep any path prefix.
    pub fn base_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClusterError::Config(format!("invalid base_url {}: {e}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClusterError::Config(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:7200".to_string()
}
fn default_poll_interval() -> u64 {
    1000
}
fn default_request_timeout() -> u64 {
    10
}
fn default_shutdown_timeout() -> u64 {
    5
}
