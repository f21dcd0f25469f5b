use anyhow::{ensure, Context, Error, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the location of the configuration file.
pub const CONFIG_PATH_ENV: &str = "DEPLOYER_CONFIG";

/// `Configuration` hold the configuration of the tool
/// in order to be able to interact with the remote cluster.
#[derive(Debug, Default, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Configuration {
    /// Cluster related configuration
    pub cluster: Cluster,
}

/// `Cluster` hold the configuration block at the key `cluster` in `Configuration`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Cluster {
    /// The name of the cluster
    pub name: String,
    /// The base URL of the control plane, e.g: https://10.0.0.1:6443
    pub server: String,
    pub credentials: Credentials,
    /// Accept any certificate presented by the control plane.
    pub insecure_skip_tls_verify: bool,
    /// Upper bound for one request, in seconds.
    pub timeout_secs: u64,
}

impl Cluster {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Cluster {
    fn default() -> Self {
        Self {
            name: "local".to_string(),
            server: "http://127.0.0.1:8001".to_string(),
            credentials: Credentials::None,
            insecure_skip_tls_verify: false,
            timeout_secs: 30,
        }
    }
}

/// Credentials sent in the `authorization` header of every request.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    #[default]
    None,
    Basic {
        user: String,
        password: String,
    },
    Bearer {
        token: String,
    },
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"<redacted>")
                .finish(),
        }
    }
}

impl Configuration {
    /// Load the configuration from `$DEPLOYER_CONFIG`, or `~/.deployer/config.json`.
    pub fn load() -> Result<Self> {
        let config_file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(value) => PathBuf::from(value),
            Err(_) => dirs::home_dir()
                .map(|home| home.join(".deployer").join("config.json"))
                .ok_or_else(|| {
                    Error::msg("Wrong operating system, cannot find home directory")
                })?,
        };

        Self::load_from(&config_file)
    }

    /// Load the configuration from `path`, then apply `DEPLOYER_*` environment overrides.
    ///
    /// Nested keys are separated by a double underscore, e.g:
    /// `DEPLOYER_CLUSTER__SERVER=https://10.0.0.1:6443`.
    /// A missing file leaves every value to its default.
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("DEPLOYER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build();

        let configuration = config
            .map_err(Error::msg)
            .and_then(|c| {
                c.try_deserialize::<Configuration>()
                    .context("An error occurred when trying to deserialize the configuration")
            })
            .context("An error occurred when trying to load the configuration")?;

        ensure!(
            configuration.cluster.timeout_secs > 0,
            "cluster.timeout_secs must be at least 1 second"
        );
        Ok(configuration)
    }
}
