use std::collections::HashMap;
use std::path::{Path, PathBuf};

use eyre::ContextCompat;
use reqwest::Url;
use serde::Deserialize;

use crate::cli::PrivateKey;
use crate::serde_utils;

pub const DEFAULT_CONFIG_PATH: &str = "deployer.yml";
pub const LOCALHOST_NETWORK: &str = "localhost";
pub const LOCALHOST_URL: &str = "http://127.0.0.1:8545";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_network")]
    pub default_network: String,

    #[serde(default = "default_artifacts")]
    pub artifacts: PathBuf,

    #[serde(default)]
    pub networks: HashMap<String, NetworkConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub url: Url,

    /// Empty means the node's own accounts are used
    #[serde(default)]
    pub accounts: Vec<PrivateKey>,
}

fn default_network() -> String {
    LOCALHOST_NETWORK.to_string()
}

fn default_artifacts() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_network: default_network(),
            artifacts: default_artifacts(),
            networks: HashMap::new(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, or the default config file if present
    pub async fn load(path: Option<&Path>) -> eyre::Result<Self> {
        match path {
            Some(path) => serde_utils::read_deserialize(path).await,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                serde_utils::read_deserialize(DEFAULT_CONFIG_PATH).await
            }
            None => Ok(Self::default()),
        }
    }

    /// `localhost` resolves even when not configured
    pub fn network(&self, name: &str) -> eyre::Result<NetworkConfig> {
        if let Some(network) = self.networks.get(name) {
            return Ok(network.clone());
        }

        (name == LOCALHOST_NETWORK)
            .then(NetworkConfig::localhost)
            .transpose()?
            .with_context(|| format!("Network {name} is not configured"))
    }
}

impl NetworkConfig {
    pub fn localhost() -> eyre::Result<Self> {
        Ok(Self {
            url: LOCALHOST_URL.parse()?,
            accounts: vec![],
        })
    }
}
