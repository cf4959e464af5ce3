use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tessera_evaluator::RuntimeConfig;

pub const DEFAULT_CONFIG_NAME: &str = "tessera.config.json";

/// Tessera configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Interpreter tunables
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// JSON file backing `Storage.get` / `Storage.set`; in-memory when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,

    /// `tracing` filter used when `RUST_LOG` is not set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filter: Option<String>,
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    /// Absolute path of the storage file, if one is configured
    pub fn get_storage_path(&self, cwd: &str) -> Option<PathBuf> {
        self.storage_path
            .as_ref()
            .map(|path| PathBuf::from(cwd).join(path))
    }
}
