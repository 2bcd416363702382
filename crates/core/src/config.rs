#![allow(missing_docs)]

//! Application configuration.
//!
//! Values are layered: built-in defaults, then `<config_dir>/ktanesim/config.toml`,
//! then `KTANESIM_*` environment variables (`__` separates nested keys, e.g.
//! `KTANESIM_LOG_STORE__ENABLED=true`).

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::export::OpcCredentials;

const APP_DIR: &str = "ktanesim";
const ENV_PREFIX: &str = "KTANESIM";

const DEFAULT_CONFIG: &str = r#"# ktanesim configuration

# Prefix every command starts with.
prefix = "!"

# Participant id allowed to run `shutdown`.
# owner_id = "123456789"

# Fixed seed for reproducible bombs.
# seed = 42

debug_mode = false

[lists]
unclaimed = 10
claimed = 10
found = 10

[log_store]
enabled = false
endpoint = "https://api.onpointcoding.net/v2/logs"
viewer_base = "https://logs.onpointcoding.net/file"
client_id = ""
client_secret = ""
timeout_secs = 10
"#;

/// Upper bounds for list answers; longer lists are randomly sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLimits {
    pub unclaimed: usize,
    pub claimed: usize,
    pub found: usize,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            unclaimed: 10,
            claimed: 10,
            found: 10,
        }
    }
}

/// Where finished bomb logs are uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogStoreConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub viewer_base: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
}

impl Default for LogStoreConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.onpointcoding.net/v2/logs".to_string(),
            viewer_base: "https://logs.onpointcoding.net/file".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 10,
        }
    }
}

impl LogStoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Credentials when uploading is enabled.
    pub fn credentials(&self) -> Option<OpcCredentials> {
        self.enabled.then(|| OpcCredentials {
            endpoint: self.endpoint.clone(),
            viewer_base: self.viewer_base.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
        })
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub prefix: String,
    pub owner_id: Option<String>,
    pub seed: Option<u64>,
    pub debug_mode: bool,
    pub log_dir: PathBuf,
    pub lists: ListLimits,
    pub log_store: LogStoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_string(),
            owner_id: None,
            seed: None,
            debug_mode: false,
            log_dir: default_log_dir(),
            lists: ListLimits::default(),
            log_store: LogStoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load using `path` as the config file; a missing file just means defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        Self::load_layered(path, environment())
    }

    fn load_layered(path: &Path, environment: Environment) -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())
            .context("failed to serialise default configuration")?;
        Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(false))
            .add_source(environment)
            .build()
            .with_context(|| format!("failed to load configuration from {}", path.display()))?
            .try_deserialize()
            .context("invalid configuration")
    }
}

/// `KTANESIM_PREFIX`, `KTANESIM_LOG_STORE__ENABLED`, ...
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// `<config_dir>/ktanesim/config.toml`.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("config.toml")
}

fn default_log_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("logs")
}

/// Write a commented default config file on first run.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_file_matches_built_in_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("ktanesim").join("config.toml");
        write_default_config(&path)?;
        assert!(path.exists());

        let loaded = AppConfig::load_from(&path)?;
        let defaults = AppConfig::default();
        assert_eq!(loaded.prefix, "!");
        assert_eq!(loaded.lists, defaults.lists);
        assert_eq!(loaded.log_store, defaults.log_store);
        assert!(loaded.log_store.credentials().is_none());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "prefix = \"?\"\nowner_id = \"42\"\nseed = 7\n[lists]\nfound = 3\n[log_store]\nenabled = true\nclient_id = \"bot\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.prefix, "?");
        assert_eq!(config.owner_id.as_deref(), Some("42"));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.lists.found, 3);
        assert_eq!(config.lists.unclaimed, 10);
        let credentials = config.log_store.credentials().expect("enabled");
        assert_eq!(credentials.client_id, "bot");
        assert_eq!(config.log_store.timeout(), Duration::from_secs(10));
        Ok(())
    }

    #[test]
    fn environment_overrides_file_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "prefix = \"?\"\n[lists]\nfound = 3\n")?;

        let vars: config::Map<String, String> = [
            ("KTANESIM_PREFIX", "$"),
            ("KTANESIM_LOG_STORE__ENABLED", "true"),
            ("KTANESIM_LOG_STORE__TIMEOUT_SECS", "3"),
            ("OTHER_PREFIX", "%"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let config = AppConfig::load_layered(&path, environment().source(Some(vars)))?;
        assert_eq!(config.prefix, "$");
        assert!(config.log_store.enabled);
        assert_eq!(config.log_store.timeout(), Duration::from_secs(3));
        assert_eq!(config.lists.found, 3);
        Ok(())
    }

    #[test]
    fn existing_file_is_left_alone() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "prefix = \"$\"\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "prefix = \"$\"\n");
        Ok(())
    }
}
