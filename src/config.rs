use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  /// Directory for daily log files (logs go to stderr if not set)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL every endpoint is resolved against, e.g. "https://api.example.com/v1"
  pub base_url: String,
  /// Client-side timeout; an expired request counts as "no response"
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a cached GET response may be served while offline
  #[serde(default = "default_ttl_secs")]
  pub default_ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      default_ttl_secs: default_ttl_secs(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file for the queue, cache and session (defaults to the data dir)
  pub path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
  10
}

fn default_ttl_secs() -> u64 {
  24 * 60 * 60
}

impl ApiConfig {
  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }
}

impl CacheConfig {
  pub fn default_ttl(&self) -> Duration {
    Duration::from_secs(self.default_ttl_secs)
  }
}

impl Config {
  /// Load configuration, from `explicit_path` when given, otherwise from
  /// the first of `./tether.yaml` and `<config dir>/tether/config.yaml`
  /// that exists.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    if let Some(path) = explicit_path {
      if !path.exists() {
        return Err(eyre!("Config file not found: {}", path.display()));
      }
      return Self::load_from_path(path);
    }

    let path = Self::candidates()
      .into_iter()
      .find(|p| p.exists())
      .ok_or_else(|| {
        eyre!(
          "No configuration file found. Create ./tether.yaml or ~/.config/tether/config.yaml \
           (see config.example.yaml)."
        )
      })?;
    Self::load_from_path(&path)
  }

  fn candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("tether.yaml")];
    paths.extend(dirs::config_dir().map(|dir| dir.join("tether").join("config.yaml")));
    paths
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let mut config: Config = serde_yaml::from_str(contents)?;
    url::Url::parse(&config.api.base_url)
      .map_err(|e| eyre!("api.base_url {:?} is not a URL: {}", config.api.base_url, e))?;
    config.log_dir = config.log_dir.map(expand_home);
    config.storage.path = config.storage.path.map(expand_home);
    Ok(config)
  }

  /// Get an API token from the environment, for `login` without `--token`.
  ///
  /// Checks TETHER_API_TOKEN.
  pub fn get_api_token() -> Result<String> {
    std::env::var("TETHER_API_TOKEN").map_err(|_| {
      eyre!("API token not found. Pass --token or set the TETHER_API_TOKEN environment variable.")
    })
  }
}

/// Replace a leading `~` with the home directory. Other paths are returned as is.
fn expand_home(path: PathBuf) -> PathBuf {
  match (path.strip_prefix("~"), dirs::home_dir()) {
    (Ok(rest), Some(home)) => home.join(rest),
    _ => path,
  }
}
