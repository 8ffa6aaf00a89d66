use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::offline::CacheNames;
use crate::progress::StorageKeys;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Namespace for the durable progress keys
  pub storage_prefix: String,
  /// Directory holding the databases and logs (defaults to $XDG_DATA_HOME/fvocab)
  pub data_dir: Option<PathBuf>,
  /// Log filter used when RUST_LOG is not set
  pub log_level: String,
  pub cache: CacheConfig,
  pub notifications: NotificationConfig,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      storage_prefix: "french-app".to_string(),
      data_dir: None,
      log_level: "info".to_string(),
      cache: CacheConfig::default(),
      notifications: NotificationConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Disable to bypass the cache buckets entirely (always miss, never store)
  pub enabled: bool,
  pub app_name: String,
  /// Embedded in every bucket name; bump it to rotate buckets on activation
  pub version: String,
  /// Base URL that request paths are resolved against
  pub origin: String,
  /// Any path under this prefix is a dataset file and goes to the static bucket
  pub data_prefix: String,
  pub static_assets: Vec<String>,
  /// Extensions (without the dot) cached in the dynamic bucket
  pub dynamic_extensions: Vec<String>,
  pub offline_message: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    let static_assets = [
      "/",
      "/index.html",
      "/manifest.json",
      "/icon-192x192.png",
      "/icon-512x512.png",
      "/icon-144x144.png",
      "/icon-96x96.png",
      "/icon-72x72.png",
      "/data/grade7_words.json",
      "/data/grade8_words.json",
      "/data/grade9_words.json",
    ];
    let dynamic_extensions = ["css", "js", "png", "jpg", "jpeg", "svg", "ico", "woff", "woff2"];

    Self {
      enabled: true,
      app_name: "french-vocabulary-app".to_string(),
      version: "v1.0.0".to_string(),
      origin: "http://localhost:5173".to_string(),
      data_prefix: "/data/".to_string(),
      static_assets: static_assets.iter().map(|s| s.to_string()).collect(),
      dynamic_extensions: dynamic_extensions.iter().map(|s| s.to_string()).collect(),
      offline_message: "应用当前处于离线状态，请检查网络连接".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
  pub title: String,
  /// Body used when a push arrives without a payload
  pub default_body: String,
  pub icon: String,
  pub badge: String,
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      title: "法语背单词".to_string(),
      default_body: "您有新的学习任务！".to_string(),
      icon: "/icon-192x192.png".to_string(),
      badge: "/icon-72x72.png".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./fvocab.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/fvocab/config.yaml
  ///
  /// Falls back to the built-in defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("fvocab.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("fvocab").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    Ok(config)
  }

  /// Resolve the data directory, falling back to the platform data dir.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("fvocab"))
  }

  pub fn storage_keys(&self) -> StorageKeys {
    StorageKeys::new(&self.storage_prefix)
  }

  pub fn cache_names(&self) -> CacheNames {
    CacheNames::new(&self.cache.app_name, &self.cache.version)
  }
}
