use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

use crate::constants::constants;

/// Environment variable that overrides `api_key` from `prefs.toml`.
pub const API_KEY_ENV: &str = "YOUTUBE_API_KEY";

pub fn project_dirs() -> Option<ProjectDirs> {
  ProjectDirs::from("", "", "tubeshelf")
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
  pub api_key: Option<String>,
  pub region_code: Option<String>,
  pub data_dir: Option<PathBuf>,
  pub recommendation_limit: Option<usize>,
  pub seed_notifications: Option<bool>,
}

impl Config {
  /// `prefs.toml` from the platform config dir plus env overrides. Missing or unreadable files give defaults.
  pub fn load() -> Self {
    let config = Self::config_file()
      .and_then(|path| std::fs::read_to_string(path).ok())
      .and_then(|content| match Self::from_toml_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
          warn!(err = %e, "config: ignoring unreadable prefs.toml");
          None
        }
      })
      .unwrap_or_default();
    config.with_env_overrides(|name| std::env::var(name).ok())
  }

  pub fn from_toml_str(content: &str) -> Result<Self> {
    toml::from_str(content).context("Failed to parse prefs.toml")
  }

  pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
      self.api_key = Some(key);
    }
    self
  }

  pub fn config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("prefs.toml"))
  }

  pub fn save(&self) -> Result<()> {
    let path = Self::config_file().context("No home directory to store prefs.toml in")?;
    if let Some(dir) = path.parent() {
      std::fs::create_dir_all(dir).context("Failed to create config directory")?;
    }
    let content = toml::to_string(self).context("Failed to serialize config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
  }

  /// The configured API key, ignoring blank values.
  pub fn api_key(&self) -> Option<&str> {
    self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
  }

  pub fn region(&self) -> &str {
    self.region_code.as_deref().unwrap_or(&constants().default_region)
  }

  /// Where the stores keep their files: `data_dir` if set, else the platform data dir.
  pub fn data_dir(&self) -> Option<PathBuf> {
    self.data_dir.clone().or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
  }

  pub fn recommendation_limit(&self) -> usize {
    self.recommendation_limit.unwrap_or(constants().recommendation_limit)
  }

  pub fn seeds_notifications(&self) -> bool {
    self.seed_notifications.unwrap_or(true)
  }
}
