use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::endpoint::Endpoint;

/// User overrides read from `config.toml` in the platform config directory.
#[derive(Deserialize, Default, Debug, PartialEq)]
pub struct Config {
  /// Replaces the built-in endpoint list when present.
  pub endpoints: Option<Vec<Endpoint>>,
  /// Endpoint selected at startup.
  pub default_endpoint: Option<String>,
  pub play_delay_ms: Option<u64>,
  /// "light", "dark" or "auto".
  pub theme: Option<String>,
}

impl Config {
  /// A missing file yields the defaults; an unreadable or invalid one is an error.
  pub fn load() -> Result<Self> {
    let Some(proj_dirs) = ProjectDirs::from("", "", "vp") else {
      return Ok(Self::default());
    };
    Self::load_from(&proj_dirs.config_dir().join("config.toml"))
  }

  pub fn load_from(path: &Path) -> Result<Self> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let config = toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))?;
    info!(path = %path.display(), "config: loaded");
    Ok(config)
  }
}
