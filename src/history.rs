//! Recent-playback history persisted to a key-value store.
//!
//! The whole list is serialized as one JSON array under a fixed key and
//! overwritten on every record. Most-recent first, deduplicated by URL,
//! capped at `history_capacity` entries.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::constants::constants;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
  /// Creation time in milliseconds; unique and strictly decreasing along the list.
  pub id: i64,
  pub url: String,
  pub endpoint_name: String,
  pub created_at: String,
}

// --- Storage ---

/// Durable string storage addressed by key.
pub trait KeyValueStore {
  fn get(&self, key: &str) -> Result<Option<String>>;
  fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per key inside a directory.
pub struct FileStore {
  dir: PathBuf,
}

impl FileStore {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Store rooted at the platform data directory.
  pub fn open_default() -> Result<Self> {
    let proj_dirs = ProjectDirs::from("", "", "vp").context("Could not determine a home directory")?;
    Ok(Self::new(proj_dirs.data_dir()))
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{}.json", key))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    let path = self.path_for(key);
    match std::fs::read_to_string(&path) {
      Ok(content) => Ok(Some(content)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
  }

  fn set(&mut self, key: &str, value: &str) -> Result<()> {
    std::fs::create_dir_all(&self.dir).with_context(|| format!("Failed to create {}", self.dir.display()))?;
    let path = self.path_for(key);
    // Sibling temp file + rename: readers never observe a partial list.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, value).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
  }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
  values: HashMap<String, String>,
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.values.get(key).cloned())
  }

  fn set(&mut self, key: &str, value: &str) -> Result<()> {
    self.values.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

// --- History ---

pub struct HistoryStore {
  kv: Box<dyn KeyValueStore>,
  key: String,
  capacity: usize,
  entries: Vec<HistoryEntry>,
}

impl HistoryStore {
  /// Read the persisted list. Missing or malformed payloads start an empty history.
  pub fn load(kv: Box<dyn KeyValueStore>) -> Self {
    let c = constants();
    Self::load_with(kv, &c.history_key, c.history_capacity)
  }

  fn load_with(kv: Box<dyn KeyValueStore>, key: &str, capacity: usize) -> Self {
    let entries = match kv.get(key) {
      Ok(Some(raw)) => match serde_json::from_str::<Vec<HistoryEntry>>(&raw) {
        Ok(mut entries) => {
          entries.truncate(capacity);
          entries
        }
        Err(e) => {
          warn!(err = %e, "history: stored payload is malformed, starting empty");
          Vec::new()
        }
      },
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(err = %e, "history: read failed, starting empty");
        Vec::new()
      }
    };
    debug!(count = entries.len(), "history: loaded");
    Self { kv, key: key.to_string(), capacity, entries }
  }

  pub fn entries(&self) -> &[HistoryEntry] {
    &self.entries
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn record(&mut self, url: &str, endpoint_name: &str) -> Result<&[HistoryEntry]> {
    self.record_at(url, endpoint_name, Local::now())
  }

  /// Insert at the front, dropping any earlier entry for the same URL, and persist.
  ///
  /// The in-memory list is updated even when the write fails.
  pub fn record_at(&mut self, url: &str, endpoint_name: &str, now: DateTime<Local>) -> Result<&[HistoryEntry]> {
    let mut id = now.timestamp_millis();
    if let Some(front) = self.entries.first()
      && id <= front.id
    {
      id = front.id + 1;
    }
    let entry = HistoryEntry {
      id,
      url: url.to_string(),
      endpoint_name: endpoint_name.to_string(),
      created_at: now.format(TIMESTAMP_FORMAT).to_string(),
    };

    self.entries.retain(|e| e.url != url);
    self.entries.insert(0, entry);
    self.entries.truncate(self.capacity);

    let payload = serde_json::to_string(&self.entries).context("Failed to serialize history")?;
    self.kv.set(&self.key, &payload).context("Failed to persist history")?;
    debug!(url = %url, count = self.entries.len(), "history: recorded");
    Ok(&self.entries)
  }
}
