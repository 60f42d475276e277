use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

/// Durable client-local string key-value store.
///
/// Entries live in memory and every mutation is written through to a
/// JSON file. A missing or unreadable file starts out empty.
#[derive(Debug)]
pub struct LocalStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl LocalStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read_entries(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Discarding unreadable storage file");
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    fn read_entries(path: &Path) -> Result<BTreeMap<String, String>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = std::fs::read_to_string(path).context("Failed to read storage file")?;
        serde_json::from_str(&contents).context("Failed to parse storage file")
    }

    pub fn get_item(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, contents)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}
