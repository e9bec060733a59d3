//! Key-value persistence — where the configuration document lives between runs.
//!
//! The document is kept as a JSON string under [`CONFIG_KEY`]. [`FileStore`]
//! holds every key in one JSON object file; [`MemoryStore`] is for tests and
//! one-shot use.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{HueStatusError, Result};

/// Key the configuration document is stored under.
pub const CONFIG_KEY: &str = "config";

pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

// ── File store ──

/// All keys in one JSON object file, rewritten atomically on every `set`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Platform-specific data directory.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("huestatus"))
    }

    /// Default store file.
    pub fn default_path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("store.json"))
    }

    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, String> = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                HueStatusError::Store(format!("{}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(FileStore { path, entries })
    }

    /// Open the store at the default platform path.
    pub fn open_default() -> Result<Self> {
        let path = Self::default_path().ok_or_else(|| {
            HueStatusError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No config directory",
            ))
        })?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let contents = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| HueStatusError::Store(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &contents)?;
        match std::fs::rename(&tmp, &self.path) {
            Ok(()) => Ok(()),
            Err(_) => {
                // Rename can fail across filesystems.
                let result = std::fs::write(&self.path, &contents);
                let _ = std::fs::remove_file(&tmp);
                Ok(result?)
            }
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.save()
    }
}

// ── Memory store ──

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ── Config persistence ──

/// Load the stored configuration, or an empty one if nothing is stored yet.
pub fn load_config(store: &impl KvStore) -> Result<Config> {
    match store.get(CONFIG_KEY)? {
        None => Ok(Config::default()),
        Some(text) => Config::from_json(&text)
            .map_err(|e| HueStatusError::Store(format!("stored configuration rejected: {e}"))),
    }
}

pub fn save_config(store: &mut impl KvStore, config: &Config) -> Result<()> {
    log::debug!("[store] saving configuration ({} bridges)", config.bridges().len());
    store.set(CONFIG_KEY, &config.to_document().to_string())
}
