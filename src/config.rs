//! Store configuration

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Settings for opening a [`Store`](crate::Store)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// LMDB environment directory (created if missing)
    pub path: PathBuf,
    /// Maximum size of the memory map in bytes
    pub map_size: usize,
    pub max_readers: u32,
    /// Cache compiled masks by role-set fingerprint
    pub cache_masks: bool,
    /// Entries kept before the cache is emptied
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            path: PathBuf::from("boardroles.mdb"),
            map_size: 1 << 30,
            max_readers: 126,
            cache_masks: true,
            cache_capacity: 4096,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        StoreConfig {
            path: path.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let c: StoreConfig = serde_json::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        c.validate()?;
        Ok(c)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&s)
    }

    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::Config("path must not be empty".into()));
        }
        if self.map_size < 1 << 20 {
            return Err(Error::Config(format!("map_size {} is below 1 MiB", self.map_size)));
        }
        if self.max_readers == 0 {
            return Err(Error::Config("max_readers must be positive".into()));
        }
        Ok(())
    }
}
