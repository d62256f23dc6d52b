//! System role seeding

use crate::constants::SystemRole;
use crate::db::Store;
use crate::error::{err, Result};

impl Store {
    /// Whether the system roles have been written
    pub fn is_seeded(&self) -> Result<bool> {
        self.read(|d, tx| Ok(d.meta.get(tx, "seeded").map_err(err)?.is_some()))
    }

    /// Write the eight system roles with their fixed ids, weights and
    /// default overrides. Returns false if already seeded.
    pub fn seed(&self) -> Result<bool> {
        let seeded = self.transact(|tx| tx.seed())?;
        if seeded {
            tracing::info!(roles = SystemRole::ALL.len(), "system roles seeded");
        }
        Ok(seeded)
    }

    /// Open-and-seed in one step
    pub fn open_seeded(config: crate::StoreConfig, registry: crate::Registry) -> Result<Self> {
        let s = Store::open(config, registry)?;
        s.seed()?;
        Ok(s)
    }
}
