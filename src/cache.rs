//! Compiled mask cache keyed by role-set fingerprint

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use sha2::{Digest, Sha256};

use crate::mask::CompiledMask;
use crate::role::RoleId;

pub type Fingerprint = [u8; 32];

/// SHA-256 over the ordered role ids
pub fn fingerprint(roles: &[RoleId]) -> Fingerprint {
    let mut h = Sha256::new();
    for id in roles {
        h.update(id.to_be_bytes());
    }
    h.finalize().into()
}

struct Entry {
    mask: Arc<CompiledMask>,
    /// Every role the mask was read from, ancestors included
    deps: Vec<RoleId>,
}

pub struct MaskCache {
    enabled: bool,
    capacity: usize,
    entries: RwLock<HashMap<Fingerprint, Entry>>,
    /// Bumped on every invalidation; inserts computed before a bump are dropped
    generation: AtomicU64,
}

impl MaskCache {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        MaskCache {
            enabled,
            capacity: capacity.max(1),
            entries: RwLock::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, fp: &Fingerprint) -> Option<Arc<CompiledMask>> {
        if !self.enabled {
            return None;
        }
        let entries = self.entries.read().unwrap_or_else(|p| p.into_inner());
        entries.get(fp).map(|e| e.mask.clone())
    }

    /// Store a mask compiled from a snapshot taken at `generation`
    pub fn insert(&self, fp: Fingerprint, mask: Arc<CompiledMask>, deps: Vec<RoleId>, generation: u64) {
        if !self.enabled {
            return;
        }
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        if self.generation() != generation {
            return;
        }
        if entries.len() >= self.capacity && !entries.contains_key(&fp) {
            tracing::debug!(capacity = self.capacity, "mask cache full, clearing");
            entries.clear();
        }
        entries.insert(fp, Entry { mask, deps });
    }

    /// Drop every entry that read from any of `roles`. Returns how many.
    pub fn invalidate(&self, roles: &[RoleId]) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        let before = entries.len();
        entries.retain(|_, e| !e.deps.iter().any(|d| roles.contains(d)));
        before - entries.len()
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(|p| p.into_inner());
        self.generation.fetch_add(1, Ordering::AcqRel);
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::Registry;

    fn mask() -> Arc<CompiledMask> {
        Arc::new(CompiledMask::deny_all(Arc::new(Registry::with_defaults())))
    }

    #[test]
    fn fingerprint_depends_on_order_and_members() {
        assert_eq!(fingerprint(&[3, 1]), fingerprint(&[3, 1]));
        assert_ne!(fingerprint(&[3, 1]), fingerprint(&[1, 3]));
        assert_ne!(fingerprint(&[3, 1]), fingerprint(&[3]));
    }

    #[test]
    fn invalidate_drops_dependents_only() {
        let c = MaskCache::new(true, 16);
        let g = c.generation();
        c.insert(fingerprint(&[10, 1]), mask(), vec![10, 4, 1], g);
        c.insert(fingerprint(&[7, 1]), mask(), vec![7, 1], g);
        assert_eq!(c.len(), 2);
        assert_eq!(c.invalidate(&[4]), 1);
        assert!(c.get(&fingerprint(&[10, 1])).is_none());
        assert!(c.get(&fingerprint(&[7, 1])).is_some());
    }

    #[test]
    fn stale_insert_is_dropped() {
        let c = MaskCache::new(true, 16);
        let g = c.generation();
        c.invalidate(&[1]);
        c.insert(fingerprint(&[1]), mask(), vec![1], g);
        assert!(c.is_empty());
    }

    #[test]
    fn disabled_cache_stores_nothing() {
        let c = MaskCache::new(false, 16);
        c.insert(fingerprint(&[1]), mask(), vec![1], c.generation());
        assert!(c.get(&fingerprint(&[1])).is_none());
        assert!(c.is_empty());
    }

    #[test]
    fn capacity_bound_clears() {
        let c = MaskCache::new(true, 2);
        let g = c.generation();
        for i in 0..3u64 {
            c.insert(fingerprint(&[i]), mask(), vec![i], g);
        }
        assert_eq!(c.len(), 1);
        assert!(c.get(&fingerprint(&[2])).is_some());
    }
}
