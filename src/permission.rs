//! Permission registry - the fixed catalog of permission keys

use std::collections::HashMap;

use crate::error::{Error, Result};

/// Dense identity of a registered permission (index into the catalog)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionId(pub u32);

impl PermissionId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Platform permission catalog
pub const DEFAULT_PERMISSIONS: &[&str] = &[
    "board.config",
    "board.create",
    "board.delete.other",
    "board.image.ban",
    "board.image.delete.other",
    "board.image.delete.self",
    "board.image.spoiler.other",
    "board.image.spoiler.upload",
    "board.image.upload.new",
    "board.image.upload.old",
    "board.images.ban",
    "board.logs",
    "board.post.bumplock",
    "board.post.create",
    "board.post.create.reply",
    "board.post.create.thread",
    "board.post.delete.other",
    "board.post.delete.self",
    "board.post.edit.other",
    "board.post.edit.self",
    "board.post.lock",
    "board.post.lock_bypass",
    "board.post.nocaptcha",
    "board.post.report",
    "board.post.sticky",
    "board.reassign",
    "board.user.ban.free",
    "board.user.ban.reason",
    "board.user.role",
    "board.user.unban",
    "site.board.view_unindexed",
    "site.image.ban",
    "site.pm",
    "site.post.report",
    "site.user.create",
    "site.user.merge",
    "sys.boards",
    "sys.cache",
    "sys.config",
    "sys.logs",
    "sys.payments",
    "sys.permissions",
    "sys.roles",
    "sys.tools",
    "sys.users",
];

/// Catalog of permission keys. Append-only; ids are assigned in
/// registration order and never reused.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    keys: Vec<String>,
    ids: HashMap<String, PermissionId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with [`DEFAULT_PERMISSIONS`]
    pub fn with_defaults() -> Self {
        let mut r = Self::new();
        for k in DEFAULT_PERMISSIONS {
            let registered = r.register(k);
            debug_assert!(registered.is_ok(), "malformed catalog key {}", k);
        }
        r
    }

    /// Register a key, returning its id. Registering an existing key
    /// returns the id it already has.
    pub fn register(&mut self, key: &str) -> Result<PermissionId> {
        if let Some(id) = self.ids.get(key) {
            return Ok(*id);
        }
        validate_key(key)?;
        let id = PermissionId(self.keys.len() as u32);
        self.keys.push(key.to_string());
        self.ids.insert(key.to_string(), id);
        Ok(id)
    }

    pub fn all(&self) -> Vec<PermissionId> {
        (0..self.keys.len() as u32).map(PermissionId).collect()
    }

    #[inline]
    pub fn exists(&self, key: &str) -> bool {
        self.ids.contains_key(key)
    }

    /// Resolve a key, failing with [`Error::UnknownPermission`]
    pub fn id(&self, key: &str) -> Result<PermissionId> {
        self.ids
            .get(key)
            .copied()
            .ok_or_else(|| Error::UnknownPermission(key.to_string()))
    }

    pub fn key(&self, id: PermissionId) -> Option<&str> {
        self.keys.get(id.index()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionId, &str)> {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, k)| (PermissionId(i as u32), k.as_str()))
    }
}

/// Dot-separated segments of `[a-z0-9_]`
fn validate_key(key: &str) -> Result<()> {
    let ok = !key.is_empty()
        && key.len() <= u8::MAX as usize
        && key.split('.').all(|seg| {
            !seg.is_empty()
                && seg
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
        });
    if ok {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("malformed permission key '{}'", key)))
    }
}
