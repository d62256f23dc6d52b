//! Database handles and the `Store` that owns them

use std::sync::Arc;

use byteorder::BigEndian;
use heed::types::{Bytes, SerdeJson, Str, U64, U8};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};

use crate::cache::MaskCache;
use crate::config::StoreConfig;
use crate::error::{err, Result};
use crate::keys::{key, key_suffix};
use crate::permission::Registry;
use crate::role::Role;
use crate::tx::Tx;

// Database type aliases
pub type Db = Database<Bytes, U64<BigEndian>>;
pub type DbRoles = Database<U64<BigEndian>, SerdeJson<Role>>;
pub type DbFlags = Database<Bytes, U8>;

/// Bidirectional index: fwd[a,b] and rev[b,a] stay in sync
pub struct BiPair {
    pub fwd: Db,
    pub rev: Db,
}

impl BiPair {
    #[inline]
    pub fn contains(&self, tx: &RoTxn, a: u64, b: u64) -> Result<bool> {
        Ok(self.fwd.get(tx, &key(a, b)).map_err(err)?.is_some())
    }

    #[inline]
    pub fn put(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<()> {
        self.fwd.put(tx, &key(a, b), &b).map_err(err)?;
        self.rev.put(tx, &key(b, a), &a).map_err(err)
    }

    #[inline]
    pub fn del(&self, tx: &mut RwTxn, a: u64, b: u64) -> Result<bool> {
        let r = self.fwd.delete(tx, &key(a, b)).map_err(err)?;
        self.rev.delete(tx, &key(b, a)).map_err(err)?;
        Ok(r)
    }

    pub fn list_fwd(&self, tx: &RoTxn, a: u64) -> Result<Vec<u64>> {
        list_pfx(tx, &self.fwd, a)
    }

    pub fn list_rev(&self, tx: &RoTxn, b: u64) -> Result<Vec<u64>> {
        list_pfx(tx, &self.rev, b)
    }
}

/// Second halves of every 16-byte key under `pfx`
pub(crate) fn list_pfx(tx: &RoTxn, db: &Db, pfx: u64) -> Result<Vec<u64>> {
    let mut r = Vec::new();
    for item in db.prefix_iter(tx, &pfx.to_be_bytes()).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if let Some(id) = key_suffix(k) {
            r.push(id);
        }
    }
    Ok(r)
}

/// All database handles
pub struct Dbs {
    /// role id -> record
    pub roles: DbRoles,
    /// (role, board, caste) -> role id
    pub role_index: Db,
    /// role id + permission -> 1 allow / 0 deny
    pub overrides: DbFlags,
    /// (parent, child) -> child
    pub children: Db,
    /// (user, role) / (role, user)
    pub user_roles: BiPair,
    pub meta: Database<Str, Str>,
}

/// Role store backed by one LMDB environment
pub struct Store {
    env: Env,
    dbs: Dbs,
    registry: Arc<Registry>,
    cache: MaskCache,
    config: StoreConfig,
}

impl Store {
    /// Open (or create) the environment described by `config`
    pub fn open(config: StoreConfig, registry: Registry) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let e = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_readers(config.max_readers)
                .max_dbs(7)
                .open(&config.path)
                .map_err(err)?
        };
        let mut tx = e.write_txn().map_err(err)?;
        let dbs = Dbs {
            roles: e.create_database(&mut tx, Some("roles")).map_err(err)?,
            role_index: e.create_database(&mut tx, Some("role_index")).map_err(err)?,
            overrides: e.create_database(&mut tx, Some("overrides")).map_err(err)?,
            children: e.create_database(&mut tx, Some("children")).map_err(err)?,
            user_roles: BiPair {
                fwd: e.create_database(&mut tx, Some("user_roles")).map_err(err)?,
                rev: e.create_database(&mut tx, Some("role_users")).map_err(err)?,
            },
            meta: e.create_database(&mut tx, Some("meta")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        tracing::info!(path = %config.path.display(), permissions = registry.len(), "role store opened");
        Ok(Store {
            env: e,
            dbs,
            registry: Arc::new(registry),
            cache: MaskCache::new(config.cache_masks, config.cache_capacity),
            config,
        })
    }

    /// Shorthand for [`Store::open`] with the default catalog
    pub fn open_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::open(StoreConfig::new(path), Registry::with_defaults())
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn cache(&self) -> &MaskCache {
        &self.cache
    }

    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Execute a read-only operation against one snapshot
    #[inline]
    pub fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    /// Run multiple writes in a single transaction. Cached masks depending
    /// on any touched role are dropped after commit.
    pub fn transact<T, F: FnOnce(&mut Tx) -> Result<T>>(&self, f: F) -> Result<T> {
        let txn = self.env.write_txn().map_err(err)?;
        let mut tx = Tx::new(txn, &self.dbs, &self.registry);
        let r = f(&mut tx)?;
        let touched = tx.commit()?;
        if !touched.is_empty() {
            let n = self.cache.invalidate(&touched);
            tracing::debug!(roles = ?touched, dropped = n, "mask cache invalidated");
        }
        Ok(r)
    }
}
