//! Transaction wrapper for role store writes

use heed::RwTxn;

use crate::constants::{SystemRole, BOARD_OWNER_WEIGHT_OFFSET, FIRST_CUSTOM_ROLE_ID, MAX_INHERITANCE_DEPTH};
use crate::db::{list_pfx, Dbs};
use crate::error::{err, Error, Result};
use crate::keys::{key, override_key, override_prefix, role_index_key};
use crate::permission::Registry;
use crate::read::{find_role_id, load_role};
use crate::role::{validate_part, PermissionValue, Role, RoleId, RoleSpec, UserId};

/// Transaction wrapper for batched writes. Obtain one through
/// [`Store::transact`](crate::Store::transact).
pub struct Tx<'s> {
    txn: RwTxn<'s>,
    dbs: &'s Dbs,
    registry: &'s Registry,
    touched: Vec<RoleId>,
}

impl<'s> Tx<'s> {
    pub(crate) fn new(txn: RwTxn<'s>, dbs: &'s Dbs, registry: &'s Registry) -> Self {
        Tx { txn, dbs, registry, touched: Vec::new() }
    }

    /// Commit, returning every role id whose cached masks are now stale
    pub(crate) fn commit(self) -> Result<Vec<RoleId>> {
        self.txn.commit().map_err(err)?;
        let mut touched = self.touched;
        touched.sort_unstable();
        touched.dedup();
        Ok(touched)
    }

    /// Mark a role and its direct inheritors stale
    fn touch(&mut self, id: RoleId) -> Result<()> {
        self.touched.push(id);
        let children = list_pfx(&self.txn, &self.dbs.children, id)?;
        self.touched.extend(children);
        Ok(())
    }

    fn require_role(&self, id: RoleId) -> Result<Role> {
        load_role(self.dbs, &self.txn, id)?
            .ok_or_else(|| Error::InvalidReference(format!("role {} does not exist", id)))
    }

    fn require_mutable(&self, id: RoleId) -> Result<Role> {
        let r = self.require_role(id)?;
        if r.system {
            return Err(Error::ProtectedRole(id));
        }
        Ok(r)
    }

    fn put_role(&mut self, r: &Role) -> Result<()> {
        self.dbs.roles.put(&mut self.txn, &r.id, r).map_err(err)
    }

    fn next_id(&self) -> Result<RoleId> {
        match self.dbs.meta.get(&self.txn, "next_id").map_err(err)? {
            Some(s) => s
                .parse()
                .map_err(|_| Error::Storage(format!("corrupt next_id value '{}'", s))),
            None => Ok(FIRST_CUSTOM_ROLE_ID),
        }
    }

    fn set_next_id(&mut self, id: RoleId) -> Result<()> {
        self.dbs.meta.put(&mut self.txn, "next_id", &id.to_string()).map_err(err)
    }

    /// Insert a role record with its index and inheritance edge
    fn insert(&mut self, r: &Role) -> Result<()> {
        let ik = role_index_key(&r.role, r.board_uri.as_deref(), r.caste.as_deref());
        self.dbs.role_index.put(&mut self.txn, &ik, &r.id).map_err(err)?;
        if let Some(p) = r.inherit_id {
            self.dbs.children.put(&mut self.txn, &key(p, r.id), &r.id).map_err(err)?;
        }
        self.put_role(r)
    }

    /// Create a role. Fails on a duplicate (role, board, caste) or a
    /// dangling `inherit_id`.
    pub fn create_role(&mut self, spec: RoleSpec) -> Result<Role> {
        spec.validate()?;
        if let Some(existing) = find_role_id(
            self.dbs,
            &self.txn,
            &spec.role,
            spec.board_uri.as_deref(),
            spec.caste.as_deref(),
        )? {
            return Err(Error::DuplicateRole {
                role: spec.role,
                board: spec.board_uri,
                caste: spec.caste,
                existing,
            });
        }
        if let Some(p) = spec.inherit_id {
            let parent = load_role(self.dbs, &self.txn, p)?;
            let Some(parent) = parent else {
                return Err(Error::InvalidReference(format!("inherit_id {} does not exist", p)));
            };
            // the new role sits one link below its parent's chain
            if self.ancestor_count(parent.id)? + 1 > MAX_INHERITANCE_DEPTH {
                return Err(Error::InvalidReference(format!("inheritance chain through {} is too deep", p)));
            }
        }
        let id = self.next_id()?;
        self.set_next_id(id + 1)?;
        let r = spec.into_role(id);
        self.insert(&r)?;
        self.touch(id)?;
        tracing::info!(id, role = %r.role, board = ?r.board_uri, weight = r.weight, "role created");
        Ok(r)
    }

    /// The per-board owner role, created on first use. LMDB admits one
    /// writer at a time, so lookup and insert cannot interleave with
    /// another caller's.
    pub fn get_or_create_board_owner_role(&mut self, board: &str) -> Result<Role> {
        validate_part("board_uri", board)?;
        let owner = SystemRole::Owner;
        if let Some(id) = find_role_id(self.dbs, &self.txn, owner.role(), Some(board), None)? {
            return self.require_role(id);
        }
        let spec = RoleSpec {
            role: owner.role().to_string(),
            board_uri: Some(board.to_string()),
            caste: None,
            name: owner.name(),
            capcode: Some(owner.name()),
            inherit_id: Some(owner.id()),
            weight: owner.weight() + BOARD_OWNER_WEIGHT_OFFSET,
        };
        let r = self.create_role(spec)?;
        tracing::info!(id = r.id, board, "board owner role created");
        Ok(r)
    }

    /// Set, replace or clear (`Unset`) one override
    pub fn set_permission(&mut self, role: RoleId, permission: &str, value: PermissionValue) -> Result<()> {
        self.registry.id(permission)?;
        self.require_role(role)?;
        let k = override_key(role, permission);
        match value.as_option() {
            Some(v) => self.dbs.overrides.put(&mut self.txn, &k, &(v as u8)).map_err(err)?,
            None => {
                self.dbs.overrides.delete(&mut self.txn, &k).map_err(err)?;
            }
        }
        self.touch(role)
    }

    /// Delete a non-system role with its overrides and assignments.
    /// Roles inheriting from it are detached.
    pub fn delete_role(&mut self, id: RoleId) -> Result<Role> {
        let r = self.require_mutable(id)?;
        self.touch(id)?;

        let mut rows = Vec::new();
        for item in self.dbs.overrides.prefix_iter(&self.txn, &override_prefix(id)).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            rows.push(k.to_vec());
        }
        for k in &rows {
            self.dbs.overrides.delete(&mut self.txn, k).map_err(err)?;
        }

        for user in self.dbs.user_roles.list_rev(&self.txn, id)? {
            self.dbs.user_roles.del(&mut self.txn, user, id)?;
        }

        for child in list_pfx(&self.txn, &self.dbs.children, id)? {
            if let Some(mut c) = load_role(self.dbs, &self.txn, child)? {
                tracing::warn!(child, parent = id, "detaching role from deleted parent");
                c.inherit_id = None;
                self.put_role(&c)?;
            }
            self.dbs.children.delete(&mut self.txn, &key(id, child)).map_err(err)?;
        }
        if let Some(p) = r.inherit_id {
            self.dbs.children.delete(&mut self.txn, &key(p, id)).map_err(err)?;
        }

        let ik = role_index_key(&r.role, r.board_uri.as_deref(), r.caste.as_deref());
        self.dbs.role_index.delete(&mut self.txn, &ik).map_err(err)?;
        self.dbs.roles.delete(&mut self.txn, &id).map_err(err)?;
        tracing::info!(id, role = %r.role, board = ?r.board_uri, rows = rows.len(), "role deleted");
        Ok(r)
    }

    /// Re-parent a role (`None` clears inheritance)
    pub fn set_inherit(&mut self, id: RoleId, parent: Option<RoleId>) -> Result<()> {
        let mut r = self.require_mutable(id)?;
        if let Some(p) = parent {
            self.require_role(p)?;
            self.no_cycle(id, p)?;
            // the moved subtree hangs one link below p's chain
            let below = self.descendant_depth(id)?;
            if self.ancestor_count(p)? + 1 + below > MAX_INHERITANCE_DEPTH {
                return Err(Error::InvalidReference(format!(
                    "re-parenting {} under {} makes an inheritance chain deeper than {}",
                    id, p, MAX_INHERITANCE_DEPTH
                )));
            }
        }
        if let Some(old) = r.inherit_id {
            self.dbs.children.delete(&mut self.txn, &key(old, id)).map_err(err)?;
        }
        if let Some(p) = parent {
            self.dbs.children.put(&mut self.txn, &key(p, id), &id).map_err(err)?;
        }
        r.inherit_id = parent;
        self.put_role(&r)?;
        self.touch(id)
    }

    pub fn set_weight(&mut self, id: RoleId, weight: i64) -> Result<()> {
        let mut r = self.require_mutable(id)?;
        r.weight = weight;
        self.put_role(&r)?;
        self.touch(id)
    }

    pub fn assign_role(&mut self, user: UserId, role: RoleId) -> Result<()> {
        self.require_role(role)?;
        self.dbs.user_roles.put(&mut self.txn, user, role)
    }

    pub fn unassign_role(&mut self, user: UserId, role: RoleId) -> Result<bool> {
        self.dbs.user_roles.del(&mut self.txn, user, role)
    }

    /// Links above `id` until the chain ends
    fn ancestor_count(&self, id: RoleId) -> Result<usize> {
        let mut n = 0;
        let mut cur = load_role(self.dbs, &self.txn, id)?.and_then(|r| r.inherit_id);
        while let Some(p) = cur {
            n += 1;
            if n > MAX_INHERITANCE_DEPTH {
                break;
            }
            cur = load_role(self.dbs, &self.txn, p)?.and_then(|r| r.inherit_id);
        }
        Ok(n)
    }

    /// Links below `id` to its deepest descendant
    fn descendant_depth(&self, id: RoleId) -> Result<usize> {
        let mut level = vec![id];
        let mut depth = 0;
        loop {
            let mut next = Vec::new();
            for r in &level {
                next.extend(list_pfx(&self.txn, &self.dbs.children, *r)?);
            }
            if next.is_empty() || depth > MAX_INHERITANCE_DEPTH {
                return Ok(depth);
            }
            depth += 1;
            level = next;
        }
    }

    fn no_cycle(&self, from: RoleId, to: RoleId) -> Result<()> {
        if from == to {
            return Err(Error::InvalidReference("role cannot inherit from itself".into()));
        }
        let mut cur = to;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            match load_role(self.dbs, &self.txn, cur)?.and_then(|r| r.inherit_id) {
                Some(p) if p == from => {
                    return Err(Error::InvalidReference(format!("circular inheritance {} -> {}", from, to)))
                }
                Some(p) => cur = p,
                None => return Ok(()),
            }
        }
        Err(Error::InvalidReference(format!("inheritance chain through {} is too deep", to)))
    }

    /// Write the system catalog. Returns false when it is already present.
    pub(crate) fn seed(&mut self) -> Result<bool> {
        if self.dbs.meta.get(&self.txn, "seeded").map_err(err)?.is_some() {
            return Ok(false);
        }
        for sr in SystemRole::ALL {
            let r = Role::from_system(sr);
            if let Some(existing) = find_role_id(self.dbs, &self.txn, &r.role, None, None)? {
                if existing != r.id {
                    return Err(Error::DuplicateRole { role: r.role, board: None, caste: None, existing });
                }
            }
            self.insert(&r)?;
            let defaults: Vec<(String, bool)> = match sr {
                SystemRole::Absolute => self.registry.iter().map(|(_, k)| (k.to_string(), true)).collect(),
                _ => sr.default_overrides().iter().map(|(k, v)| (k.to_string(), *v)).collect(),
            };
            for (k, v) in defaults {
                if !self.registry.exists(&k) {
                    tracing::debug!(permission = %k, role = sr.role(), "default override skipped: not registered");
                    continue;
                }
                self.dbs.overrides.put(&mut self.txn, &override_key(sr.id(), &k), &(v as u8)).map_err(err)?;
            }
            self.touch(sr.id())?;
        }
        if self.dbs.meta.get(&self.txn, "next_id").map_err(err)?.is_none() {
            self.set_next_id(FIRST_CUSTOM_ROLE_ID)?;
        }
        self.dbs.meta.put(&mut self.txn, "seeded", "1").map_err(err)?;
        Ok(true)
    }
}
