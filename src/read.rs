//! Read operations and role queries (one read transaction each)

use heed::RoTxn;

use crate::actor::PermissionUser;
use crate::constants::{SystemRole, NO_AUTHORITY};
use crate::db::{list_pfx, Dbs, Store};
use crate::error::{err, Error, Result};
use crate::keys::{override_key, override_prefix, parse_override, role_index_key};
use crate::role::{sort_by_weight, validate_part, Role, RoleId, UserId};

#[inline]
pub(crate) fn load_role(d: &Dbs, tx: &RoTxn, id: RoleId) -> Result<Option<Role>> {
    d.roles.get(tx, &id).map_err(err)
}

#[inline]
pub(crate) fn find_role_id(
    d: &Dbs,
    tx: &RoTxn,
    role: &str,
    board: Option<&str>,
    caste: Option<&str>,
) -> Result<Option<RoleId>> {
    d.role_index.get(tx, &role_index_key(role, board, caste)).map_err(err)
}

/// Direct overrides of one role as (permission key, allow)
pub(crate) fn override_rows(d: &Dbs, tx: &RoTxn, role: RoleId) -> Result<Vec<(String, bool)>> {
    let mut r = Vec::new();
    for item in d.overrides.prefix_iter(tx, &override_prefix(role)).map_err(err)? {
        let (k, v) = item.map_err(err)?;
        if let Some((_, p)) = parse_override(k) {
            r.push((p.to_string(), v != 0));
        }
    }
    r.sort();
    Ok(r)
}

fn load_all(d: &Dbs, tx: &RoTxn, ids: impl IntoIterator<Item = RoleId>) -> Result<Vec<Role>> {
    let mut r = Vec::new();
    for id in ids {
        if let Some(role) = load_role(d, tx, id)? {
            r.push(role);
        }
    }
    Ok(r)
}

fn scan_roles(d: &Dbs, tx: &RoTxn, mut keep: impl FnMut(&Role) -> bool) -> Result<Vec<Role>> {
    let mut r = Vec::new();
    for item in d.roles.iter(tx).map_err(err)? {
        let (_, role) = item.map_err(err)?;
        if keep(&role) {
            r.push(role);
        }
    }
    Ok(r)
}

impl Store {
    pub fn get_role(&self, id: RoleId) -> Result<Option<Role>> {
        self.read(|d, tx| load_role(d, tx, id))
    }

    /// Look up by (role, board, caste). Set parts must be 1-255 bytes.
    pub fn find_role(&self, role: &str, board: Option<&str>, caste: Option<&str>) -> Result<Option<Role>> {
        validate_part("role", role)?;
        for (what, v) in [("board_uri", board), ("caste", caste)] {
            if let Some(v) = v {
                validate_part(what, v)?;
            }
        }
        self.read(|d, tx| match find_role_id(d, tx, role, board, caste)? {
            Some(id) => load_role(d, tx, id),
            None => Ok(None),
        })
    }

    /// Every role, weight descending
    pub fn list_roles(&self) -> Result<Vec<Role>> {
        let mut r = self.read(|d, tx| scan_roles(d, tx, |_| true))?;
        sort_by_weight(&mut r);
        Ok(r)
    }

    /// Roles scoped to exactly this board (global roles excluded)
    pub fn roles_for_board(&self, board: &str) -> Result<Vec<Role>> {
        let mut r = self.read(|d, tx| scan_roles(d, tx, |role| role.board_uri.as_deref() == Some(board)))?;
        sort_by_weight(&mut r);
        Ok(r)
    }

    /// Direct override of one role, no inheritance walk. `None` when unset.
    pub fn get_permission(&self, role: RoleId, permission: &str) -> Result<Option<bool>> {
        self.registry().id(permission)?;
        self.read(|d, tx| Ok(d.overrides.get(tx, &override_key(role, permission)).map_err(err)?.map(|v| v != 0)))
    }

    /// Every direct override of a role, sorted by permission key
    pub fn overrides(&self, role: RoleId) -> Result<Vec<(String, bool)>> {
        self.read(|d, tx| override_rows(d, tx, role))
    }

    pub fn user_roles(&self, user: UserId) -> Result<Vec<Role>> {
        let mut r = self.read(|d, tx| {
            let ids = d.user_roles.list_fwd(tx, user)?;
            load_all(d, tx, ids)
        })?;
        sort_by_weight(&mut r);
        Ok(r)
    }

    pub fn role_users(&self, role: RoleId) -> Result<Vec<UserId>> {
        self.read(|d, tx| d.user_roles.list_rev(tx, role))
    }

    /// Roles in effect for a user on a board, weight descending. ANONYMOUS
    /// is always present; `user = None` yields only ANONYMOUS.
    pub fn roles_for_user_and_board(&self, user: Option<UserId>, board: Option<&str>) -> Result<Vec<Role>> {
        let mut r = self.read(|d, tx| {
            let mut roles = match user {
                Some(u) => {
                    let ids = d.user_roles.list_fwd(tx, u)?;
                    load_all(d, tx, ids)?
                }
                None => Vec::new(),
            };
            roles.retain(|role| role.applies_to(board));
            let anon = SystemRole::Anonymous.id();
            if !roles.iter().any(|role| role.id == anon) {
                roles.push(load_role(d, tx, anon)?.unwrap_or_else(|| Role::from_system(SystemRole::Anonymous)));
            }
            Ok(roles)
        })?;
        sort_by_weight(&mut r);
        Ok(r)
    }

    /// The role plus every role whose `inherit_id` is this role
    pub fn role_level(&self, id: RoleId) -> Result<Vec<Role>> {
        self.read(|d, tx| {
            let Some(role) = load_role(d, tx, id)? else {
                return Err(Error::InvalidReference(format!("role {} does not exist", id)));
            };
            let children = list_pfx(tx, &d.children, id)?;
            let mut r = vec![role];
            r.extend(load_all(d, tx, children)?);
            Ok(r)
        })
    }

    /// Roles the actor may act on for `board`: weight strictly below the
    /// actor's authority. Board authority covers that board's own roles;
    /// global authority also covers global roles (and every board when
    /// `board` is `None`).
    pub fn manageable_roles<U: PermissionUser + ?Sized>(&self, actor: &U, board: Option<&str>) -> Result<Vec<Role>> {
        let auth = actor.authority(self, board)?;
        if auth.weight == NO_AUTHORITY {
            return Ok(Vec::new());
        }
        let mut r = self.read(|d, tx| {
            scan_roles(d, tx, |role| role.weight < auth.weight && auth.covers(role, board))
        })?;
        sort_by_weight(&mut r);
        Ok(r)
    }
}
