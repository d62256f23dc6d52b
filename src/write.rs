//! Single-operation write API. Each call is its own transaction; use
//! [`Store::transact`] to batch several.

use crate::db::Store;
use crate::error::Result;
use crate::role::{PermissionValue, Role, RoleId, RoleSpec, UserId};

impl Store {
    /// Create a role; see [`Tx::create_role`](crate::Tx::create_role)
    pub fn create_role(&self, spec: RoleSpec) -> Result<Role> {
        self.transact(|tx| tx.create_role(spec))
    }

    /// Idempotent per board, including under concurrent callers
    pub fn get_or_create_board_owner_role(&self, board: &str) -> Result<Role> {
        self.transact(|tx| tx.get_or_create_board_owner_role(board))
    }

    pub fn set_permission(&self, role: RoleId, permission: &str, value: impl Into<PermissionValue>) -> Result<()> {
        let value = value.into();
        self.transact(|tx| tx.set_permission(role, permission, value))
    }

    /// Delete a non-system role
    pub fn delete_role(&self, id: RoleId) -> Result<Role> {
        self.transact(|tx| tx.delete_role(id))
    }

    pub fn set_inherit(&self, id: RoleId, parent: Option<RoleId>) -> Result<()> {
        self.transact(|tx| tx.set_inherit(id, parent))
    }

    pub fn set_weight(&self, id: RoleId, weight: i64) -> Result<()> {
        self.transact(|tx| tx.set_weight(id, weight))
    }

    pub fn assign_role(&self, user: UserId, role: RoleId) -> Result<()> {
        self.transact(|tx| tx.assign_role(user, role))
    }

    pub fn unassign_role(&self, user: UserId, role: RoleId) -> Result<bool> {
        self.transact(|tx| tx.unassign_role(user, role))
    }
}
