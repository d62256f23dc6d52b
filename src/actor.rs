//! Actors that permission questions are asked about

use std::sync::Arc;

use crate::constants::{SystemRole, NO_AUTHORITY};
use crate::db::Store;
use crate::error::Result;
use crate::mask::CompiledMask;
use crate::role::{Role, UserId};

/// Grants global (ADMIN) authority
pub const SYS_CONFIG: &str = "sys.config";
/// Grants board (OWNER) authority
pub const BOARD_CONFIG: &str = "board.config";

/// How far an actor reaches when managing roles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authority {
    /// Roles strictly below this weight are manageable
    pub weight: i64,
    /// Held site-wide rather than through a board role
    pub global: bool,
}

impl Authority {
    pub const NONE: Authority = Authority { weight: NO_AUTHORITY, global: false };

    /// Whether `role` falls in this authority's scope for `board`
    pub fn covers(&self, role: &Role, board: Option<&str>) -> bool {
        match (self.global, board) {
            (true, None) => true,
            (true, Some(b)) => role.applies_to(Some(b)),
            (false, Some(b)) => role.board_uri.as_deref() == Some(b),
            (false, None) => false,
        }
    }
}

/// Anything that holds roles: an authenticated user or an anonymous visitor
pub trait PermissionUser {
    /// `None` for anonymous visitors
    fn user_id(&self) -> Option<UserId>;

    fn is_anonymous(&self) -> bool {
        self.user_id().is_none()
    }

    fn roles(&self, store: &Store, board: Option<&str>) -> Result<Vec<Role>> {
        store.roles_for_user_and_board(self.user_id(), board)
    }

    fn mask(&self, store: &Store, board: Option<&str>) -> Result<Arc<CompiledMask>> {
        store.compile_mask(&self.roles(store, board)?)
    }

    fn can(&self, store: &Store, permission: &str, board: Option<&str>) -> Result<bool> {
        self.mask(store, board)?.allows(permission)
    }

    /// ADMIN weight when the site-wide mask allows `sys.config`, OWNER
    /// weight when the board mask allows `board.config`, otherwise none.
    /// A registry without those keys yields no authority.
    fn authority(&self, store: &Store, board: Option<&str>) -> Result<Authority> {
        if matches!(self.mask(store, None)?.allows(SYS_CONFIG), Ok(true)) {
            return Ok(Authority { weight: SystemRole::Admin.weight(), global: true });
        }
        if let Some(b) = board {
            if matches!(self.mask(store, Some(b))?.allows(BOARD_CONFIG), Ok(true)) {
                return Ok(Authority { weight: SystemRole::Owner.weight(), global: false });
            }
        }
        Ok(Authority::NONE)
    }

    fn authority_weight(&self, store: &Store, board: Option<&str>) -> Result<i64> {
        Ok(self.authority(store, board)?.weight)
    }

    /// Strictly lower weight, and in scope for `board`
    fn can_manage(&self, store: &Store, board: Option<&str>, role: &Role) -> Result<bool> {
        let auth = self.authority(store, board)?;
        Ok(auth.weight != NO_AUTHORITY && role.weight < auth.weight && auth.covers(role, board))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    Authenticated(UserId),
    Anonymous,
}

impl PermissionUser for Actor {
    fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Authenticated(id) => Some(*id),
            Actor::Anonymous => None,
        }
    }
}

impl From<Option<UserId>> for Actor {
    fn from(v: Option<UserId>) -> Self {
        v.map_or(Actor::Anonymous, Actor::Authenticated)
    }
}
