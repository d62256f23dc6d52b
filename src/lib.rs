//! boardroles - weighted, board-scoped roles compiled into permission masks
//!
//! Roles carry allow/deny overrides for named permissions and may inherit
//! from one parent role. A user's roles for a board (plus the anonymous
//! floor) compile into a [`CompiledMask`]: the highest-weight role with an
//! opinion on a permission decides it, and silence everywhere denies.
//!
//! Storage patterns (LMDB):
//! - `role id` → role record
//! - `role/board/caste` → role id (uniqueness)
//! - `role id + permission` → allow/deny
//! - `parent/child` → child (inheritance index)
//! - `user/role` and `role/user` (assignments)

mod bootstrap;
mod read;
mod write;

pub mod actor;
pub mod cache;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod graph;
pub mod keys;
pub mod mask;
pub mod permission;
pub mod role;
pub mod tx;

pub use actor::{Actor, Authority, PermissionUser};
pub use cache::MaskCache;
pub use config::StoreConfig;
pub use constants::{SystemRole, MAX_INHERITANCE_DEPTH, NO_AUTHORITY};
pub use db::Store;
pub use error::{Error, Result};
pub use graph::RoleGraph;
pub use mask::{compile, CompiledMask};
pub use permission::{PermissionId, Registry, DEFAULT_PERMISSIONS};
pub use role::{PermissionValue, Role, RoleId, RoleSpec, UserId};
pub use tx::Tx;
