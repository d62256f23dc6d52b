//! Role records and the per-permission override value

use serde::{Deserialize, Serialize};

use crate::constants::SystemRole;
use crate::error::{Error, Result};

pub type RoleId = u64;
pub type UserId = u64;

/// A stored role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Group name; unique only together with `board_uri` and `caste`
    pub role: String,
    /// `None` applies to every board
    pub board_uri: Option<String>,
    pub caste: Option<String>,
    /// Display key
    pub name: String,
    pub capcode: Option<String>,
    pub inherit_id: Option<RoleId>,
    pub system: bool,
    pub weight: i64,
}

impl Role {
    #[inline]
    pub fn is_system(&self) -> bool {
        self.system
    }

    #[inline]
    pub fn is_global(&self) -> bool {
        self.board_uri.is_none()
    }

    /// Whether this role is in effect for `board` (`None` = site-wide context)
    pub fn applies_to(&self, board: Option<&str>) -> bool {
        match (&self.board_uri, board) {
            (None, _) => true,
            (Some(b), Some(ctx)) => b == ctx,
            (Some(_), None) => false,
        }
    }

    /// Capcode shown next to posts; anonymous never shows one
    pub fn display_capcode(&self) -> Option<&str> {
        if self.id == SystemRole::Anonymous.id() {
            return None;
        }
        self.capcode.as_deref()
    }

    pub(crate) fn from_system(r: SystemRole) -> Self {
        Role {
            id: r.id(),
            role: r.role().to_string(),
            board_uri: None,
            caste: None,
            name: r.name(),
            capcode: match r {
                SystemRole::Anonymous | SystemRole::Registered | SystemRole::Unaccountable => None,
                _ => Some(r.name()),
            },
            inherit_id: None,
            system: true,
            weight: r.weight(),
        }
    }
}

/// Weight descending, then id ascending
pub fn sort_by_weight(roles: &mut [Role]) {
    roles.sort_by(|a, b| b.weight.cmp(&a.weight).then(a.id.cmp(&b.id)));
}

/// Index key parts are 1-255 bytes; an empty part is how `None` is stored
pub(crate) fn validate_part(what: &str, v: &str) -> Result<()> {
    if v.is_empty() || v.len() > u8::MAX as usize {
        return Err(Error::InvalidInput(format!("{} must be 1-255 bytes", what)));
    }
    Ok(())
}

/// Fields for a new role. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoleSpec {
    pub role: String,
    pub board_uri: Option<String>,
    pub caste: Option<String>,
    pub name: String,
    pub capcode: Option<String>,
    pub inherit_id: Option<RoleId>,
    pub weight: i64,
}

impl RoleSpec {
    pub fn new(role: &str, weight: i64) -> Self {
        RoleSpec {
            role: role.to_string(),
            name: format!("user.role.{}", role),
            weight,
            ..Default::default()
        }
    }

    pub fn board(mut self, uri: &str) -> Self {
        self.board_uri = Some(uri.to_string());
        self
    }

    pub fn caste(mut self, caste: &str) -> Self {
        self.caste = Some(caste.to_string());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn capcode(mut self, capcode: &str) -> Self {
        self.capcode = Some(capcode.to_string());
        self
    }

    pub fn inherit(mut self, parent: RoleId) -> Self {
        self.inherit_id = Some(parent);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_part("role", &self.role)?;
        for (what, v) in [("board_uri", &self.board_uri), ("caste", &self.caste)] {
            if let Some(s) = v {
                validate_part(what, s)?;
            }
        }
        Ok(())
    }

    pub(crate) fn into_role(self, id: RoleId) -> Role {
        Role {
            id,
            role: self.role,
            board_uri: self.board_uri,
            caste: self.caste,
            name: self.name,
            capcode: self.capcode,
            inherit_id: self.inherit_id,
            system: false,
            weight: self.weight,
        }
    }
}

/// Tri-state override stored per (role, permission)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionValue {
    Allow,
    Deny,
    /// No row; the role defers to its parent
    Unset,
}

impl PermissionValue {
    #[inline]
    pub fn as_option(self) -> Option<bool> {
        match self {
            PermissionValue::Allow => Some(true),
            PermissionValue::Deny => Some(false),
            PermissionValue::Unset => None,
        }
    }
}

impl From<Option<bool>> for PermissionValue {
    fn from(v: Option<bool>) -> Self {
        match v {
            Some(true) => PermissionValue::Allow,
            Some(false) => PermissionValue::Deny,
            None => PermissionValue::Unset,
        }
    }
}

impl From<bool> for PermissionValue {
    fn from(v: bool) -> Self {
        Some(v).into()
    }
}
