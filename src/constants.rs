//! System role catalog and fixed weights

use crate::role::RoleId;

/// Maximum inheritance chain depth (prevents infinite loops)
pub const MAX_INHERITANCE_DEPTH: usize = 10;

/// Weight added to OWNER for the per-board owner role
pub const BOARD_OWNER_WEIGHT_OFFSET: i64 = 5;

/// Authority weight of an actor that may manage nothing
pub const NO_AUTHORITY: i64 = -1;

/// First id handed out to non-system roles
pub const FIRST_CUSTOM_ROLE_ID: RoleId = 9;

/// The eight seeded roles. Ids and weights never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemRole {
    Anonymous,
    Admin,
    Moderator,
    Owner,
    Janitor,
    Unaccountable,
    Registered,
    Absolute,
}

impl SystemRole {
    pub const ALL: [SystemRole; 8] = [
        SystemRole::Anonymous,
        SystemRole::Admin,
        SystemRole::Moderator,
        SystemRole::Owner,
        SystemRole::Janitor,
        SystemRole::Unaccountable,
        SystemRole::Registered,
        SystemRole::Absolute,
    ];

    #[inline]
    pub const fn id(self) -> RoleId {
        match self {
            SystemRole::Anonymous => 1,
            SystemRole::Admin => 2,
            SystemRole::Moderator => 3,
            SystemRole::Owner => 4,
            SystemRole::Janitor => 5,
            SystemRole::Unaccountable => 6,
            SystemRole::Registered => 7,
            SystemRole::Absolute => 8,
        }
    }

    #[inline]
    pub const fn weight(self) -> i64 {
        match self {
            SystemRole::Anonymous => 0,
            SystemRole::Admin => 100,
            SystemRole::Moderator => 80,
            SystemRole::Owner => 60,
            SystemRole::Janitor => 40,
            SystemRole::Unaccountable => 20,
            SystemRole::Registered => 30,
            SystemRole::Absolute => 1000,
        }
    }

    /// Group name stored in `Role::role`
    pub const fn role(self) -> &'static str {
        match self {
            SystemRole::Anonymous => "anonymous",
            SystemRole::Admin => "admin",
            SystemRole::Moderator => "moderator",
            SystemRole::Owner => "owner",
            SystemRole::Janitor => "janitor",
            SystemRole::Unaccountable => "unaccountable",
            SystemRole::Registered => "registered",
            SystemRole::Absolute => "absolute",
        }
    }

    /// Display key stored in `Role::name`
    pub fn name(self) -> String {
        format!("user.role.{}", self.role())
    }

    pub fn from_id(id: RoleId) -> Option<SystemRole> {
        SystemRole::ALL.iter().copied().find(|r| r.id() == id)
    }

    /// Default overrides seeded for this role: (permission key, allow)
    pub fn default_overrides(self) -> &'static [(&'static str, bool)] {
        match self {
            SystemRole::Anonymous => ANONYMOUS_DEFAULTS,
            SystemRole::Admin => ADMIN_DEFAULTS,
            SystemRole::Moderator => MODERATOR_DEFAULTS,
            SystemRole::Owner => OWNER_DEFAULTS,
            SystemRole::Janitor => JANITOR_DEFAULTS,
            SystemRole::Unaccountable => UNACCOUNTABLE_DEFAULTS,
            SystemRole::Registered => REGISTERED_DEFAULTS,
            SystemRole::Absolute => &[],
        }
    }
}

const ANONYMOUS_DEFAULTS: &[(&str, bool)] = &[
    ("board.post.create.thread", true),
    ("board.post.create.reply", true),
    ("board.post.delete.self", true),
    ("board.post.report", true),
    ("board.image.upload.new", true),
    ("board.image.upload.old", true),
    ("board.image.delete.self", true),
    ("site.post.report", true),
    ("site.user.create", true),
];

const UNACCOUNTABLE_DEFAULTS: &[(&str, bool)] = &[
    ("board.image.upload.new", false),
    ("site.user.create", false),
];

const REGISTERED_DEFAULTS: &[(&str, bool)] = &[
    ("board.create", true),
    ("site.pm", true),
];

const JANITOR_DEFAULTS: &[(&str, bool)] = &[
    ("board.post.delete.other", true),
    ("board.image.delete.other", true),
    ("board.image.spoiler.other", true),
    ("board.post.nocaptcha", true),
    ("board.user.ban.reason", true),
    ("board.user.ban.free", false),
    ("board.logs", true),
];

const OWNER_DEFAULTS: &[(&str, bool)] = &[
    ("board.config", true),
    ("board.user.role", true),
    ("board.user.ban.free", true),
    ("board.user.unban", true),
    ("board.post.sticky", true),
    ("board.post.lock", true),
    ("board.post.bumplock", true),
    ("board.post.edit.other", true),
];

const MODERATOR_DEFAULTS: &[(&str, bool)] = &[
    ("board.post.delete.other", true),
    ("board.post.sticky", true),
    ("board.post.lock", true),
    ("board.post.bumplock", true),
    ("board.user.ban.free", true),
    ("board.user.ban.reason", true),
    ("board.user.unban", true),
    ("board.images.ban", true),
    ("site.image.ban", true),
    ("sys.logs", true),
];

const ADMIN_DEFAULTS: &[(&str, bool)] = &[
    ("sys.boards", true),
    ("sys.cache", true),
    ("sys.config", true),
    ("sys.logs", true),
    ("sys.payments", true),
    ("sys.permissions", true),
    ("sys.roles", true),
    ("sys.tools", true),
    ("sys.users", true),
    ("board.config", true),
    ("board.delete.other", true),
    ("board.reassign", true),
    ("site.board.view_unindexed", true),
    ("site.user.merge", true),
];
