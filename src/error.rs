//! Error types for boardroles

use crate::role::RoleId;

/// The main error type for role store and permission operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// (role, board_uri, caste) already names another role
    #[error("role '{role}' already exists for board {board:?} caste {caste:?} (id {existing})")]
    DuplicateRole {
        role: String,
        board: Option<String>,
        caste: Option<String>,
        existing: RoleId,
    },

    /// A role id did not resolve, or an inheritance edge would form a cycle
    #[error("invalid role reference: {0}")]
    InvalidReference(String),

    /// System roles cannot be deleted, reweighted or re-parented
    #[error("role {0} is a system role and cannot be modified")]
    ProtectedRole(RoleId),

    /// Permission key is not in the registry
    #[error("unknown permission '{0}'")]
    UnknownPermission(String),

    /// Malformed input (empty names, bad permission keys)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Store configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(String),

    /// LMDB or filesystem failure
    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for boardroles operations
pub type Result<T> = std::result::Result<T, Error>;

/// Convert any storage-level error to [`Error::Storage`]
pub fn err<E: std::error::Error>(e: E) -> Error {
    Error::Storage(e.to_string())
}
