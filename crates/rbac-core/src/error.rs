//! Domain errors

use thiserror::Error;

use crate::level_code::LevelCodeError;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    AllocationFailure,
    Validation,
    /// Primary store failed; the operation was aborted.
    Storage,
    /// Authorization engine failed to add a rule. The state is under-granted.
    EngineRetryable,
    /// Authorization engine failed to remove a rule. A stale grant may remain.
    EngineStale,
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Menu code already exists: {0}")]
    MenuCodeAlreadyExists(String),

    #[error("User name already exists: {0}")]
    UserNameAlreadyExists(String),

    #[error("Role name already exists: {0}")]
    RoleNameAlreadyExists(String),

    #[error("Menu cannot use itself as parent")]
    SelfParent,

    #[error("Menu cannot be moved under its own descendant")]
    ParentIsDescendant,

    #[error("Menu has child menus and cannot be deleted")]
    HasChildren,

    #[error("Role is still assigned to users")]
    RoleInUse,

    #[error("Level code allocation failed: {0}")]
    LevelCodeAllocation(#[from] LevelCodeError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Password hash error: {0}")]
    PasswordHashError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Failed to grant policy: {0}")]
    PolicyGrantFailed(String),

    #[error("Failed to revoke policy: {0}")]
    PolicyRevokeFailed(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::MenuCodeAlreadyExists(_)
            | DomainError::UserNameAlreadyExists(_)
            | DomainError::RoleNameAlreadyExists(_)
            | DomainError::SelfParent
            | DomainError::ParentIsDescendant
            | DomainError::HasChildren
            | DomainError::RoleInUse => ErrorKind::Conflict,
            DomainError::LevelCodeAllocation(LevelCodeError::Exhausted { .. }) => ErrorKind::AllocationFailure,
            // A stored code that does not parse is corrupt data, not a full parent.
            DomainError::LevelCodeAllocation(LevelCodeError::Malformed(_)) => ErrorKind::Storage,
            DomainError::ValidationError(_) => ErrorKind::Validation,
            DomainError::PasswordHashError(_) | DomainError::DatabaseError(_) => ErrorKind::Storage,
            DomainError::PolicyGrantFailed(_) => ErrorKind::EngineRetryable,
            DomainError::PolicyRevokeFailed(_) => ErrorKind::EngineStale,
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(e: validator::ValidationErrors) -> Self {
        DomainError::ValidationError(e.to_string())
    }
}
