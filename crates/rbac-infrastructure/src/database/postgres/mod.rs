//! PostgreSQL repository implementations

pub mod menu_repo_impl;
pub mod user_repo_impl;
pub mod role_repo_impl;

pub use menu_repo_impl::PgMenuRepository;
pub use user_repo_impl::PgUserRepository;
pub use role_repo_impl::PgRoleRepository;

use rbac_core::error::DomainError;
use tracing::error;

pub(crate) fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    error!("Database error {}: {}", context, e);
    DomainError::DatabaseError(e.to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        return db_err.code().map(|code| code == "23505").unwrap_or(false);
    }
    false
}
