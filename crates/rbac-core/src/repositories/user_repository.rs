//! User repository trait (port)

use async_trait::async_trait;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use crate::domain::{RecordStatus, User, UserQuery, UserRole, UserRoleQuery};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Loads the user together with its role ids.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError>;
    async fn check_user_name(&self, user_name: &str) -> Result<bool, DomainError>;

    /// Insert the user and its role rows in one transaction.
    async fn create(&self, user: &User) -> Result<User, DomainError>;

    /// Update the user and replace its role rows in one transaction.
    async fn update(&self, user: &User) -> Result<User, DomainError>;

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError>;

    /// Soft delete the user and drop its role rows.
    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError>;

    async fn query_page(&self, query: &UserQuery, page: Pagination) -> Result<PageResult<User>, DomainError>;
    async fn query_user_roles(&self, query: &UserRoleQuery) -> Result<Vec<UserRole>, DomainError>;
}
