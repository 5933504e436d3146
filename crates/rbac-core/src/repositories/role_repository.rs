//! Role repository trait (port)

use async_trait::async_trait;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use crate::domain::{RecordStatus, Role, RoleQuery};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Loads the role together with its menu ids.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, DomainError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>, DomainError>;
    async fn check_name(&self, name: &str) -> Result<bool, DomainError>;
    async fn create(&self, role: &Role) -> Result<Role, DomainError>;
    async fn update(&self, role: &Role) -> Result<Role, DomainError>;
    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError>;
    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError>;
    async fn query_page(&self, query: &RoleQuery, page: Pagination) -> Result<PageResult<Role>, DomainError>;
    async fn query_select(&self, query: &RoleQuery) -> Result<Vec<Role>, DomainError>;

    /// Whether any live user is still assigned this role.
    async fn is_in_use(&self, id: &Uuid) -> Result<bool, DomainError>;
}
