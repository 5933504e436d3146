//! Menu repository trait (port)

use async_trait::async_trait;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use crate::domain::{Menu, MenuQuery, MenuSelectQuery, RecordStatus};
use crate::error::DomainError;

/// Persistence port for menus. Soft-deleted rows are invisible to every read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError>;
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Menu>, DomainError>;

    /// Level codes of the direct children of `parent_id` (`None` = top level),
    /// ascending.
    async fn query_level_codes_by_parent_id(&self, parent_id: Option<Uuid>) -> Result<Vec<String>, DomainError>;

    /// Whether a sibling under `parent_id` already uses `code`.
    async fn check_code(&self, code: &str, parent_id: Option<Uuid>) -> Result<bool, DomainError>;
    async fn has_children(&self, id: &Uuid) -> Result<bool, DomainError>;

    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError>;
    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError>;

    /// Persist `menu` (already carrying `new_code`) and rewrite the prefix of
    /// every descendant from `old_code` to `new_code`, atomically.
    async fn update_with_level_code(&self, menu: &Menu, old_code: &str, new_code: &str) -> Result<Menu, DomainError>;

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError>;
    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError>;

    async fn query_page(&self, query: &MenuQuery, page: Pagination) -> Result<PageResult<Menu>, DomainError>;

    /// Unpaged, ordered by level code.
    async fn query_select(&self, query: &MenuSelectQuery) -> Result<Vec<Menu>, DomainError>;
}
