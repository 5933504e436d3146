use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rbac_core::domain::{RecordStatus, Role, RoleQuery};
use rbac_core::error::DomainError;
use rbac_core::repositories::RoleRepository;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use super::{contains_ignore_case, paginate, MemoryStore};

pub struct InMemoryRoleRepository {
    store: Arc<MemoryStore>,
}

impl InMemoryRoleRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    async fn matching(&self, query: &RoleQuery) -> Vec<Role> {
        let roles = self.store.roles.read().await;
        let mut matched: Vec<Role> = roles
            .values()
            .filter(|r| !r.is_deleted())
            .filter(|r| contains_ignore_case(&r.name, query.name.as_deref()))
            .filter(|r| query.status.map_or(true, |s| r.status == s))
            .filter(|r| query.menu_id.map_or(true, |m| r.menu_ids.contains(&m)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        matched
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, DomainError> {
        let roles = self.store.roles.read().await;
        Ok(roles.get(id).filter(|r| !r.is_deleted()).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>, DomainError> {
        let roles = self.store.roles.read().await;
        let mut found: Vec<Role> = ids
            .iter()
            .filter_map(|id| roles.get(id))
            .filter(|r| !r.is_deleted())
            .cloned()
            .collect();
        found.sort_by(|a, b| a.sequence.cmp(&b.sequence).then_with(|| a.name.cmp(&b.name)));
        Ok(found)
    }

    async fn check_name(&self, name: &str) -> Result<bool, DomainError> {
        let roles = self.store.roles.read().await;
        Ok(roles.values().any(|r| !r.is_deleted() && r.name == name))
    }

    async fn create(&self, role: &Role) -> Result<Role, DomainError> {
        let mut roles = self.store.roles.write().await;
        if roles.values().any(|r| !r.is_deleted() && r.name == role.name) {
            return Err(DomainError::RoleNameAlreadyExists(role.name.clone()));
        }
        roles.insert(role.id, role.clone());
        Ok(role.clone())
    }

    async fn update(&self, role: &Role) -> Result<Role, DomainError> {
        let mut roles = self.store.roles.write().await;
        if roles
            .values()
            .any(|r| !r.is_deleted() && r.id != role.id && r.name == role.name)
        {
            return Err(DomainError::RoleNameAlreadyExists(role.name.clone()));
        }

        let existing = roles
            .get_mut(&role.id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| DomainError::not_found("Role", role.id))?;
        *existing = role.clone();
        existing.modified_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let mut roles = self.store.roles.write().await;
        let role = roles
            .get_mut(id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| DomainError::not_found("Role", id))?;
        role.status = status;
        role.modified_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let mut roles = self.store.roles.write().await;
        let role = roles
            .get_mut(id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| DomainError::not_found("Role", id))?;
        role.removed_at = Some(Utc::now());
        role.removed_by = removed_by;
        role.menu_ids.clear();
        Ok(())
    }

    async fn query_page(&self, query: &RoleQuery, page: Pagination) -> Result<PageResult<Role>, DomainError> {
        Ok(paginate(self.matching(query).await, page))
    }

    async fn query_select(&self, query: &RoleQuery) -> Result<Vec<Role>, DomainError> {
        Ok(self.matching(query).await)
    }

    async fn is_in_use(&self, id: &Uuid) -> Result<bool, DomainError> {
        let users = self.store.users.read().await;
        Ok(users.values().any(|u| !u.is_deleted() && u.role_ids.contains(id)))
    }
}
