use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rbac_core::domain::{RecordStatus, User, UserQuery, UserRole, UserRoleQuery};
use rbac_core::error::DomainError;
use rbac_core::repositories::UserRepository;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use super::{contains_ignore_case, paginate, MemoryStore};

pub struct InMemoryUserRepository {
    store: Arc<MemoryStore>,
}

impl InMemoryUserRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        let users = self.store.users.read().await;
        Ok(users.get(id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn check_user_name(&self, user_name: &str) -> Result<bool, DomainError> {
        let users = self.store.users.read().await;
        Ok(users.values().any(|u| !u.is_deleted() && u.user_name == user_name))
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        let mut users = self.store.users.write().await;
        if users.values().any(|u| !u.is_deleted() && u.user_name == user.user_name) {
            return Err(DomainError::UserNameAlreadyExists(user.user_name.clone()));
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut users = self.store.users.write().await;
        if users
            .values()
            .any(|u| !u.is_deleted() && u.id != user.id && u.user_name == user.user_name)
        {
            return Err(DomainError::UserNameAlreadyExists(user.user_name.clone()));
        }

        let existing = users
            .get_mut(&user.id)
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| DomainError::not_found("User", user.id))?;
        *existing = user.clone();
        existing.modified_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let mut users = self.store.users.write().await;
        let user = users
            .get_mut(id)
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| DomainError::not_found("User", id))?;
        user.status = status;
        user.modified_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let mut users = self.store.users.write().await;
        let user = users
            .get_mut(id)
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| DomainError::not_found("User", id))?;
        user.removed_at = Some(Utc::now());
        user.removed_by = removed_by;
        user.role_ids.clear();
        Ok(())
    }

    async fn query_page(&self, query: &UserQuery, page: Pagination) -> Result<PageResult<User>, DomainError> {
        let users = self.store.users.read().await;
        let mut matched: Vec<User> = users
            .values()
            .filter(|u| !u.is_deleted())
            .filter(|u| contains_ignore_case(&u.user_name, query.user_name.as_deref()))
            .filter(|u| contains_ignore_case(&u.real_name, query.real_name.as_deref()))
            .filter(|u| query.status.map_or(true, |s| u.status == s))
            .filter(|u| query.role_id.map_or(true, |r| u.role_ids.contains(&r)))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(matched, page))
    }

    async fn query_user_roles(&self, query: &UserRoleQuery) -> Result<Vec<UserRole>, DomainError> {
        let users = self.store.users.read().await;
        let mut rows: Vec<UserRole> = users
            .values()
            .filter(|u| !u.is_deleted())
            .filter(|u| query.user_id.map_or(true, |id| u.id == id))
            .filter(|u| query.user_status.map_or(true, |s| u.status == s))
            .flat_map(|u| {
                u.role_ids.iter().map(move |role_id| UserRole {
                    user_id: u.id,
                    role_id: *role_id,
                })
            })
            .filter(|ur| query.role_id.map_or(true, |id| ur.role_id == id))
            .collect();
        rows.sort_by(|a, b| a.user_id.cmp(&b.user_id).then(a.role_id.cmp(&b.role_id)));
        Ok(rows)
    }
}
