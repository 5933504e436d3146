use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rbac_core::domain::{Menu, MenuQuery, MenuSelectQuery, RecordStatus};
use rbac_core::error::DomainError;
use rbac_core::level_code::rebase_level_code;
use rbac_core::repositories::MenuRepository;
use rbac_shared::{PageResult, Pagination};
use uuid::Uuid;

use super::{contains_ignore_case, paginate, MemoryStore};

pub struct InMemoryMenuRepository {
    store: Arc<MemoryStore>,
}

impl InMemoryMenuRepository {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }
}

fn sorted_by_level_code(mut menus: Vec<Menu>) -> Vec<Menu> {
    menus.sort_by(|a, b| a.level_code.cmp(&b.level_code));
    menus
}

#[async_trait]
impl MenuRepository for InMemoryMenuRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        let menus = self.store.menus.read().await;
        Ok(menus.get(id).filter(|m| !m.is_deleted()).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Menu>, DomainError> {
        let menus = self.store.menus.read().await;
        let found = ids
            .iter()
            .filter_map(|id| menus.get(id))
            .filter(|m| !m.is_deleted())
            .cloned()
            .collect();
        Ok(sorted_by_level_code(found))
    }

    async fn query_level_codes_by_parent_id(&self, parent_id: Option<Uuid>) -> Result<Vec<String>, DomainError> {
        let menus = self.store.menus.read().await;
        let mut codes: Vec<String> = menus
            .values()
            .filter(|m| !m.is_deleted() && m.parent_id == parent_id)
            .map(|m| m.level_code.clone())
            .collect();
        codes.sort();
        Ok(codes)
    }

    async fn check_code(&self, code: &str, parent_id: Option<Uuid>) -> Result<bool, DomainError> {
        let menus = self.store.menus.read().await;
        Ok(menus
            .values()
            .any(|m| !m.is_deleted() && m.parent_id == parent_id && m.code.as_deref() == Some(code)))
    }

    async fn has_children(&self, id: &Uuid) -> Result<bool, DomainError> {
        let menus = self.store.menus.read().await;
        Ok(menus.values().any(|m| !m.is_deleted() && m.parent_id == Some(*id)))
    }

    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError> {
        let mut menus = self.store.menus.write().await;
        menus.insert(menu.id, menu.clone());
        Ok(menu.clone())
    }

    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError> {
        let mut menus = self.store.menus.write().await;
        let Some(existing) = menus.get_mut(&menu.id).filter(|m| !m.is_deleted()) else {
            return Err(DomainError::not_found("Menu", menu.id));
        };

        // Parent and level code only move through `update_with_level_code`.
        let (parent_id, level_code) = (existing.parent_id, existing.level_code.clone());
        *existing = menu.clone();
        existing.parent_id = parent_id;
        existing.level_code = level_code;
        existing.modified_at = Some(Utc::now());
        Ok(existing.clone())
    }

    async fn update_with_level_code(&self, menu: &Menu, old_code: &str, new_code: &str) -> Result<Menu, DomainError> {
        let mut menus = self.store.menus.write().await;
        if !menus.get(&menu.id).is_some_and(|m| !m.is_deleted()) {
            return Err(DomainError::not_found("Menu", menu.id));
        }

        for other in menus.values_mut().filter(|m| !m.is_deleted() && m.id != menu.id) {
            if let Some(rebased) = rebase_level_code(&other.level_code, old_code, new_code) {
                other.level_code = rebased;
            }
        }

        let mut moved = menu.clone();
        moved.level_code = new_code.to_string();
        moved.modified_at = Some(Utc::now());
        menus.insert(moved.id, moved.clone());
        Ok(moved)
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let mut menus = self.store.menus.write().await;
        let menu = menus
            .get_mut(id)
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| DomainError::not_found("Menu", id))?;
        menu.status = status;
        menu.modified_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let mut menus = self.store.menus.write().await;
        let menu = menus
            .get_mut(id)
            .filter(|m| !m.is_deleted())
            .ok_or_else(|| DomainError::not_found("Menu", id))?;
        menu.soft_delete(removed_by);
        Ok(())
    }

    async fn query_page(&self, query: &MenuQuery, page: Pagination) -> Result<PageResult<Menu>, DomainError> {
        let menus = self.store.menus.read().await;
        let matched = menus
            .values()
            .filter(|m| !m.is_deleted())
            .filter(|m| contains_ignore_case(&m.name, query.name.as_deref()))
            .filter(|m| query.parent_id.is_none() || m.parent_id == query.parent_id)
            .filter(|m| query.status.map_or(true, |s| m.status == s))
            .filter(|m| query.menu_type.map_or(true, |t| m.menu_type == t))
            .cloned()
            .collect();
        Ok(paginate(sorted_by_level_code(matched), page))
    }

    async fn query_select(&self, query: &MenuSelectQuery) -> Result<Vec<Menu>, DomainError> {
        let menus = self.store.menus.read().await;
        let matched = menus
            .values()
            .filter(|m| !m.is_deleted())
            .filter(|m| contains_ignore_case(&m.name, query.name.as_deref()))
            .filter(|m| query.status.map_or(true, |s| m.status == s))
            .filter(|m| query.types.is_empty() || query.types.contains(&m.menu_type))
            .cloned()
            .collect();
        Ok(sorted_by_level_code(matched))
    }
}
