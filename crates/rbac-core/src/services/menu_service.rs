// ============================================================================
// RBAC Core - Menu Service
// File: crates/rbac-core/src/services/menu_service.rs
// Description: Menu tree maintenance with level code allocation
// ============================================================================
//! Menu CRUD. Every structural write (create, update, delete) runs its
//! read-check-write sequence under one process-wide async mutex, so level
//! codes, parent links and child checks are always decided on current rows.

use std::sync::Arc;

use rbac_shared::{PageResult, Pagination};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{build_tree, Menu, MenuInput, MenuQuery, MenuSelectQuery, MenuTreeNode, MenuType, RecordStatus};
use crate::error::DomainError;
use crate::level_code::{is_within, next_child_code};
use crate::repositories::MenuRepository;
use crate::services::PolicySynchronizer;

pub struct MenuService {
    menus: Arc<dyn MenuRepository>,
    policy: Arc<PolicySynchronizer>,
    tree_lock: Mutex<()>,
}

impl MenuService {
    pub fn new(menus: Arc<dyn MenuRepository>, policy: Arc<PolicySynchronizer>) -> Self {
        Self {
            menus,
            policy,
            tree_lock: Mutex::new(()),
        }
    }

    pub async fn query_page(&self, query: &MenuQuery, page: Pagination) -> Result<PageResult<Menu>, DomainError> {
        self.menus.query_page(query, page).await
    }

    pub async fn query_tree(&self, query: &MenuSelectQuery) -> Result<Vec<MenuTreeNode>, DomainError> {
        let menus = self.menus.query_select(query).await?;
        Ok(build_tree(menus))
    }

    pub async fn get(&self, id: &Uuid) -> Result<Menu, DomainError> {
        self.menus
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Menu", id))
    }

    pub async fn create(&self, input: MenuInput, created_by: Option<Uuid>) -> Result<Menu, DomainError> {
        input.validate()?;

        let _guard = self.tree_lock.lock().await;

        if let Some(code) = input.code.as_deref() {
            self.ensure_code_free(code, input.parent_id).await?;
        }

        let level_code = self.allocate_under(input.parent_id).await?;
        let menu = Menu::new(input, level_code, created_by)?;
        let created = self.menus.create(&menu).await?;

        info!(menu_id = %created.id, level_code = %created.level_code, "Menu created");
        Ok(created)
    }

    pub async fn update(&self, id: &Uuid, input: MenuInput, modified_by: Option<Uuid>) -> Result<Menu, DomainError> {
        if input.parent_id.as_ref() == Some(id) {
            warn!(menu_id = %id, "Rejected self-parent update");
            return Err(DomainError::SelfParent);
        }
        input.validate()?;

        let _guard = self.tree_lock.lock().await;

        let old = self.get(id).await?;
        let moved = input.parent_id != old.parent_id;

        if let Some(code) = input.code.as_deref() {
            if moved || old.code.as_deref() != Some(code) {
                self.ensure_code_free(code, input.parent_id).await?;
            }
        }

        let was_resource = old.menu_type == MenuType::Resource;

        let updated = if moved {
            let new_code = self.allocate_for_move(&old, input.parent_id).await?;
            let old_code = old.level_code.clone();

            let mut menu = old;
            menu.apply(input, modified_by)?;
            menu.level_code = new_code.clone();

            let updated = self.menus.update_with_level_code(&menu, &old_code, &new_code).await?;
            info!(menu_id = %id, old_code = %old_code, new_code = %new_code, "Menu re-parented");
            updated
        } else {
            let mut menu = old;
            menu.apply(input, modified_by)?;
            let updated = self.menus.update(&menu).await?;
            info!(menu_id = %id, "Menu updated");
            updated
        };

        if was_resource || updated.menu_type == MenuType::Resource {
            self.policy.reload_roles_for_menu(id).await?;
        }
        Ok(updated)
    }

    pub async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let _guard = self.tree_lock.lock().await;

        let menu = self.get(id).await?;

        if self.menus.has_children(id).await? {
            warn!(menu_id = %id, "Rejected delete of menu with children");
            return Err(DomainError::HasChildren);
        }

        self.menus.delete(id, removed_by).await?;
        info!(menu_id = %id, "Menu deleted");

        if menu.menu_type == MenuType::Resource {
            self.policy.reload_roles_for_menu(id).await?;
        }
        Ok(())
    }

    /// Delete in order, stopping at the first failure.
    pub async fn delete_many(&self, ids: &[Uuid], removed_by: Option<Uuid>) -> Result<(), DomainError> {
        for id in ids {
            self.delete(id, removed_by).await?;
        }
        Ok(())
    }

    pub async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let menu = self.get(id).await?;
        self.menus.update_status(id, status).await?;
        info!(menu_id = %id, status = status.as_str(), "Menu status updated");

        if menu.menu_type == MenuType::Resource {
            self.policy.reload_roles_for_menu(id).await?;
        }
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, parent_id: Option<Uuid>) -> Result<(), DomainError> {
        if self.menus.check_code(code, parent_id).await? {
            warn!(code, "Menu code already exists");
            return Err(DomainError::MenuCodeAlreadyExists(code.to_string()));
        }
        Ok(())
    }

    /// Next free code under `parent_id`. Caller holds the tree lock.
    async fn allocate_under(&self, parent_id: Option<Uuid>) -> Result<String, DomainError> {
        let parent_code = match parent_id {
            Some(pid) => self
                .menus
                .find_by_id(&pid)
                .await?
                .ok_or_else(|| DomainError::not_found("Parent menu", pid))?
                .level_code,
            None => String::new(),
        };
        self.allocate(&parent_code, parent_id).await
    }

    /// Like [`Self::allocate_under`], but refuses a target inside the moving
    /// menu's own subtree.
    async fn allocate_for_move(&self, menu: &Menu, parent_id: Option<Uuid>) -> Result<String, DomainError> {
        let parent_code = match parent_id {
            Some(pid) => {
                let parent = self
                    .menus
                    .find_by_id(&pid)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Parent menu", pid))?;
                if is_within(&parent.level_code, &menu.level_code) {
                    warn!(menu_id = %menu.id, parent_id = %pid, "Rejected move under own descendant");
                    return Err(DomainError::ParentIsDescendant);
                }
                parent.level_code
            }
            None => String::new(),
        };
        self.allocate(&parent_code, parent_id).await
    }

    async fn allocate(&self, parent_code: &str, parent_id: Option<Uuid>) -> Result<String, DomainError> {
        let siblings = self.menus.query_level_codes_by_parent_id(parent_id).await?;
        next_child_code(parent_code, &siblings).map_err(|e| {
            warn!(parent_code, siblings = siblings.len(), "Level code space exhausted");
            DomainError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repositories::menu_repository::MockMenuRepository;
    use crate::repositories::role_repository::MockRoleRepository;
    use crate::repositories::user_repository::MockUserRepository;
    use rbac_security::CasbinEnforcer;

    async fn service(menus: MockMenuRepository) -> MenuService {
        let menus: Arc<dyn MenuRepository> = Arc::new(menus);
        let enforcer = Arc::new(CasbinEnforcer::new().await.unwrap());
        let policy = Arc::new(PolicySynchronizer::new(
            Arc::new(MockUserRepository::new()),
            Arc::new(MockRoleRepository::new()),
            menus.clone(),
            enforcer,
        ));
        MenuService::new(menus, policy)
    }

    fn menu_at(level_code: &str, parent_id: Option<Uuid>) -> Menu {
        let input = MenuInput {
            name: format!("menu-{level_code}"),
            parent_id,
            ..Default::default()
        };
        Menu::new(input, level_code.to_string(), None).unwrap()
    }

    #[tokio::test]
    async fn self_parent_is_rejected_before_any_storage_access() {
        // No expectations: any repository call would panic.
        let svc = service(MockMenuRepository::new()).await;
        let id = Uuid::new_v4();

        let input = MenuInput {
            name: "loop".to_string(),
            parent_id: Some(id),
            ..Default::default()
        };
        let err = svc.update(&id, input, None).await.unwrap_err();

        assert!(matches!(err, DomainError::SelfParent));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn create_under_full_parent_is_an_allocation_failure() {
        let parent = menu_at("01", None);
        let parent_id = parent.id;

        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(parent.clone())));
        repo.expect_query_level_codes_by_parent_id()
            .returning(|_| Ok((1..=99).map(|i| format!("01{i:02}")).collect()));
        repo.expect_create().times(0);

        let svc = service(repo).await;
        let input = MenuInput {
            name: "one too many".to_string(),
            parent_id: Some(parent_id),
            ..Default::default()
        };
        let err = svc.create(input, None).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AllocationFailure);
    }

    #[tokio::test]
    async fn create_takes_first_free_code_under_parent() {
        let parent = menu_at("02", None);
        let parent_id = parent.id;

        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_id()
            .returning(move |_| Ok(Some(parent.clone())));
        repo.expect_query_level_codes_by_parent_id()
            .returning(|_| Ok(vec!["0201".to_string(), "0203".to_string()]));
        repo.expect_create().returning(|m| Ok(m.clone()));

        let svc = service(repo).await;
        let input = MenuInput {
            name: "child".to_string(),
            parent_id: Some(parent_id),
            ..Default::default()
        };
        let created = svc.create(input, None).await.unwrap();

        assert_eq!(created.level_code, "0202");
    }

    #[tokio::test]
    async fn move_under_own_descendant_is_rejected() {
        let moving = menu_at("01", None);
        let child = menu_at("0101", Some(moving.id));
        let (moving_id, child_id) = (moving.id, child.id);

        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_id().returning(move |id| {
            if *id == moving.id {
                Ok(Some(moving.clone()))
            } else {
                Ok(Some(child.clone()))
            }
        });
        repo.expect_update_with_level_code().times(0);

        let svc = service(repo).await;
        let input = MenuInput {
            name: "moving".to_string(),
            parent_id: Some(child_id),
            ..Default::default()
        };
        let err = svc.update(&moving_id, input, None).await.unwrap_err();

        assert!(matches!(err, DomainError::ParentIsDescendant));
    }

    #[tokio::test]
    async fn delete_with_children_is_a_conflict() {
        let menu = menu_at("01", None);
        let id = menu.id;

        let mut repo = MockMenuRepository::new();
        repo.expect_find_by_id().returning(move |_| Ok(Some(menu.clone())));
        repo.expect_has_children().returning(|_| Ok(true));
        repo.expect_delete().times(0);

        let svc = service(repo).await;
        let err = svc.delete(&id, None).await.unwrap_err();
        assert!(matches!(err, DomainError::HasChildren));
    }
}
