#![allow(dead_code)]

use std::sync::Arc;

use rbac_core::domain::{MenuInput, MenuType, RoleInput, UserInput};
use rbac_core::repositories::{MenuRepository, RoleRepository, UserRepository};
use rbac_core::services::{MenuService, PolicySynchronizer, RoleService, UserService};
use rbac_infrastructure::{InMemoryMenuRepository, InMemoryRoleRepository, InMemoryUserRepository, MemoryStore};
use rbac_security::{CasbinEnforcer, PolicyEnforcer};
use uuid::Uuid;

pub struct Harness {
    pub menu_repo: Arc<dyn MenuRepository>,
    pub user_repo: Arc<dyn UserRepository>,
    pub role_repo: Arc<dyn RoleRepository>,
    pub enforcer: Arc<dyn PolicyEnforcer>,
    pub policy: Arc<PolicySynchronizer>,
    pub menus: Arc<MenuService>,
    pub users: Arc<UserService>,
    pub roles: Arc<RoleService>,
}

impl Harness {
    pub async fn new() -> Self {
        let enforcer = CasbinEnforcer::new().await.expect("casbin model");
        Self::with_enforcer(Arc::new(enforcer))
    }

    pub fn with_enforcer(enforcer: Arc<dyn PolicyEnforcer>) -> Self {
        Self::assemble(enforcer, |repo| Arc::new(repo) as Arc<dyn MenuRepository>)
    }

    /// Like [`Harness::new`], with the menu repository wrapped by `wrap`.
    pub async fn with_menu_repo(wrap: impl FnOnce(InMemoryMenuRepository) -> Arc<dyn MenuRepository>) -> Self {
        let enforcer = CasbinEnforcer::new().await.expect("casbin model");
        Self::assemble(Arc::new(enforcer), wrap)
    }

    fn assemble(
        enforcer: Arc<dyn PolicyEnforcer>,
        wrap: impl FnOnce(InMemoryMenuRepository) -> Arc<dyn MenuRepository>,
    ) -> Self {
        let store = MemoryStore::shared();
        let menu_repo = wrap(InMemoryMenuRepository::new(store.clone()));
        let user_repo: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new(store.clone()));
        let role_repo: Arc<dyn RoleRepository> = Arc::new(InMemoryRoleRepository::new(store));

        let policy = Arc::new(PolicySynchronizer::new(
            user_repo.clone(),
            role_repo.clone(),
            menu_repo.clone(),
            enforcer.clone(),
        ));

        Self {
            menus: Arc::new(MenuService::new(menu_repo.clone(), policy.clone())),
            users: Arc::new(UserService::new(user_repo.clone(), role_repo.clone(), policy.clone())),
            roles: Arc::new(RoleService::new(role_repo.clone(), policy.clone())),
            menu_repo,
            user_repo,
            role_repo,
            enforcer,
            policy,
        }
    }

    /// A second synchronizer over the same storage but a fresh engine.
    pub async fn fresh_engine(&self) -> (Arc<dyn PolicyEnforcer>, PolicySynchronizer) {
        let enforcer: Arc<dyn PolicyEnforcer> = Arc::new(CasbinEnforcer::new().await.expect("casbin model"));
        let policy = PolicySynchronizer::new(
            self.user_repo.clone(),
            self.role_repo.clone(),
            self.menu_repo.clone(),
            enforcer.clone(),
        );
        (enforcer, policy)
    }
}

pub fn menu_input(name: &str, parent_id: Option<Uuid>) -> MenuInput {
    MenuInput {
        name: name.to_string(),
        parent_id,
        ..Default::default()
    }
}

pub fn resource_input(name: &str, parent_id: Option<Uuid>, path: &str, method: &str) -> MenuInput {
    MenuInput {
        name: name.to_string(),
        menu_type: MenuType::Resource,
        path: Some(path.to_string()),
        method: Some(method.to_string()),
        parent_id,
        ..Default::default()
    }
}

pub fn role_input(name: &str, menu_ids: Vec<Uuid>) -> RoleInput {
    RoleInput {
        name: name.to_string(),
        menu_ids,
        ..Default::default()
    }
}

pub fn user_input(user_name: &str, role_ids: Vec<Uuid>) -> UserInput {
    UserInput {
        user_name: user_name.to_string(),
        real_name: user_name.to_uppercase(),
        password: Some("password123".to_string()),
        role_ids,
        ..Default::default()
    }
}
