mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{role_input, user_input, Harness};
use mockall::mock;
use rbac_core::domain::{RecordStatus, Role, User};
use rbac_core::ErrorKind;
use rbac_security::{EnforcerError, PolicyEnforcer};

mock! {
    pub Engine {}

    #[async_trait]
    impl PolicyEnforcer for Engine {
        async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool, EnforcerError>;
        async fn delete_roles_for_user(&self, user: &str) -> Result<bool, EnforcerError>;
        async fn roles_for_user(&self, user: &str) -> Vec<String>;
        async fn add_permission_for_role(&self, role: &str, resource: &str, action: &str) -> Result<bool, EnforcerError>;
        async fn delete_permissions_for_role(&self, role: &str) -> Result<bool, EnforcerError>;
        async fn delete_role(&self, role: &str) -> Result<bool, EnforcerError>;
        async fn enforce(&self, user: &str, resource: &str, action: &str) -> Result<bool, EnforcerError>;
    }
}

/// Seed a role and a user straight into storage, bypassing policy sync.
async fn seed(h: &Harness) -> (Role, User) {
    let role = Role::new(role_input("admin", vec![]), None).unwrap();
    let role = h.role_repo.create(&role).await.unwrap();
    let user = User::new(user_input("alice", vec![role.id]), "hash".to_string(), None).unwrap();
    let user = h.user_repo.create(&user).await.unwrap();
    (role, user)
}

#[tokio::test]
async fn failed_removal_on_disable_is_surfaced() {
    let mut engine = MockEngine::new();
    engine
        .expect_delete_roles_for_user()
        .times(1)
        .returning(|_| Err(EnforcerError::Engine("adapter offline".to_string())));

    let h = Harness::with_enforcer(Arc::new(engine));
    let (_, user) = seed(&h).await;

    let err = h
        .users
        .update_status(&user.id, RecordStatus::Disabled)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::EngineStale);
    // Storage write went through; only the engine is behind.
    assert_eq!(h.users.get(&user.id).await.unwrap().status, RecordStatus::Disabled);
}

#[tokio::test]
async fn failed_removal_on_delete_is_surfaced() {
    let mut engine = MockEngine::new();
    engine
        .expect_delete_roles_for_user()
        .returning(|_| Err(EnforcerError::Engine("adapter offline".to_string())));

    let h = Harness::with_enforcer(Arc::new(engine));
    let (_, user) = seed(&h).await;

    let err = h.users.delete(&user.id, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineStale);
}

#[tokio::test]
async fn failed_insert_is_reported_as_retryable() {
    let mut engine = MockEngine::new();
    engine.expect_delete_roles_for_user().returning(|_| Ok(false));
    engine
        .expect_add_role_for_user()
        .returning(|_, _| Err(EnforcerError::Engine("rule set full".to_string())));

    let h = Harness::with_enforcer(Arc::new(engine));
    let (_, user) = seed(&h).await;

    let err = h.policy.load_policy(&user.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineRetryable);
}

#[tokio::test]
async fn load_policy_without_assignments_only_clears() {
    let mut engine = MockEngine::new();
    engine.expect_delete_roles_for_user().times(1).returning(|_| Ok(false));
    engine.expect_add_role_for_user().times(0);

    let h = Harness::with_enforcer(Arc::new(engine));
    h.policy.load_policy(&uuid::Uuid::new_v4()).await.unwrap();
}

#[tokio::test]
async fn failed_role_permission_removal_is_surfaced() {
    let mut engine = MockEngine::new();
    engine
        .expect_delete_permissions_for_role()
        .returning(|_| Err(EnforcerError::Engine("adapter offline".to_string())));

    let h = Harness::with_enforcer(Arc::new(engine));
    let (role, _) = seed(&h).await;

    let err = h
        .roles
        .update_status(&role.id, RecordStatus::Disabled)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineStale);
}
