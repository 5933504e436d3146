// ============================================================================
// RBAC Security - Authorization Engine
// File: crates/rbac-security/src/enforcer.rs
// Description: Casbin-backed user/role/route policy engine
// ============================================================================
//! The engine holds two kinds of rules:
//!
//! - grouping rules `g, <user_id>, <role_id>` (policy bindings)
//! - permission rules `p, <role_id>, <path pattern>, <METHOD>`
//!
//! Everything in here is derived from the relational store and can be rebuilt
//! at any time. Nothing is persisted by the adapter.

use std::sync::Arc;

use async_trait::async_trait;
use casbin::{CoreApi, DefaultModel, Enforcer, MemoryAdapter, RbacApi};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && keyMatch2(r.obj, p.obj) && r.act == p.act
"#;

#[derive(Error, Debug)]
pub enum EnforcerError {
    #[error("Invalid authorization model: {0}")]
    InvalidModel(String),

    #[error("Authorization engine error: {0}")]
    Engine(String),
}

impl From<casbin::Error> for EnforcerError {
    fn from(e: casbin::Error) -> Self {
        EnforcerError::Engine(e.to_string())
    }
}

/// Port for the authorization engine. Mutations report whether the rule set
/// actually changed.
#[async_trait]
pub trait PolicyEnforcer: Send + Sync {
    async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool, EnforcerError>;
    async fn delete_roles_for_user(&self, user: &str) -> Result<bool, EnforcerError>;
    async fn roles_for_user(&self, user: &str) -> Vec<String>;
    async fn add_permission_for_role(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, EnforcerError>;
    async fn delete_permissions_for_role(&self, role: &str) -> Result<bool, EnforcerError>;
    /// Drops the role's permissions and every user binding to it.
    async fn delete_role(&self, role: &str) -> Result<bool, EnforcerError>;
    async fn enforce(&self, user: &str, resource: &str, action: &str) -> Result<bool, EnforcerError>;
}

/// In-memory casbin enforcer shared process-wide.
#[derive(Clone)]
pub struct CasbinEnforcer {
    inner: Arc<RwLock<Enforcer>>,
}

impl CasbinEnforcer {
    pub async fn new() -> Result<Self, EnforcerError> {
        let model = DefaultModel::from_str(MODEL)
            .await
            .map_err(|e| EnforcerError::InvalidModel(e.to_string()))?;
        let enforcer = Enforcer::new(model, MemoryAdapter::default()).await?;
        Ok(Self {
            inner: Arc::new(RwLock::new(enforcer)),
        })
    }

    pub fn model_string() -> &'static str {
        MODEL
    }
}

#[async_trait]
impl PolicyEnforcer for CasbinEnforcer {
    async fn add_role_for_user(&self, user: &str, role: &str) -> Result<bool, EnforcerError> {
        let mut e = self.inner.write().await;
        let added = e.add_role_for_user(user, role, None).await?;
        debug!(user, role, added, "add role binding");
        Ok(added)
    }

    async fn delete_roles_for_user(&self, user: &str) -> Result<bool, EnforcerError> {
        let mut e = self.inner.write().await;
        if e.get_roles_for_user(user, None).is_empty() {
            return Ok(false);
        }
        let removed = e.delete_roles_for_user(user, None).await?;
        debug!(user, removed, "delete role bindings");
        Ok(removed)
    }

    async fn roles_for_user(&self, user: &str) -> Vec<String> {
        let mut e = self.inner.write().await;
        let mut roles = e.get_roles_for_user(user, None);
        roles.sort();
        roles
    }

    async fn add_permission_for_role(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, EnforcerError> {
        let mut e = self.inner.write().await;
        let added = e
            .add_permission_for_user(role, vec![resource.to_string(), action.to_uppercase()])
            .await?;
        Ok(added)
    }

    async fn delete_permissions_for_role(&self, role: &str) -> Result<bool, EnforcerError> {
        let mut e = self.inner.write().await;
        if e.get_permissions_for_user(role, None).is_empty() {
            return Ok(false);
        }
        Ok(e.delete_permissions_for_user(role).await?)
    }

    async fn delete_role(&self, role: &str) -> Result<bool, EnforcerError> {
        let mut e = self.inner.write().await;
        let has_users = !e.get_users_for_role(role, None).is_empty();
        let has_perms = !e.get_permissions_for_user(role, None).is_empty();
        if !has_users && !has_perms {
            return Ok(false);
        }
        Ok(e.delete_role(role).await?)
    }

    async fn enforce(&self, user: &str, resource: &str, action: &str) -> Result<bool, EnforcerError> {
        let e = self.inner.read().await;
        Ok(e.enforce((user, resource, action.to_uppercase().as_str()))?)
    }
}
