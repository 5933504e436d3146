// ============================================================================
// RBAC Core - Policy Synchronizer
// File: crates/rbac-core/src/services/policy_service.rs
// Description: Rebuilds authorization engine rules from the relational store
// ============================================================================
//! The relational store is the source of truth. The engine only ever holds an
//! image of it:
//!
//! - user bindings `(user_id, role_id)` for enabled users
//! - role permissions `(role_id, path, METHOD)` for enabled roles and their
//!   enabled resource menus
//!
//! Engine failures are never swallowed. A failed insert leaves the subject
//! under-granted and is reported as retryable. A failed removal may leave a
//! stale grant behind, so it is logged at error level before being returned.

use std::sync::Arc;

use rbac_security::{EnforcerError, PolicyEnforcer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{RecordStatus, Role, RoleQuery, UserRoleQuery};
use crate::error::DomainError;
use crate::repositories::{MenuRepository, RoleRepository, UserRepository};

pub struct PolicySynchronizer {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    menus: Arc<dyn MenuRepository>,
    enforcer: Arc<dyn PolicyEnforcer>,
}

impl PolicySynchronizer {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        menus: Arc<dyn MenuRepository>,
        enforcer: Arc<dyn PolicyEnforcer>,
    ) -> Self {
        Self {
            users,
            roles,
            menus,
            enforcer,
        }
    }

    pub fn enforcer(&self) -> &Arc<dyn PolicyEnforcer> {
        &self.enforcer
    }

    /// Populate an empty engine from storage. Run once at startup; any error
    /// here should abort the process.
    pub async fn load_all_policy(&self) -> Result<(), DomainError> {
        let roles = self
            .roles
            .query_select(&RoleQuery {
                status: Some(RecordStatus::Enabled),
                ..Default::default()
            })
            .await?;

        let mut permissions = 0usize;
        for role in &roles {
            permissions += self.grant_role_permissions(role).await?;
        }

        let bindings = self
            .users
            .query_user_roles(&UserRoleQuery {
                user_status: Some(RecordStatus::Enabled),
                ..Default::default()
            })
            .await?;

        for binding in &bindings {
            let user = binding.user_id.to_string();
            let role = binding.role_id.to_string();
            self.enforcer
                .add_role_for_user(&user, &role)
                .await
                .map_err(|e| grant_failed(&user, e))?;
        }

        info!(
            roles = roles.len(),
            permissions,
            bindings = bindings.len(),
            "Authorization policy loaded"
        );
        Ok(())
    }

    /// Make the engine's role set for `user_id` equal to storage's. Idempotent.
    pub async fn load_policy(&self, user_id: &Uuid) -> Result<(), DomainError> {
        // Read first so a storage failure leaves the current grants in place.
        let bindings = self
            .users
            .query_user_roles(&UserRoleQuery {
                user_id: Some(*user_id),
                ..Default::default()
            })
            .await?;

        let user = user_id.to_string();
        self.enforcer
            .delete_roles_for_user(&user)
            .await
            .map_err(|e| revoke_failed(&user, e))?;

        for binding in &bindings {
            self.enforcer
                .add_role_for_user(&user, &binding.role_id.to_string())
                .await
                .map_err(|e| grant_failed(&user, e))?;
        }

        debug!(user_id = %user_id, roles = bindings.len(), "User policy reloaded");
        Ok(())
    }

    /// Drop every binding of a disabled user. Storage rows are untouched so
    /// re-enabling restores the same grants.
    pub async fn suspend_user(&self, user_id: &Uuid) -> Result<(), DomainError> {
        let user = user_id.to_string();
        self.enforcer
            .delete_roles_for_user(&user)
            .await
            .map_err(|e| revoke_failed(&user, e))?;
        info!(user_id = %user_id, "User policy suspended");
        Ok(())
    }

    /// Drop every binding of a deleted user.
    pub async fn revoke_user(&self, user_id: &Uuid) -> Result<(), DomainError> {
        let user = user_id.to_string();
        self.enforcer
            .delete_roles_for_user(&user)
            .await
            .map_err(|e| revoke_failed(&user, e))?;
        info!(user_id = %user_id, "User policy revoked");
        Ok(())
    }

    /// Replace the role's permissions with its current resource menus.
    /// A disabled role ends up with none.
    pub async fn load_role_policy(&self, role: &Role) -> Result<(), DomainError> {
        let subject = role.subject();
        self.enforcer
            .delete_permissions_for_role(&subject)
            .await
            .map_err(|e| revoke_failed(&subject, e))?;

        if role.status.is_enabled() && !role.is_deleted() {
            let granted = self.grant_role_permissions(role).await?;
            debug!(role_id = %role.id, permissions = granted, "Role policy reloaded");
        } else {
            debug!(role_id = %role.id, "Role disabled, permissions cleared");
        }
        Ok(())
    }

    /// Reload every role whose menu set contains `menu_id`.
    pub async fn reload_roles_for_menu(&self, menu_id: &Uuid) -> Result<(), DomainError> {
        let roles = self
            .roles
            .query_select(&RoleQuery {
                menu_id: Some(*menu_id),
                ..Default::default()
            })
            .await?;

        for role in &roles {
            self.load_role_policy(role).await?;
        }
        Ok(())
    }

    /// Remove the role from the engine entirely: permissions and every user
    /// binding to it.
    pub async fn purge_role(&self, role_id: &Uuid) -> Result<(), DomainError> {
        let subject = role_id.to_string();
        self.enforcer
            .delete_role(&subject)
            .await
            .map_err(|e| revoke_failed(&subject, e))?;
        info!(role_id = %role_id, "Role policy purged");
        Ok(())
    }

    async fn grant_role_permissions(&self, role: &Role) -> Result<usize, DomainError> {
        if role.menu_ids.is_empty() {
            return Ok(0);
        }

        let subject = role.subject();
        let menus = self.menus.find_by_ids(&role.menu_ids).await?;
        let mut granted = 0;
        for (path, method) in menus.iter().filter_map(|m| m.permission()) {
            self.enforcer
                .add_permission_for_role(&subject, path, method)
                .await
                .map_err(|e| grant_failed(&subject, e))?;
            granted += 1;
        }
        Ok(granted)
    }
}

fn grant_failed(subject: &str, e: EnforcerError) -> DomainError {
    warn!(subject, error = %e, "Failed to add authorization rule");
    DomainError::PolicyGrantFailed(format!("{subject}: {e}"))
}

fn revoke_failed(subject: &str, e: EnforcerError) -> DomainError {
    error!(subject, error = %e, "Failed to remove authorization rules, stale grants may remain");
    DomainError::PolicyRevokeFailed(format!("{subject}: {e}"))
}
