// ============================================================================
// RBAC Core - User Service
// File: crates/rbac-core/src/services/user_service.rs
// ============================================================================
//! User management. Every change to a user's roles or status is followed by
//! a policy sync so the engine mirrors storage.

use std::collections::HashMap;
use std::sync::Arc;

use rbac_security::PasswordService;
use rbac_shared::{PageResult, Pagination};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{RecordStatus, User, UserInput, UserQuery, UserSummary};
use crate::error::DomainError;
use crate::repositories::{RoleRepository, UserRepository};
use crate::services::PolicySynchronizer;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    policy: Arc<PolicySynchronizer>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        policy: Arc<PolicySynchronizer>,
    ) -> Self {
        Self { users, roles, policy }
    }

    /// Paged listing with each user's role names resolved.
    pub async fn query_page(&self, query: &UserQuery, page: Pagination) -> Result<PageResult<UserSummary>, DomainError> {
        let result = self.users.query_page(query, page).await?;

        let mut role_ids: Vec<Uuid> = result.list.iter().flat_map(|u| u.role_ids.iter().copied()).collect();
        role_ids.sort();
        role_ids.dedup();

        let names: HashMap<Uuid, String> = if role_ids.is_empty() {
            HashMap::new()
        } else {
            self.roles
                .find_by_ids(&role_ids)
                .await?
                .into_iter()
                .map(|r| (r.id, r.name))
                .collect()
        };

        Ok(result.map(|user| {
            let role_names = user
                .role_ids
                .iter()
                .filter_map(|id| names.get(id).cloned())
                .collect();
            UserSummary { user, role_names }
        }))
    }

    /// Fetch a user. The password hash is cleared.
    pub async fn get(&self, id: &Uuid) -> Result<User, DomainError> {
        let mut user = self.find(id).await?;
        user.password.clear();
        Ok(user)
    }

    pub async fn create(&self, input: UserInput, created_by: Option<Uuid>) -> Result<User, DomainError> {
        input.validate()?;

        let password = input
            .password
            .as_deref()
            .ok_or_else(|| DomainError::ValidationError("password: Password is required".to_string()))?;

        if self.users.check_user_name(input.user_name.trim()).await? {
            warn!(user_name = %input.user_name, "User name already exists");
            return Err(DomainError::UserNameAlreadyExists(input.user_name.trim().to_string()));
        }
        self.ensure_roles_exist(&input.role_ids).await?;

        let hash = hash_password(password)?;
        let user = User::new(input, hash, created_by)?;
        let mut created = self.users.create(&user).await?;
        info!(user_id = %created.id, user_name = %created.user_name, "User created");

        self.sync_policy(&created).await?;

        created.password.clear();
        Ok(created)
    }

    pub async fn update(&self, id: &Uuid, input: UserInput, modified_by: Option<Uuid>) -> Result<User, DomainError> {
        input.validate()?;

        let mut user = self.find(id).await?;

        let new_name = input.user_name.trim();
        if user.user_name != new_name && self.users.check_user_name(new_name).await? {
            warn!(user_name = %new_name, "User name already exists");
            return Err(DomainError::UserNameAlreadyExists(new_name.to_string()));
        }
        self.ensure_roles_exist(&input.role_ids).await?;

        let hash = input.password.as_deref().map(hash_password).transpose()?;
        user.apply(input, hash, modified_by)?;

        let mut updated = self.users.update(&user).await?;
        info!(user_id = %id, "User updated");

        self.sync_policy(&updated).await?;

        updated.password.clear();
        Ok(updated)
    }

    pub async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        self.find(id).await?;
        self.users.delete(id, removed_by).await?;
        info!(user_id = %id, "User deleted");
        self.policy.revoke_user(id).await
    }

    pub async fn delete_many(&self, ids: &[Uuid], removed_by: Option<Uuid>) -> Result<(), DomainError> {
        for id in ids {
            self.delete(id, removed_by).await?;
        }
        Ok(())
    }

    /// Disabling suspends the user's bindings; enabling reloads them.
    pub async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        self.find(id).await?;
        self.users.update_status(id, status).await?;
        info!(user_id = %id, status = status.as_str(), "User status updated");

        match status {
            RecordStatus::Enabled => self.policy.load_policy(id).await,
            RecordStatus::Disabled => self.policy.suspend_user(id).await,
        }
    }

    async fn find(&self, id: &Uuid) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    /// A disabled user keeps no bindings even after an update.
    async fn sync_policy(&self, user: &User) -> Result<(), DomainError> {
        if user.is_enabled() {
            self.policy.load_policy(&user.id).await
        } else {
            self.policy.suspend_user(&user.id).await
        }
    }

    async fn ensure_roles_exist(&self, role_ids: &[Uuid]) -> Result<(), DomainError> {
        if role_ids.is_empty() {
            return Ok(());
        }
        let found = self.roles.find_by_ids(role_ids).await?;
        if let Some(missing) = role_ids.iter().find(|id| !found.iter().any(|r| &r.id == *id)) {
            return Err(DomainError::ValidationError(format!("role_ids: unknown role {missing}")));
        }
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    PasswordService::hash(password).map_err(|e| DomainError::PasswordHashError(e.to_string()))
}
