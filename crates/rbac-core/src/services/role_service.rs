//! Role management with permission policy sync

use std::sync::Arc;

use rbac_shared::{PageResult, Pagination};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{RecordStatus, Role, RoleInput, RoleQuery};
use crate::error::DomainError;
use crate::repositories::RoleRepository;
use crate::services::PolicySynchronizer;

pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
    policy: Arc<PolicySynchronizer>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleRepository>, policy: Arc<PolicySynchronizer>) -> Self {
        Self { roles, policy }
    }

    pub async fn query_page(&self, query: &RoleQuery, page: Pagination) -> Result<PageResult<Role>, DomainError> {
        self.roles.query_page(query, page).await
    }

    pub async fn query_select(&self, query: &RoleQuery) -> Result<Vec<Role>, DomainError> {
        self.roles.query_select(query).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Role, DomainError> {
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Role", id))
    }

    pub async fn create(&self, input: RoleInput, created_by: Option<Uuid>) -> Result<Role, DomainError> {
        input.validate()?;

        let name = input.name.trim().to_string();
        if self.roles.check_name(&name).await? {
            warn!(name = %name, "Role name already exists");
            return Err(DomainError::RoleNameAlreadyExists(name));
        }

        let role = Role::new(input, created_by)?;
        let created = self.roles.create(&role).await?;
        info!(role_id = %created.id, name = %created.name, "Role created");

        self.policy.load_role_policy(&created).await?;
        Ok(created)
    }

    pub async fn update(&self, id: &Uuid, input: RoleInput, modified_by: Option<Uuid>) -> Result<Role, DomainError> {
        input.validate()?;

        let mut role = self.get(id).await?;

        let name = input.name.trim().to_string();
        if role.name != name && self.roles.check_name(&name).await? {
            warn!(name = %name, "Role name already exists");
            return Err(DomainError::RoleNameAlreadyExists(name));
        }

        role.apply(input, modified_by)?;
        let updated = self.roles.update(&role).await?;
        info!(role_id = %id, "Role updated");

        self.policy.load_role_policy(&updated).await?;
        Ok(updated)
    }

    /// Refused while any user still holds the role.
    pub async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        self.get(id).await?;

        if self.roles.is_in_use(id).await? {
            warn!(role_id = %id, "Rejected delete of role in use");
            return Err(DomainError::RoleInUse);
        }

        self.roles.delete(id, removed_by).await?;
        info!(role_id = %id, "Role deleted");

        self.policy.purge_role(id).await
    }

    pub async fn delete_many(&self, ids: &[Uuid], removed_by: Option<Uuid>) -> Result<(), DomainError> {
        for id in ids {
            self.delete(id, removed_by).await?;
        }
        Ok(())
    }

    pub async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let mut role = self.get(id).await?;
        self.roles.update_status(id, status).await?;
        info!(role_id = %id, status = status.as_str(), "Role status updated");

        role.status = status;
        self.policy.load_role_policy(&role).await
    }
}
