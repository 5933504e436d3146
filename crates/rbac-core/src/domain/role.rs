// ============================================================================
// RBAC Core - Role Entity
// File: crates/rbac-core/src/domain/role.rs
// Description: Role with its granted menu set
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::RecordStatus;

/// Role entity. The resource menus in `menu_ids` make up the role's
/// permission policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub memo: Option<String>,
    pub status: RecordStatus,
    pub menu_ids: Vec<Uuid>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RoleInput {
    #[validate(length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"))]
    pub name: String,

    #[serde(default)]
    pub sequence: i32,

    #[validate(length(max = 1024, message = "Memo too long"))]
    pub memo: Option<String>,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(default)]
    pub menu_ids: Vec<Uuid>,
}

impl Role {
    pub fn new(input: RoleInput, created_by: Option<Uuid>) -> Result<Self, validator::ValidationErrors> {
        input.validate()?;

        let mut menu_ids = input.menu_ids;
        menu_ids.sort();
        menu_ids.dedup();

        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name.trim().to_string(),
            sequence: input.sequence,
            memo: input.memo,
            status: input.status,
            menu_ids,
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
            removed_at: None,
            removed_by: None,
        })
    }

    pub fn apply(
        &mut self,
        input: RoleInput,
        modified_by: Option<Uuid>,
    ) -> Result<(), validator::ValidationErrors> {
        input.validate()?;

        let mut menu_ids = input.menu_ids;
        menu_ids.sort();
        menu_ids.dedup();

        self.name = input.name.trim().to_string();
        self.sequence = input.sequence;
        self.memo = input.memo;
        self.status = input.status;
        self.menu_ids = menu_ids;
        self.modified_at = Some(Utc::now());
        self.modified_by = modified_by;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.removed_at.is_some()
    }

    /// Engine subject for this role.
    pub fn subject(&self) -> String {
        self.id.to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoleQuery {
    pub name: Option<String>,
    pub status: Option<RecordStatus>,
    /// Only roles whose menu set contains this menu.
    pub menu_id: Option<Uuid>,
}
