//! User domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::status::RecordStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub real_name: String,

    /// Argon2 hash. Never serialized.
    #[serde(skip_serializing, default)]
    pub password: String,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: RecordStatus,
    pub role_ids: Vec<Uuid>,

    // Audit fields
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

/// Client supplied user fields. `password` is required on create and
/// optional on update (absent keeps the stored hash).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, max = 64, message = "User name must be between 1 and 64 characters"))]
    pub user_name: String,

    #[validate(length(min = 1, max = 64, message = "Real name must be between 1 and 64 characters"))]
    pub real_name: String,

    #[validate(length(min = 6, max = 128, message = "Password must be between 6 and 128 characters"))]
    pub password: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(max = 32, message = "Phone too long"))]
    pub phone: Option<String>,

    #[serde(default)]
    pub status: RecordStatus,

    #[serde(default)]
    pub role_ids: Vec<Uuid>,
}

impl User {
    /// Build a user from validated input and an already hashed password.
    pub fn new(
        input: UserInput,
        password_hash: String,
        created_by: Option<Uuid>,
    ) -> Result<Self, validator::ValidationErrors> {
        input.validate()?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_name: input.user_name.trim().to_string(),
            real_name: input.real_name.trim().to_string(),
            password: password_hash,
            email: input.email.map(|e| e.trim().to_lowercase()),
            phone: input.phone,
            status: input.status,
            role_ids: dedup(input.role_ids),
            created_at: Utc::now(),
            created_by,
            modified_at: None,
            modified_by: None,
            removed_at: None,
            removed_by: None,
        })
    }

    /// Overwrite profile fields and the role set. The password is replaced
    /// only when a new hash is given.
    pub fn apply(
        &mut self,
        input: UserInput,
        password_hash: Option<String>,
        modified_by: Option<Uuid>,
    ) -> Result<(), validator::ValidationErrors> {
        input.validate()?;

        self.user_name = input.user_name.trim().to_string();
        self.real_name = input.real_name.trim().to_string();
        if let Some(hash) = password_hash {
            self.password = hash;
        }
        self.email = input.email.map(|e| e.trim().to_lowercase());
        self.phone = input.phone;
        self.status = input.status;
        self.role_ids = dedup(input.role_ids);
        self.modified_at = Some(Utc::now());
        self.modified_by = modified_by;
        Ok(())
    }

    pub fn is_deleted(&self) -> bool {
        self.removed_at.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.status.is_enabled() && !self.is_deleted()
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub user_name: Option<String>,
    pub real_name: Option<String>,
    pub status: Option<RecordStatus>,
    pub role_id: Option<Uuid>,
}

/// One row of the user to role assignment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

#[derive(Debug, Clone, Default)]
pub struct UserRoleQuery {
    pub user_id: Option<Uuid>,
    pub role_id: Option<Uuid>,
    /// Restrict to users in this status. Deleted users never match.
    pub user_status: Option<RecordStatus>,
}

/// List row: the user plus the names of its roles.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    #[serde(flatten)]
    pub user: User,
    pub role_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> UserInput {
        UserInput {
            user_name: "alice".to_string(),
            real_name: "Alice".to_string(),
            password: Some("secret123".to_string()),
            email: Some("Alice@Example.com".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_password_is_never_serialized() {
        let user = User::new(input(), "$argon2id$hash".to_string(), None).unwrap();
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["user_name"], "alice");
        assert_eq!(json["email"], "alice@example.com");
    }

    #[test]
    fn test_short_password_is_rejected() {
        let mut bad = input();
        bad.password = Some("123".to_string());
        assert!(User::new(bad, String::new(), None).is_err());
    }

    #[test]
    fn test_role_ids_are_deduplicated() {
        let role = Uuid::new_v4();
        let mut with_roles = input();
        with_roles.role_ids = vec![role, role];
        let user = User::new(with_roles, "h".to_string(), None).unwrap();
        assert_eq!(user.role_ids, vec![role]);
    }

    #[test]
    fn test_apply_keeps_hash_without_new_password() {
        let mut user = User::new(input(), "old".to_string(), None).unwrap();
        let mut update = input();
        update.password = None;
        update.status = RecordStatus::Disabled;
        user.apply(update, None, None).unwrap();
        assert_eq!(user.password, "old");
        assert!(!user.is_enabled());
    }

    #[test]
    fn test_summary_flattens_user() {
        let user = User::new(input(), "h".to_string(), None).unwrap();
        let summary = UserSummary { user, role_names: vec!["admin".to_string()] };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["role_names"][0], "admin");
        assert!(json.get("password").is_none());
    }
}
