// ============================================================================
// RBAC Infrastructure - PostgreSQL User Repository
// File: crates/rbac-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_shared::{PageResult, Pagination};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;
use uuid::Uuid;

use rbac_core::domain::{RecordStatus, User, UserQuery, UserRole, UserRoleQuery};
use rbac_core::error::DomainError;
use rbac_core::repositories::UserRepository;

use super::{db_error, is_unique_violation};

const USER_COLUMNS: &str = r#"
    id, user_name, real_name, password, email, phone, status,
    created_at, created_by, modified_at, modified_by,
    removed_at, removed_by
"#;

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn role_ids_for(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DomainError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<UserRoleRow> = sqlx::query_as(
            "SELECT user_id, role_id FROM user_roles WHERE user_id = ANY($1) ORDER BY role_id",
        )
        .bind(user_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading user roles", e))?;

        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            map.entry(row.user_id).or_default().push(row.role_id);
        }
        Ok(map)
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct UserRow {
    pub id: Uuid,
    pub user_name: String,
    pub real_name: String,
    pub password: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct UserRoleRow {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

impl UserRow {
    fn into_user(self, role_ids: Vec<Uuid>) -> User {
        User {
            id: self.id,
            user_name: self.user_name,
            real_name: self.real_name,
            password: self.password,
            email: self.email,
            phone: self.phone,
            status: RecordStatus::from_code(self.status).unwrap_or_default(),
            role_ids,
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: self.modified_at,
            modified_by: self.modified_by,
            removed_at: self.removed_at,
            removed_by: self.removed_by,
        }
    }
}

fn map_write_error(context: &str, user: &User, e: sqlx::Error) -> DomainError {
    if is_unique_violation(&e) {
        return DomainError::UserNameAlreadyExists(user.user_name.clone());
    }
    db_error(context, e)
}

async fn replace_roles(tx: &mut Transaction<'_, Postgres>, user: &User) -> Result<(), DomainError> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("clearing user roles", e))?;

    for role_id in &user.role_ids {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user.id)
            .bind(role_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("inserting user role", e))?;
    }
    Ok(())
}

fn push_page_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    qb.push(" WHERE removed_at IS NULL");
    if let Some(user_name) = query.user_name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND user_name ILIKE ").push_bind(format!("%{user_name}%"));
    }
    if let Some(real_name) = query.real_name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND real_name ILIKE ").push_bind(format!("%{real_name}%"));
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.code());
    }
    if let Some(role_id) = query.role_id {
        qb.push(" AND id IN (SELECT user_id FROM user_roles WHERE role_id = ")
            .push_bind(role_id)
            .push(")");
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<User>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND removed_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding user by id", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role_ids = self.role_ids_for(&[row.id]).await?.remove(&row.id).unwrap_or_default();
        Ok(Some(row.into_user(role_ids)))
    }

    async fn check_user_name(&self, user_name: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE user_name = $1 AND removed_at IS NULL)",
        )
        .bind(user_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking user name", e))
    }

    async fn create(&self, user: &User) -> Result<User, DomainError> {
        info!("Creating user: {}", user.user_name);

        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (
                id, user_name, real_name, password, email, phone, status,
                created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.user_name)
        .bind(&user.real_name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.code())
        .bind(user.created_at)
        .bind(user.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error("creating user", user, e))?;

        replace_roles(&mut tx, user).await?;
        tx.commit().await.map_err(|e| db_error("committing user create", e))?;

        Ok(row.into_user(user.role_ids.clone()))
    }

    async fn update(&self, user: &User) -> Result<User, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users SET
                user_name = $2, real_name = $3, password = $4, email = $5,
                phone = $6, status = $7, modified_at = NOW(), modified_by = $8
            WHERE id = $1 AND removed_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.user_name)
        .bind(&user.real_name)
        .bind(&user.password)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.status.code())
        .bind(user.modified_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error("updating user", user, e))?;

        let Some(row) = row else {
            return Err(DomainError::not_found("User", user.id));
        };

        replace_roles(&mut tx, user).await?;
        tx.commit().await.map_err(|e| db_error("committing user update", e))?;

        Ok(row.into_user(user.role_ids.clone()))
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE users SET status = $2, modified_at = NOW() WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(status.code())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("updating user status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let result = sqlx::query(
            "UPDATE users SET removed_at = NOW(), removed_by = $2 WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(removed_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("deleting user", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("User", id));
        }

        sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("clearing user roles", e))?;

        tx.commit().await.map_err(|e| db_error("committing user delete", e))?;
        Ok(())
    }

    async fn query_page(&self, query: &UserQuery, page: Pagination) -> Result<PageResult<User>, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_page_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting users", e))?;

        let mut list = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_page_filters(&mut list, query);
        list.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = list
            .build_query_as::<UserRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("querying users", e))?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut roles = self.role_ids_for(&ids).await?;

        let users = rows
            .into_iter()
            .map(|row| {
                let role_ids = roles.remove(&row.id).unwrap_or_default();
                row.into_user(role_ids)
            })
            .collect();

        Ok(PageResult::new(users, total, page))
    }

    async fn query_user_roles(&self, query: &UserRoleQuery) -> Result<Vec<UserRole>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            "SELECT ur.user_id, ur.role_id FROM user_roles ur JOIN users u ON u.id = ur.user_id WHERE u.removed_at IS NULL",
        );
        if let Some(user_id) = query.user_id {
            qb.push(" AND ur.user_id = ").push_bind(user_id);
        }
        if let Some(role_id) = query.role_id {
            qb.push(" AND ur.role_id = ").push_bind(role_id);
        }
        if let Some(status) = query.user_status {
            qb.push(" AND u.status = ").push_bind(status.code());
        }
        qb.push(" ORDER BY ur.user_id, ur.role_id");

        let rows = qb
            .build_query_as::<UserRoleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("querying user roles", e))?;

        Ok(rows
            .into_iter()
            .map(|r| UserRole {
                user_id: r.user_id,
                role_id: r.role_id,
            })
            .collect())
    }
}
