// ============================================================================
// RBAC Infrastructure - PostgreSQL Role Repository
// File: crates/rbac-infrastructure/src/database/postgres/role_repo_impl.rs
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_shared::{PageResult, Pagination};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::info;
use uuid::Uuid;

use rbac_core::domain::{RecordStatus, Role, RoleQuery};
use rbac_core::error::DomainError;
use rbac_core::repositories::RoleRepository;

use super::{db_error, is_unique_violation};

const ROLE_COLUMNS: &str = r#"
    id, name, sequence, memo, status,
    created_at, created_by, modified_at, modified_by,
    removed_at, removed_by
"#;

pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn menu_ids_for(&self, role_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Uuid>>, DomainError> {
        if role_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<RoleMenuRow> = sqlx::query_as(
            "SELECT role_id, menu_id FROM role_menus WHERE role_id = ANY($1) ORDER BY menu_id",
        )
        .bind(role_ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading role menus", e))?;

        let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            map.entry(row.role_id).or_default().push(row.menu_id);
        }
        Ok(map)
    }

    async fn with_menus(&self, rows: Vec<RoleRow>) -> Result<Vec<Role>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut menus = self.menu_ids_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let menu_ids = menus.remove(&row.id).unwrap_or_default();
                row.into_role(menu_ids)
            })
            .collect())
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct RoleRow {
    pub id: Uuid,
    pub name: String,
    pub sequence: i32,
    pub memo: Option<String>,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

#[derive(Debug, FromRow)]
struct RoleMenuRow {
    pub role_id: Uuid,
    pub menu_id: Uuid,
}

impl RoleRow {
    fn into_role(self, menu_ids: Vec<Uuid>) -> Role {
        Role {
            id: self.id,
            name: self.name,
            sequence: self.sequence,
            memo: self.memo,
            status: RecordStatus::from_code(self.status).unwrap_or_default(),
            menu_ids,
            created_at: self.created_at,
            created_by: self.created_by,
            modified_at: self.modified_at,
            modified_by: self.modified_by,
            removed_at: self.removed_at,
            removed_by: self.removed_by,
        }
    }
}

fn map_write_error(context: &str, role: &Role, e: sqlx::Error) -> DomainError {
    if is_unique_violation(&e) {
        return DomainError::RoleNameAlreadyExists(role.name.clone());
    }
    db_error(context, e)
}

async fn replace_menus(tx: &mut Transaction<'_, Postgres>, role: &Role) -> Result<(), DomainError> {
    sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
        .bind(role.id)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("clearing role menus", e))?;

    for menu_id in &role.menu_ids {
        sqlx::query("INSERT INTO role_menus (role_id, menu_id) VALUES ($1, $2)")
            .bind(role.id)
            .bind(menu_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| db_error("inserting role menu", e))?;
    }
    Ok(())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &RoleQuery) {
    qb.push(" WHERE removed_at IS NULL");
    if let Some(name) = query.name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.code());
    }
    if let Some(menu_id) = query.menu_id {
        qb.push(" AND id IN (SELECT role_id FROM role_menus WHERE menu_id = ")
            .push_bind(menu_id)
            .push(")");
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, DomainError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1 AND removed_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding role by id", e))?;

        match row {
            Some(row) => Ok(self.with_menus(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Role>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = ANY($1) AND removed_at IS NULL ORDER BY sequence, name"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding roles by ids", e))?;

        self.with_menus(rows).await
    }

    async fn check_name(&self, name: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM roles WHERE name = $1 AND removed_at IS NULL)",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking role name", e))
    }

    async fn create(&self, role: &Role) -> Result<Role, DomainError> {
        info!("Creating role: {}", role.name);

        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let row: RoleRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO roles (id, name, sequence, memo, status, created_at, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(role.sequence)
        .bind(&role.memo)
        .bind(role.status.code())
        .bind(role.created_at)
        .bind(role.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error("creating role", role, e))?;

        replace_menus(&mut tx, role).await?;
        tx.commit().await.map_err(|e| db_error("committing role create", e))?;

        Ok(row.into_role(role.menu_ids.clone()))
    }

    async fn update(&self, role: &Role) -> Result<Role, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let row: Option<RoleRow> = sqlx::query_as(&format!(
            r#"
            UPDATE roles SET
                name = $2, sequence = $3, memo = $4, status = $5,
                modified_at = NOW(), modified_by = $6
            WHERE id = $1 AND removed_at IS NULL
            RETURNING {ROLE_COLUMNS}
            "#
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(role.sequence)
        .bind(&role.memo)
        .bind(role.status.code())
        .bind(role.modified_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error("updating role", role, e))?;

        let Some(row) = row else {
            return Err(DomainError::not_found("Role", role.id));
        };

        replace_menus(&mut tx, role).await?;
        tx.commit().await.map_err(|e| db_error("committing role update", e))?;

        Ok(row.into_role(role.menu_ids.clone()))
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE roles SET status = $2, modified_at = NOW() WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(status.code())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("updating role status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Role", id));
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        let result = sqlx::query(
            "UPDATE roles SET removed_at = NOW(), removed_by = $2 WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(removed_by)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("deleting role", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Role", id));
        }

        sqlx::query("DELETE FROM role_menus WHERE role_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("clearing role menus", e))?;

        tx.commit().await.map_err(|e| db_error("committing role delete", e))?;
        Ok(())
    }

    async fn query_page(&self, query: &RoleQuery, page: Pagination) -> Result<PageResult<Role>, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM roles");
        push_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting roles", e))?;

        let mut list = QueryBuilder::<Postgres>::new(format!("SELECT {ROLE_COLUMNS} FROM roles"));
        push_filters(&mut list, query);
        list.push(" ORDER BY sequence, name LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = list
            .build_query_as::<RoleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("querying roles", e))?;

        Ok(PageResult::new(self.with_menus(rows).await?, total, page))
    }

    async fn query_select(&self, query: &RoleQuery) -> Result<Vec<Role>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT {ROLE_COLUMNS} FROM roles"));
        push_filters(&mut qb, query);
        qb.push(" ORDER BY sequence, name");

        let rows = qb
            .build_query_as::<RoleRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("selecting roles", e))?;

        self.with_menus(rows).await
    }

    async fn is_in_use(&self, id: &Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM user_roles ur
                JOIN users u ON u.id = ur.user_id
                WHERE ur.role_id = $1 AND u.removed_at IS NULL
            )
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking role usage", e))
    }
}
