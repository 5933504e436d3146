// ============================================================================
// RBAC Infrastructure - PostgreSQL Menu Repository
// File: crates/rbac-infrastructure/src/database/postgres/menu_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rbac_shared::{PageResult, Pagination};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use rbac_core::domain::{Menu, MenuQuery, MenuSelectQuery, MenuType, RecordStatus};
use rbac_core::error::DomainError;
use rbac_core::repositories::MenuRepository;

use super::{db_error, is_unique_violation};

/// Partial unique index on live `(parent_id, code)` pairs.
const SIBLING_CODE_INDEX: &str = "uq_menus_parent_code";

const MENU_COLUMNS: &str = r#"
    id, code, name, menu_type, sequence, icon, path, method,
    parent_id, level_code, status,
    created_at, created_by, modified_at, modified_by,
    removed_at, removed_by
"#;

pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct MenuRow {
    pub id: Uuid,
    pub code: Option<String>,
    pub name: String,
    pub menu_type: i16,
    pub sequence: i32,
    pub icon: Option<String>,
    pub path: Option<String>,
    pub method: Option<String>,
    pub parent_id: Option<Uuid>,
    pub level_code: String,
    pub status: i16,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<Uuid>,
    pub removed_at: Option<DateTime<Utc>>,
    pub removed_by: Option<Uuid>,
}

impl From<MenuRow> for Menu {
    fn from(row: MenuRow) -> Self {
        Menu {
            id: row.id,
            code: row.code,
            name: row.name,
            menu_type: MenuType::from_code(row.menu_type).unwrap_or_default(),
            sequence: row.sequence,
            icon: row.icon,
            path: row.path,
            method: row.method,
            parent_id: row.parent_id,
            level_code: row.level_code,
            status: RecordStatus::from_code(row.status).unwrap_or_default(),
            created_at: row.created_at,
            created_by: row.created_by,
            modified_at: row.modified_at,
            modified_by: row.modified_by,
            removed_at: row.removed_at,
            removed_by: row.removed_by,
        }
    }
}

fn push_page_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &MenuQuery) {
    qb.push(" WHERE removed_at IS NULL");
    if let Some(name) = query.name.as_deref().filter(|n| !n.is_empty()) {
        qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
    }
    if let Some(parent_id) = query.parent_id {
        qb.push(" AND parent_id = ").push_bind(parent_id);
    }
    if let Some(status) = query.status {
        qb.push(" AND status = ").push_bind(status.code());
    }
    if let Some(menu_type) = query.menu_type {
        qb.push(" AND menu_type = ").push_bind(menu_type.code());
    }
}

fn map_write_error(context: &str, menu: &Menu, e: sqlx::Error) -> DomainError {
    let sibling_code = matches!(&e, sqlx::Error::Database(db) if db.constraint() == Some(SIBLING_CODE_INDEX));
    if sibling_code && is_unique_violation(&e) {
        return DomainError::MenuCodeAlreadyExists(menu.code.clone().unwrap_or_default());
    }
    db_error(context, e)
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Menu>, DomainError> {
        let row: Option<MenuRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = $1 AND removed_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding menu by id", e))?;

        Ok(row.map(Into::into))
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Menu>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<MenuRow> = sqlx::query_as(&format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE id = ANY($1) AND removed_at IS NULL ORDER BY level_code"
        ))
        .bind(ids.to_vec())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding menus by ids", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn query_level_codes_by_parent_id(&self, parent_id: Option<Uuid>) -> Result<Vec<String>, DomainError> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT level_code FROM menus
            WHERE parent_id IS NOT DISTINCT FROM $1 AND removed_at IS NULL
            ORDER BY level_code
            "#,
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("querying sibling level codes", e))
    }

    async fn check_code(&self, code: &str, parent_id: Option<Uuid>) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM menus
                WHERE code = $1 AND parent_id IS NOT DISTINCT FROM $2 AND removed_at IS NULL
            )
            "#,
        )
        .bind(code)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking menu code", e))
    }

    async fn has_children(&self, id: &Uuid) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM menus WHERE parent_id = $1 AND removed_at IS NULL)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("checking menu children", e))
    }

    async fn create(&self, menu: &Menu) -> Result<Menu, DomainError> {
        info!("Creating menu {} at level code {}", menu.name, menu.level_code);

        let row: MenuRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO menus (
                id, code, name, menu_type, sequence, icon, path, method,
                parent_id, level_code, status, created_at, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(menu.id)
        .bind(&menu.code)
        .bind(&menu.name)
        .bind(menu.menu_type.code())
        .bind(menu.sequence)
        .bind(&menu.icon)
        .bind(&menu.path)
        .bind(&menu.method)
        .bind(menu.parent_id)
        .bind(&menu.level_code)
        .bind(menu.status.code())
        .bind(menu.created_at)
        .bind(menu.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error("creating menu", menu, e))?;

        Ok(row.into())
    }

    async fn update(&self, menu: &Menu) -> Result<Menu, DomainError> {
        // parent_id and level_code only change through update_with_level_code.
        let row: Option<MenuRow> = sqlx::query_as(&format!(
            r#"
            UPDATE menus SET
                code = $2, name = $3, menu_type = $4, sequence = $5, icon = $6,
                path = $7, method = $8, status = $9,
                modified_at = NOW(), modified_by = $10
            WHERE id = $1 AND removed_at IS NULL
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(menu.id)
        .bind(&menu.code)
        .bind(&menu.name)
        .bind(menu.menu_type.code())
        .bind(menu.sequence)
        .bind(&menu.icon)
        .bind(&menu.path)
        .bind(&menu.method)
        .bind(menu.status.code())
        .bind(menu.modified_by)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_write_error("updating menu", menu, e))?;

        row.map(Into::into)
            .ok_or_else(|| DomainError::not_found("Menu", menu.id))
    }

    async fn update_with_level_code(&self, menu: &Menu, old_code: &str, new_code: &str) -> Result<Menu, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        // Descendants first, matched on the old prefix before the node itself moves.
        let rewritten = sqlx::query(
            r#"
            UPDATE menus
            SET level_code = $1 || substring(level_code FROM $2)
            WHERE level_code LIKE $3 || '%' AND id <> $4 AND removed_at IS NULL
            "#,
        )
        .bind(new_code)
        .bind(old_code.len() as i32 + 1)
        .bind(old_code)
        .bind(menu.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("rewriting descendant level codes", e))?
        .rows_affected();

        let row: Option<MenuRow> = sqlx::query_as(&format!(
            r#"
            UPDATE menus SET
                code = $2, name = $3, menu_type = $4, sequence = $5, icon = $6,
                path = $7, method = $8, parent_id = $9, status = $10,
                level_code = $11, modified_at = NOW(), modified_by = $12
            WHERE id = $1 AND removed_at IS NULL
            RETURNING {MENU_COLUMNS}
            "#
        ))
        .bind(menu.id)
        .bind(&menu.code)
        .bind(&menu.name)
        .bind(menu.menu_type.code())
        .bind(menu.sequence)
        .bind(&menu.icon)
        .bind(&menu.path)
        .bind(&menu.method)
        .bind(menu.parent_id)
        .bind(menu.status.code())
        .bind(new_code)
        .bind(menu.modified_by)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_write_error("moving menu", menu, e))?;

        let Some(row) = row else {
            return Err(DomainError::not_found("Menu", menu.id));
        };

        tx.commit().await.map_err(|e| db_error("committing menu move", e))?;

        info!("Moved menu {} from {} to {} ({} descendants)", menu.id, old_code, new_code, rewritten);
        Ok(row.into())
    }

    async fn update_status(&self, id: &Uuid, status: RecordStatus) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE menus SET status = $2, modified_at = NOW() WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(status.code())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("updating menu status", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Menu", id));
        }
        Ok(())
    }

    async fn delete(&self, id: &Uuid, removed_by: Option<Uuid>) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE menus SET removed_at = NOW(), removed_by = $2 WHERE id = $1 AND removed_at IS NULL",
        )
        .bind(id)
        .bind(removed_by)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("deleting menu", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Menu", id));
        }
        Ok(())
    }

    async fn query_page(&self, query: &MenuQuery, page: Pagination) -> Result<PageResult<Menu>, DomainError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM menus");
        push_page_filters(&mut count, query);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting menus", e))?;

        let mut list = QueryBuilder::<Postgres>::new(format!("SELECT {MENU_COLUMNS} FROM menus"));
        push_page_filters(&mut list, query);
        list.push(" ORDER BY level_code LIMIT ")
            .push_bind(page.limit() as i64)
            .push(" OFFSET ")
            .push_bind(page.offset() as i64);

        let rows = list
            .build_query_as::<MenuRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("querying menus", e))?;

        Ok(PageResult::new(rows.into_iter().map(Into::into).collect(), total, page))
    }

    async fn query_select(&self, query: &MenuSelectQuery) -> Result<Vec<Menu>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {MENU_COLUMNS} FROM menus WHERE removed_at IS NULL"
        ));
        if let Some(name) = query.name.as_deref().filter(|n| !n.is_empty()) {
            qb.push(" AND name ILIKE ").push_bind(format!("%{name}%"));
        }
        if let Some(status) = query.status {
            qb.push(" AND status = ").push_bind(status.code());
        }
        if !query.types.is_empty() {
            let codes: Vec<i16> = query.types.iter().map(|t| t.code()).collect();
            qb.push(" AND menu_type = ANY(").push_bind(codes).push(")");
        }
        qb.push(" ORDER BY level_code");

        let rows = qb
            .build_query_as::<MenuRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("selecting menus", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;
    use std::fmt;

    use rbac_core::domain::MenuInput;
    use sqlx::error::{DatabaseError, ErrorKind};

    #[derive(Debug)]
    struct UniqueViolation(&'static str);

    impl fmt::Display for UniqueViolation {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "duplicate key value violates unique constraint \"{}\"", self.0)
        }
    }

    impl std::error::Error for UniqueViolation {}

    impl DatabaseError for UniqueViolation {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed("23505"))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn constraint(&self) -> Option<&str> {
            Some(self.0)
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    fn users_menu() -> Menu {
        let input = MenuInput {
            name: "Users".to_string(),
            code: Some("users".to_string()),
            ..Default::default()
        };
        Menu::new(input, "01".to_string(), None).unwrap()
    }

    #[test]
    fn test_sibling_code_violation_is_a_code_conflict() {
        let e = sqlx::Error::Database(Box::new(UniqueViolation(SIBLING_CODE_INDEX)));
        let err = map_write_error("creating menu", &users_menu(), e);
        assert!(matches!(err, DomainError::MenuCodeAlreadyExists(code) if code == "users"));
    }

    #[test]
    fn test_other_violations_stay_database_errors() {
        let e = sqlx::Error::Database(Box::new(UniqueViolation("uq_menus_level_code")));
        let err = map_write_error("creating menu", &users_menu(), e);
        assert!(matches!(err, DomainError::DatabaseError(_)));
    }
}
