//! Role handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rbac_core::domain::{RecordStatus, Role, RoleInput, RoleQuery};
use rbac_shared::{PageResult, Pagination};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{parse_status, Actor, BatchParams};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RoleListParams {
    /// `page` (default) or `select`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    pub menu_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum RoleListing {
    Page(PageResult<Role>),
    Select(Vec<Role>),
}

/// GET /api/v1/roles
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<RoleListParams>,
) -> Result<Json<ApiResponse<RoleListing>>, ApiError> {
    let query = RoleQuery {
        name: params.name,
        status: parse_status(params.status.as_deref())?,
        menu_id: params.menu_id,
    };

    let listing = match params.kind.as_deref().unwrap_or("page") {
        "page" => {
            let page = Pagination::new(params.page, params.page_size);
            RoleListing::Page(state.roles.query_page(&query, page).await?)
        }
        "select" => RoleListing::Select(state.roles.query_select(&query).await?),
        other => return Err(ApiError::BadRequest(format!("Unknown listing type: {}", other))),
    };

    Ok(Json(ApiResponse::success(listing)))
}

/// GET /api/v1/roles/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Role>>, ApiError> {
    Ok(Json(ApiResponse::success(state.roles.get(&id).await?)))
}

/// POST /api/v1/roles
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<RoleInput>,
) -> Result<(StatusCode, Json<ApiResponse<Role>>), ApiError> {
    let role = state.roles.create(input, actor.0).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(role))))
}

/// PUT /api/v1/roles/{id}
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<RoleInput>,
) -> Result<Json<ApiResponse<Role>>, ApiError> {
    Ok(Json(ApiResponse::success(state.roles.update(&id, input, actor.0).await?)))
}

/// DELETE /api/v1/roles/{id}
pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.roles.delete(&id, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// DELETE /api/v1/roles?batch=id1,id2
pub async fn delete_many(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<BatchParams>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.roles.delete_many(&params.ids()?, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/roles/{id}/enable
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.roles.update_status(&id, RecordStatus::Enabled).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/roles/{id}/disable
pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.roles.update_status(&id, RecordStatus::Disabled).await?;
    Ok(Json(ApiResponse::ok()))
}
