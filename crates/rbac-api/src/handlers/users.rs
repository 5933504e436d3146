//! User handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rbac_core::domain::{RecordStatus, User, UserInput, UserQuery, UserSummary};
use rbac_shared::{PageResult, Pagination};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{parse_status, Actor, BatchParams};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub user_name: Option<String>,
    pub real_name: Option<String>,
    pub status: Option<String>,
    pub role_id: Option<Uuid>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// GET /api/v1/users
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<UserListParams>,
) -> Result<Json<ApiResponse<PageResult<UserSummary>>>, ApiError> {
    let query = UserQuery {
        user_name: params.user_name,
        real_name: params.real_name,
        status: parse_status(params.status.as_deref())?,
        role_id: params.role_id,
    };
    let page = Pagination::new(params.page, params.page_size);
    Ok(Json(ApiResponse::success(state.users.query_page(&query, page).await?)))
}

/// GET /api/v1/users/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(Json(ApiResponse::success(state.users.get(&id).await?)))
}

/// POST /api/v1/users
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    let user = state.users.create(input, actor.0).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(user))))
}

/// PUT /api/v1/users/{id}
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<UserInput>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    Ok(Json(ApiResponse::success(state.users.update(&id, input, actor.0).await?)))
}

/// DELETE /api/v1/users/{id}
pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.users.delete(&id, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// DELETE /api/v1/users?batch=id1,id2
pub async fn delete_many(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<BatchParams>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.users.delete_many(&params.ids()?, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/users/{id}/enable
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.users.update_status(&id, RecordStatus::Enabled).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/users/{id}/disable
pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.users.update_status(&id, RecordStatus::Disabled).await?;
    Ok(Json(ApiResponse::ok()))
}
