//! Menu handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rbac_core::domain::{Menu, MenuInput, MenuQuery, MenuSelectQuery, MenuTreeNode, MenuType, RecordStatus};
use rbac_shared::{PageResult, Pagination};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{parse_status, Actor, BatchParams};
use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MenuListParams {
    /// `page` (default) or `tree`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub name: Option<String>,
    pub parent_id: Option<Uuid>,
    pub status: Option<String>,
    pub mtype: Option<String>,
    /// Tree only: restrict to navigable menu types.
    pub is_menu: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum MenuListing {
    Page(PageResult<Menu>),
    Tree(Vec<MenuTreeNode>),
}

/// GET /api/v1/menus
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<MenuListParams>,
) -> Result<Json<ApiResponse<MenuListing>>, ApiError> {
    let status = parse_status(params.status.as_deref())?;

    let listing = match params.kind.as_deref().unwrap_or("page") {
        "page" => {
            let menu_type = match params.mtype.as_deref().filter(|s| !s.is_empty()) {
                Some(raw) => Some(
                    MenuType::from_str(raw)
                        .ok_or_else(|| ApiError::BadRequest(format!("Unknown menu type: {}", raw)))?,
                ),
                None => None,
            };
            let query = MenuQuery {
                name: params.name,
                parent_id: params.parent_id,
                status,
                menu_type,
            };
            let page = Pagination::new(params.page, params.page_size);
            MenuListing::Page(state.menus.query_page(&query, page).await?)
        }
        "tree" => {
            let query = MenuSelectQuery {
                name: params.name,
                status,
                types: if params.is_menu.unwrap_or(false) {
                    MenuType::navigable()
                } else {
                    Vec::new()
                },
            };
            MenuListing::Tree(state.menus.query_tree(&query).await?)
        }
        other => return Err(ApiError::BadRequest(format!("Unknown listing type: {}", other))),
    };

    Ok(Json(ApiResponse::success(listing)))
}

/// GET /api/v1/menus/{id}
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Menu>>, ApiError> {
    Ok(Json(ApiResponse::success(state.menus.get(&id).await?)))
}

/// POST /api/v1/menus
pub async fn create(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<MenuInput>,
) -> Result<(StatusCode, Json<ApiResponse<Menu>>), ApiError> {
    let menu = state.menus.create(input, actor.0).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(menu))))
}

/// PUT /api/v1/menus/{id}
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(input): Json<MenuInput>,
) -> Result<Json<ApiResponse<Menu>>, ApiError> {
    Ok(Json(ApiResponse::success(state.menus.update(&id, input, actor.0).await?)))
}

/// DELETE /api/v1/menus/{id}
pub async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.menus.delete(&id, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// DELETE /api/v1/menus?batch=id1,id2
pub async fn delete_many(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<BatchParams>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.menus.delete_many(&params.ids()?, actor.0).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/menus/{id}/enable
pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.menus.update_status(&id, RecordStatus::Enabled).await?;
    Ok(Json(ApiResponse::ok()))
}

/// PATCH /api/v1/menus/{id}/disable
pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.menus.update_status(&id, RecordStatus::Disabled).await?;
    Ok(Json(ApiResponse::ok()))
}
