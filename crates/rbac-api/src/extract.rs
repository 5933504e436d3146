//! Request helpers shared by the handlers

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use rbac_core::domain::RecordStatus;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Caller identity placed in request extensions by the authorization middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub subject: String,
    /// `None` when the subject is not a user record id (e.g. the root user).
    pub id: Option<Uuid>,
}

/// Audit actor for `created_by` / `modified_by` / `removed_by`.
/// Empty when authorization is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actor(pub Option<Uuid>);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Actor(parts.extensions.get::<CurrentUser>().and_then(|u| u.id)))
    }
}

/// `?batch=id1,id2` on collection deletes.
#[derive(Debug, Deserialize)]
pub struct BatchParams {
    pub batch: String,
}

impl BatchParams {
    pub fn ids(&self) -> Result<Vec<Uuid>, ApiError> {
        self.batch
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Uuid::parse_str(s).map_err(|_| ApiError::BadRequest(format!("Invalid id in batch: {}", s)))
            })
            .collect()
    }
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<RecordStatus>, ApiError> {
    match raw.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => RecordStatus::from_str(s)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", s))),
    }
}
