//! In-memory repository implementations
//!
//! All three repositories share one [`MemoryStore`] so cross-table questions
//! (role in use, bindings of enabled users) see a consistent view. Every
//! write takes the relevant write lock for its whole duration, which gives
//! the same atomicity the PostgreSQL adapters get from transactions.

mod menu;
mod role;
mod user;

use std::collections::HashMap;
use std::sync::Arc;

use rbac_core::domain::{Menu, Role, User};
use rbac_shared::{PageResult, Pagination};
use tokio::sync::RwLock;
use uuid::Uuid;

pub use menu::InMemoryMenuRepository;
pub use role::InMemoryRoleRepository;
pub use user::InMemoryUserRepository;

#[derive(Default)]
pub struct MemoryStore {
    menus: RwLock<HashMap<Uuid, Menu>>,
    users: RwLock<HashMap<Uuid, User>>,
    roles: RwLock<HashMap<Uuid, Role>>,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle.filter(|n| !n.is_empty()) {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

fn paginate<T>(items: Vec<T>, page: Pagination) -> PageResult<T> {
    let total = items.len() as i64;
    let list = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit() as usize)
        .collect();
    PageResult::new(list, total, page)
}
