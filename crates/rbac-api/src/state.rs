use std::sync::Arc;

use rbac_core::services::{MenuService, RoleService, UserService};
use rbac_security::{JwtService, PolicyEnforcer};
use rbac_shared::config::AppConfig;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub menus: Arc<MenuService>,
    pub users: Arc<UserService>,
    pub roles: Arc<RoleService>,
    pub enforcer: Arc<dyn PolicyEnforcer>,
    pub jwt: JwtService,
    /// Present for the postgres driver; readiness pings it.
    pub db: Option<PgPool>,
    pub config: Arc<AppConfig>,
}
