#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rbac_api::{build_router, AppState};
use rbac_core::repositories::{MenuRepository, RoleRepository, UserRepository};
use rbac_core::services::{MenuService, PolicySynchronizer, RoleService, UserService};
use rbac_infrastructure::{InMemoryMenuRepository, InMemoryRoleRepository, InMemoryUserRepository, MemoryStore};
use rbac_security::{CasbinEnforcer, JwtService, PolicyEnforcer};
use rbac_shared::config::{
    AppConfig, AppSettings, AuthzSettings, DatabaseDriver, DatabaseSettings, JwtSettings, LogFormat, LogSettings,
};
use serde_json::Value;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";
pub const ROOT: &str = "root";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub fn config(authz_enabled: bool, skip_paths: Vec<String>) -> AppConfig {
    AppConfig {
        app: AppSettings {
            env: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            name: "rbac-server".to_string(),
            request_timeout_secs: 5,
        },
        database: DatabaseSettings {
            driver: DatabaseDriver::Memory,
            url: String::new(),
            max_connections: 1,
            min_connections: 1,
            run_migrations: false,
        },
        jwt: JwtSettings {
            secret: SECRET.to_string(),
            issuer: None,
        },
        authz: AuthzSettings {
            enabled: authz_enabled,
            root_user: Some(ROOT.to_string()),
            skip_paths,
        },
        log: LogSettings {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            dir: None,
        },
    }
}

impl TestApp {
    pub async fn open() -> Self {
        Self::with_config(config(false, Vec::new())).await
    }

    pub async fn secured() -> Self {
        Self::with_config(config(true, Vec::new())).await
    }

    pub async fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::shared();
        let menu_repo: Arc<dyn MenuRepository> = Arc::new(InMemoryMenuRepository::new(store.clone()));
        let user_repo: Arc<dyn UserRepository> = Arc::new(InMemoryUserRepository::new(store.clone()));
        let role_repo: Arc<dyn RoleRepository> = Arc::new(InMemoryRoleRepository::new(store));
        let enforcer: Arc<dyn PolicyEnforcer> = Arc::new(CasbinEnforcer::new().await.expect("casbin model"));

        let policy = Arc::new(PolicySynchronizer::new(
            user_repo.clone(),
            role_repo.clone(),
            menu_repo.clone(),
            enforcer.clone(),
        ));

        let state = AppState {
            menus: Arc::new(MenuService::new(menu_repo, policy.clone())),
            users: Arc::new(UserService::new(user_repo, role_repo.clone(), policy.clone())),
            roles: Arc::new(RoleService::new(role_repo, policy)),
            enforcer,
            jwt: JwtService::new(config.jwt.secret.clone(), config.jwt.issuer.clone()),
            db: None,
            config: Arc::new(config),
        };

        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub fn token_for(&self, subject: &str) -> String {
        self.state.jwt.generate_token(subject, 300).expect("token")
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
