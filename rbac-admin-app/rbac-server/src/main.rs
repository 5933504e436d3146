use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use rbac_api::{build_router, AppState};
use rbac_core::repositories::{MenuRepository, RoleRepository, UserRepository};
use rbac_core::services::{MenuService, PolicySynchronizer, RoleService, UserService};
use rbac_infrastructure::{
    create_pool, run_migrations, InMemoryMenuRepository, InMemoryRoleRepository, InMemoryUserRepository,
    MemoryStore, PgMenuRepository, PgRoleRepository, PgUserRepository,
};
use rbac_security::{CasbinEnforcer, JwtService, PolicyEnforcer};
use rbac_shared::config::{AppConfig, DatabaseDriver};
use rbac_shared::telemetry::init_telemetry;

type Repositories = (
    Arc<dyn MenuRepository>,
    Arc<dyn UserRepository>,
    Arc<dyn RoleRepository>,
    Option<sqlx::PgPool>,
);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_telemetry(&config.log)?;

    info!(env = %config.app.env, "{} starting...", config.app.name);

    let (menu_repo, user_repo, role_repo, db) = open_repositories(&config).await?;

    let enforcer: Arc<dyn PolicyEnforcer> = Arc::new(
        CasbinEnforcer::new()
            .await
            .context("Failed to build authorization engine")?,
    );
    let policy = Arc::new(PolicySynchronizer::new(
        user_repo.clone(),
        role_repo.clone(),
        menu_repo.clone(),
        enforcer.clone(),
    ));

    // Engine starts empty; refuse to serve on a partial load.
    policy
        .load_all_policy()
        .await
        .context("Failed to load authorization policy")?;

    let state = AppState {
        menus: Arc::new(MenuService::new(menu_repo, policy.clone())),
        users: Arc::new(UserService::new(user_repo, role_repo.clone(), policy.clone())),
        roles: Arc::new(RoleService::new(role_repo, policy)),
        enforcer,
        jwt: JwtService::new(config.jwt.secret.clone(), config.jwt.issuer.clone()),
        db,
        config: Arc::new(config.clone()),
    };

    let app = build_router(state);

    let host: std::net::IpAddr = config.app.host.parse()?;
    let addr = SocketAddr::from((host, config.app.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn open_repositories(config: &AppConfig) -> anyhow::Result<Repositories> {
    match config.database.driver {
        DatabaseDriver::Postgres => {
            info!("Connecting to database...");
            let pool = create_pool(
                &config.database.url,
                config.database.max_connections,
                config.database.min_connections,
            )
            .await
            .context("Failed to connect to database")?;
            info!("Database connection established.");

            if config.database.run_migrations {
                run_migrations(&pool).await.context("Failed to run migrations")?;
            }

            Ok((
                Arc::new(PgMenuRepository::new(pool.clone())),
                Arc::new(PgUserRepository::new(pool.clone())),
                Arc::new(PgRoleRepository::new(pool.clone())),
                Some(pool),
            ))
        }
        DatabaseDriver::Memory => {
            if config.is_production() {
                warn!("Memory driver in production; all data is lost on restart");
            }
            let store = MemoryStore::shared();
            Ok((
                Arc::new(InMemoryMenuRepository::new(store.clone())),
                Arc::new(InMemoryUserRepository::new(store.clone())),
                Arc::new(InMemoryRoleRepository::new(store)),
                None,
            ))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
