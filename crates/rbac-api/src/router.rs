//! Router assembly

use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch},
    Router,
};
use rbac_shared::constants::API_PREFIX;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers::{health, menus, roles, users};
use crate::middleware::authorize;
use crate::state::AppState;

fn api(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn build_router(state: AppState) -> Router {
    // Public routes (no authorization)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let mut api_routes = Router::new()
        .route(
            &api("/menus"),
            get(menus::list).post(menus::create).delete(menus::delete_many),
        )
        .route(
            &api("/menus/{id}"),
            get(menus::get).put(menus::update).delete(menus::delete),
        )
        .route(&api("/menus/{id}/enable"), patch(menus::enable))
        .route(&api("/menus/{id}/disable"), patch(menus::disable))
        .route(
            &api("/users"),
            get(users::list).post(users::create).delete(users::delete_many),
        )
        .route(
            &api("/users/{id}"),
            get(users::get).put(users::update).delete(users::delete),
        )
        .route(&api("/users/{id}/enable"), patch(users::enable))
        .route(&api("/users/{id}/disable"), patch(users::disable))
        .route(
            &api("/roles"),
            get(roles::list).post(roles::create).delete(roles::delete_many),
        )
        .route(
            &api("/roles/{id}"),
            get(roles::get).put(roles::update).delete(roles::delete),
        )
        .route(&api("/roles/{id}/enable"), patch(roles::enable))
        .route(&api("/roles/{id}/disable"), patch(roles::disable));

    if state.config.authz.enabled {
        api_routes = api_routes.route_layer(middleware::from_fn_with_state(state.clone(), authorize));
    } else {
        tracing::warn!("Authorization disabled; API routes are open");
    }

    let timeout = Duration::from_secs(state.config.app.request_timeout_secs);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::default().include_headers(true)),
                )
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
                .layer(CorsLayer::permissive()),
        )
}
