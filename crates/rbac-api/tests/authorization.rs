mod common;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use common::{config, TestApp, ROOT};
use rbac_core::domain::{MenuInput, MenuType, RoleInput, UserInput};
use serde_json::json;
use tower::ServiceExt;

/// A user whose single role may only list menus.
async fn seed_reader(app: &TestApp) -> String {
    let menu = app
        .state
        .menus
        .create(
            MenuInput {
                name: "List menus".to_string(),
                menu_type: MenuType::Resource,
                path: Some("/api/v1/menus".to_string()),
                method: Some("GET".to_string()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let role = app
        .state
        .roles
        .create(
            RoleInput {
                name: "reader".to_string(),
                menu_ids: vec![menu.id],
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    let user = app
        .state
        .users
        .create(
            UserInput {
                user_name: "reader".to_string(),
                real_name: "Reader".to_string(),
                password: Some("s3cret-pass".to_string()),
                role_ids: vec![role.id],
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap();
    user.id.to_string()
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() {
    let app = TestApp::secured().await;

    let (status, body) = app.call(Method::GET, "/api/v1/menus", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = app.call(Method::GET, "/api/v1/menus", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn granted_route_passes_and_others_are_forbidden() {
    let app = TestApp::secured().await;
    let token = app.token_for(&seed_reader(&app).await);

    let (status, _) = app.call(Method::GET, "/api/v1/menus", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(Method::POST, "/api/v1/menus", Some(&token), Some(json!({ "name": "X" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app.call(Method::GET, "/api/v1/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn disabled_user_loses_access() {
    let app = TestApp::secured().await;
    let user_id = seed_reader(&app).await;
    let token = app.token_for(&user_id);
    let root = app.token_for(ROOT);

    let (status, _) = app
        .call(Method::PATCH, &format!("/api/v1/users/{}/disable", user_id), Some(&root), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/v1/menus", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn root_user_bypasses_enforcement() {
    let app = TestApp::secured().await;
    let token = app.token_for(ROOT);

    let (status, body) = app
        .call(Method::POST, "/api/v1/menus", Some(&token), Some(json!({ "name": "Bootstrap" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    // Root is not a user record, so no audit actor is recorded.
    assert!(body["data"]["created_by"].is_null());
}

#[tokio::test]
async fn health_and_skipped_paths_need_no_token() {
    let app = TestApp::with_config(config(true, vec!["/api/v1/roles".to_string()])).await;

    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.call(Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/v1/roles", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::GET, "/api/v1/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn request_id_is_generated_and_echoed() {
    let app = TestApp::open().await;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "abc-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "abc-123");
}
