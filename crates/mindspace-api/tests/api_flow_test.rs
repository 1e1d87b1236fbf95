//! End-to-end API tests against a migrated Postgres database.
//!
//! Run with `cargo test -p mindspace-api -- --ignored` and `DATABASE_URL` set.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use mindspace_api::config::DEFAULT_ALLOWED_ORIGINS;
use mindspace_api::{create_router, AppState};
use mindspace_db::test_fixtures::{unique_name, TestDatabase};

async fn app() -> Router {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await.expect("test database");
    create_router(AppState::new(test_db.db), DEFAULT_ALLOWED_ORIGINS)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request");

    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

/// Register a fresh user and return an access token for them.
async fn login(app: &Router, prefix: &str) -> String {
    let username = unique_name(prefix);
    let (status, _) = send(
        app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "password": "secret1",
            "password2": "secret1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        Method::POST,
        "/api/token",
        None,
        Some(json!({ "username": username, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access"].as_str().expect("access token").to_string()
}

#[tokio::test]
#[ignore]
async fn test_register_login_refresh() {
    let app = app().await;
    let username = unique_name("flow");

    let (status, user) = send(
        &app,
        Method::POST,
        "/api/register",
        None,
        Some(json!({
            "username": username,
            "password": "secret1",
            "password2": "secret1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["username"], username.as_str());
    assert_eq!(user["email"], "");

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/token",
        None,
        Some(json!({ "username": username, "password": "wrong-one" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, pair) = send(
        &app,
        Method::POST,
        "/api/token",
        None,
        Some(json!({ "username": username, "password": "secret1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, refreshed) = send(
        &app,
        Method::POST,
        "/api/token/refresh",
        None,
        Some(json!({ "refresh": pair["refresh"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(refreshed.get("refresh").is_none());

    let access = refreshed["access"].as_str().unwrap();
    let (status, _) = send(&app, Method::GET, "/api/notes", Some(access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_recipes_example() {
    let app = app().await;
    let token = login(&app, "chef").await;
    let token = Some(token.as_str());

    let (status, tag) = send(
        &app,
        Method::POST,
        "/api/tags",
        token,
        Some(json!({ "name": unique_name("cooking") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tag_id = tag["id"].as_i64().unwrap();

    let (status, recipes) = send(
        &app,
        Method::POST,
        "/api/notes",
        token,
        Some(json!({ "title": "Recipes", "tags": [tag_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let recipes_id = recipes["id"].as_i64().unwrap();

    let (status, pasta) = send(
        &app,
        Method::POST,
        "/api/notes",
        token,
        Some(json!({ "title": "Pasta", "parent": recipes_id, "tags": [tag_id] })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let pasta_id = pasta["id"].as_i64().unwrap();

    let (status, detail) = send(
        &app,
        Method::GET,
        &format!("/api/notes/{}", recipes_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["children"][0]["id"], pasta_id);
    assert_eq!(detail["children"][0]["children"], json!([]));
    assert_eq!(detail["tags"][0]["id"], tag_id);
    assert!(detail.get("created_at").is_some());

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/tags/{}", tag_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, detail) = send(
        &app,
        Method::GET,
        &format!("/api/notes/{}", pasta_id),
        token,
        None,
    )
    .await;
    assert_eq!(detail["tags"], json!([]));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/api/notes/{}", recipes_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/notes/{}", pasta_id),
        token,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));
}

#[tokio::test]
#[ignore]
async fn test_notes_are_private() {
    let app = app().await;
    let alice = login(&app, "alice").await;
    let bob = login(&app, "bob").await;

    let (_, note) = send(
        &app,
        Method::POST,
        "/api/notes",
        Some(&alice),
        Some(json!({ "title": "Diary", "content": "secret" })),
    )
    .await;
    let uri = format!("/api/notes/{}", note["id"]);

    let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        Method::PATCH,
        &uri,
        Some(&bob),
        Some(json!({ "title": "Mine now" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = send(
        &app,
        Method::GET,
        "/api/notes?q=secret",
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(listed, json!([]));

    let (_, listed) = send(
        &app,
        Method::GET,
        "/api/notes?q=SECRET",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore]
async fn test_patch_keeps_slug_and_rejects_cycles() {
    let app = app().await;
    let token = login(&app, "patch").await;
    let token = Some(token.as_str());

    let (_, parent) = send(
        &app,
        Method::POST,
        "/api/notes",
        token,
        Some(json!({ "title": "Parent" })),
    )
    .await;
    let (_, child) = send(
        &app,
        Method::POST,
        "/api/notes",
        token,
        Some(json!({ "title": "Child", "parent": parent["id"] })),
    )
    .await;

    let parent_uri = format!("/api/notes/{}", parent["id"]);
    let (status, patched) = send(
        &app,
        Method::PATCH,
        &parent_uri,
        token,
        Some(json!({ "title": "Renamed", "slug": "ignored" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["slug"], parent["slug"]);

    let (status, body) = send(
        &app,
        Method::PATCH,
        &parent_uri,
        token,
        Some(json!({ "parent": child["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("parent").is_some());

    let (status, _) = send(
        &app,
        Method::PUT,
        &parent_uri,
        token,
        Some(json!({ "content": "no title" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
