mod common;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::state;
use parlor_api::handlers::router;

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["user_id"].as_str().unwrap().to_string(),
        body["token"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn health_is_public() {
    let app = router(state());
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = router(state());
    let (status, _) = call(&app, Method::GET, "/conversations", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&app, Method::GET, "/conversations", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_duplicate_name() {
    let app = router(state());
    register(&app, "ana").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "ana", "password": "another one" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "ana", "password": "correct horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ana");

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "username": "ana", "password": "wrong password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_and_message_flow() {
    let app = router(state());
    let (_, ana) = register(&app, "ana").await;
    let (ben_id, ben) = register(&app, "ben").await;

    let (status, conversation) = call(
        &app,
        Method::POST,
        "/conversations",
        Some(&ana),
        Some(json!({
            "type": "group",
            "name": "lunch",
            "participant_ids": [ben_id],
            "slow_mode": 10,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(conversation["members"].as_array().unwrap().len(), 2);
    let id = conversation["id"].as_str().unwrap().to_string();

    let (status, message) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&ben),
        Some(json!({ "conversation_id": id, "content": "noodles?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(message["content"], "noodles?");

    let (status, body) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&ben),
        Some(json!({ "conversation_id": id, "content": "hello?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["remaining"].as_u64().is_some());

    let (status, page) = call(
        &app,
        Method::GET,
        &format!("/conversations/{}/messages?page=1&limit=10", id),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page.as_array().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/conversations/{}", id),
        Some(&ben),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_message_is_not_found() {
    let app = router(state());
    let (_, ana) = register(&app, "ana").await;

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/messages/{}", uuid::Uuid::new_v4()),
        Some(&ana),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Message not found");
}

#[tokio::test]
async fn game_invite_is_answered_over_http() {
    let app = router(state());
    let (_, ana) = register(&app, "ana").await;
    let (ben_id, ben) = register(&app, "ben").await;

    let (_, conversation) = call(
        &app,
        Method::POST,
        "/conversations",
        Some(&ana),
        Some(json!({ "type": "group", "participant_ids": [ben_id] })),
    )
    .await;
    let id = conversation["id"].as_str().unwrap().to_string();

    let (status, message) = call(
        &app,
        Method::POST,
        "/messages",
        Some(&ana),
        Some(json!({
            "conversation_id": id,
            "type": "game_invite",
            "content": "chess?",
            "game_invite": { "game_type": "chess" },
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let invite_id = message["game_invite"]["id"].as_str().unwrap().to_string();

    let (status, invite) = call(
        &app,
        Method::POST,
        &format!("/game-invites/{}/respond", invite_id),
        Some(&ben),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(invite["status"], "accepted");
    assert_eq!(invite["responded_by"], ben_id.as_str());
}
