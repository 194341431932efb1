mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use college_portal::{create_router, models::UserRole};
use common::{MockRepository, access_token, state, user};
use serde_json::{Value, json};
use tower::ServiceExt;

// --- Helpers ---

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// --- Public surface ---

#[tokio::test]
async fn test_health_and_root_are_public() {
    let app = create_router(state(Arc::new(MockRepository::default())));
    let (status, body) = send(app.clone(), get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(app, get("/", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_uses_json_fallback() {
    let app = create_router(state(Arc::new(MockRepository::default())));

    let (status, body) = send(app, get("/api/v1/does-not-exist", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "API Not Found" }));
}

#[tokio::test]
async fn test_responses_carry_request_id() {
    let app = create_router(state(Arc::new(MockRepository::default())));

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_router(state(Arc::new(MockRepository::default())));

    let (status, body) = send(app, get("/api-docs/openapi.json", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/v1/events").is_some());
}

// --- Authentication ---

#[tokio::test]
async fn test_events_require_a_token() {
    let app = create_router(state(Arc::new(MockRepository::default())));

    let (status, body) = send(app, get("/api/v1/events", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Access token is required");
}

#[tokio::test]
async fn test_invalid_token_is_forbidden() {
    let app = create_router(state(Arc::new(MockRepository::default())));

    let (status, body) = send(app, get("/api/v1/me", Some("tampered"))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn test_login_then_me() {
    let mut student = user(UserRole::Student, "student@college.edu");
    student.password = common::hash("password123").await;
    let app = create_router(state(Arc::new(MockRepository::with_users(vec![student]))));

    let (status, body) = send(
        app.clone(),
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "student@college.edu", "password": "password123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = send(app, get("/api/v1/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["role"], "student");
}

// --- Role guards ---

#[tokio::test]
async fn test_users_require_admin() {
    let teacher = user(UserRole::Teacher, "teacher@college.edu");
    let token = access_token(&teacher);
    let app = create_router(state(Arc::new(MockRepository::with_users(vec![teacher]))));

    let (status, body) = send(app, get("/api/v1/users", Some(&token))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden: Admin access required");
}

#[tokio::test]
async fn test_super_admin_passes_admin_guard() {
    let root = user(UserRole::SuperAdmin, "root@college.edu");
    let token = access_token(&root);
    let app = create_router(state(Arc::new(MockRepository::with_users(vec![root]))));

    let (status, body) = send(app, get("/api/v1/teachers", Some(&token))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["limit"], 10);
}

#[tokio::test]
async fn test_students_allow_teachers_but_not_staff() {
    let teacher = user(UserRole::Teacher, "teacher@college.edu");
    let staff = user(UserRole::Staff, "staff@college.edu");
    let teacher_token = access_token(&teacher);
    let staff_token = access_token(&staff);
    let app = create_router(state(Arc::new(MockRepository::with_users(vec![
        teacher, staff,
    ]))));

    let (status, _) = send(app.clone(), get("/api/v1/students", Some(&teacher_token))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get("/api/v1/students", Some(&staff_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Forbidden: Insufficient permissions");
}

// --- Events through the stack ---

#[tokio::test]
async fn test_event_lifecycle() {
    let staff = user(UserRole::Staff, "staff@college.edu");
    let token = access_token(&staff);
    let repo = Arc::new(MockRepository::with_users(vec![staff]));
    let app = create_router(state(repo.clone()));

    let (status, body) = send(
        app.clone(),
        json_request(
            Method::POST,
            "/api/v1/events",
            Some(&token),
            json!({ "title": "Holiday trip", "date": "2025-12-20", "time": "08:00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["category"], "Personal");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        app.clone(),
        json_request(
            Method::PATCH,
            &format!("/api/v1/events/{id}"),
            Some(&token),
            json!({ "notes": "client deadline moved" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["category"], "Work");

    let (status, body) = send(
        app.clone(),
        json_request(
            Method::PATCH,
            &format!("/api/v1/events/{id}/archive"),
            Some(&token),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["archived"], true);

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/v1/events/{id}"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(app, get(&format!("/api/v1/events/{id}"), Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Event not found");
}

#[tokio::test]
async fn test_bad_list_query_is_bad_request() {
    let staff = user(UserRole::Staff, "staff@college.edu");
    let token = access_token(&staff);
    let app = create_router(state(Arc::new(MockRepository::with_users(vec![staff]))));

    let (status, body) = send(
        app.clone(),
        get("/api/v1/events?archived=maybe", Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(app, get("/api/v1/events?fields=title,-notes", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
