use college_portal::{
    models::{
        ApiResponse, CreateEventRequest, CreateUserRequest, Event, EventCategory, UpdateEventRequest,
        UpdateUserRequest, User, UserRole,
    },
    query::PageMeta,
};
use serde_json::json;

#[test]
fn test_user_json_flattens_details_and_hides_password() {
    let mut user = User {
        email: "t@college.edu".to_string(),
        password: "$2b$04$secret".to_string(),
        role: UserRole::Teacher,
        ..User::default()
    };
    user.details.department = Some("Chemistry".to_string());
    user.details.subjects = Some(vec!["Organic".to_string()]);

    let value = serde_json::to_value(&user).unwrap();

    assert_eq!(value["department"], "Chemistry");
    assert_eq!(value["subjects"], json!(["Organic"]));
    assert_eq!(value["role"], "teacher");
    assert!(value.get("password").is_none());
    assert!(value.get("details").is_none());
    // Unset optional fields are omitted.
    assert!(value.get("student_id").is_none());
}

#[test]
fn test_event_category_uses_capitalized_labels() {
    let event = Event {
        category: EventCategory::Personal,
        ..Event::default()
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["category"], "Personal");
}

#[test]
fn test_unknown_role_is_rejected() {
    let result: Result<CreateUserRequest, _> = serde_json::from_value(json!({
        "email": "x@college.edu",
        "name": "X",
        "role": "principal"
    }));
    assert!(result.is_err());
}

#[test]
fn test_create_user_requires_a_name() {
    let payload: CreateUserRequest = serde_json::from_value(json!({
        "email": "x@college.edu",
        "name": "   ",
        "role": "staff"
    }))
    .unwrap();
    assert!(payload.normalized().is_err());
}

#[test]
fn test_create_user_rejects_short_password() {
    let payload: CreateUserRequest = serde_json::from_value(json!({
        "email": "x@college.edu",
        "name": "X",
        "role": "staff",
        "password": "abc"
    }))
    .unwrap();
    assert!(payload.normalized().is_err());
}

#[test]
fn test_update_user_partial_payload() {
    let payload: UpdateUserRequest =
        serde_json::from_value(json!({ "email": " Mixed@Case.EDU ", "semester": 4 })).unwrap();
    let payload = payload.normalized().unwrap();

    assert_eq!(payload.email.as_deref(), Some("mixed@case.edu"));
    assert_eq!(payload.details.semester, Some(4));
    assert!(payload.name.is_none());
    assert!(payload.role.is_none());
}

#[test]
fn test_event_notes_limit() {
    let payload = CreateEventRequest {
        title: "Exam".to_string(),
        date: "2025-01-10".to_string(),
        time: "09:00".to_string(),
        notes: Some("n".repeat(501)),
    };
    assert!(payload.normalized().is_err());
}

#[test]
fn test_empty_event_update_is_detected() {
    let payload: UpdateEventRequest = serde_json::from_value(json!({})).unwrap();
    assert!(payload.is_empty());

    let payload: UpdateEventRequest = serde_json::from_value(json!({ "time": "7:30" })).unwrap();
    assert!(!payload.is_empty());
    assert!(payload.normalized().is_ok());
}

#[test]
fn test_envelope_shape() {
    let single = serde_json::to_value(ApiResponse::ok("done", json!({ "id": 1 }))).unwrap();
    assert_eq!(single, json!({ "success": true, "message": "done", "data": { "id": 1 } }));

    let meta = PageMeta {
        page: 1,
        limit: 10,
        total: 0,
        total_page: 0,
    };
    let page = serde_json::to_value(ApiResponse::page("listed", meta, Vec::<i32>::new())).unwrap();
    assert_eq!(page["meta"]["total_page"], 0);
    assert_eq!(page["data"], json!([]));
}
