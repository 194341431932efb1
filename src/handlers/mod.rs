use axum::{Json, http::StatusCode};
use serde_json::{Value as JsonValue, json};

use crate::{
    error::AppResult,
    models::ApiResponse,
    query::ListQuery,
    repository::RepositoryState,
};

pub mod auth;
pub mod events;
pub mod users;

/// root
///
/// [Public Route] Greeting used by uptime probes and humans poking at the server.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Server greeting"))
)]
pub async fn root() -> Json<JsonValue> {
    Json(json!({ "message": "College portal server is running" }))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy"))
)]
pub async fn health() -> Json<JsonValue> {
    Json(json!({ "success": true, "status": "ok" }))
}

/// Runs a composed list query and wraps the page in the response envelope.
pub(crate) async fn list_page(
    repo: &RepositoryState,
    query: ListQuery,
    message: &str,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let (rows, total) = repo.list(&query).await?;
    Ok(Json(ApiResponse::page(message, query.meta(total), rows)))
}

/// Fallback for every unmatched path.
pub async fn not_found() -> (StatusCode, Json<JsonValue>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "API Not Found" })),
    )
}
