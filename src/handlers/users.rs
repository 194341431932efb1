use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::list_page;
use crate::{
    AppState,
    auth::{AuthUser, RoleGuard},
    error::{AppError, AppResult},
    models::{
        ApiResponse, CreateUserRequest, NewUser, USER_RESOURCE, USER_SEARCHABLE_FIELDS,
        UpdateUserRequest, User, UserRole,
    },
    password::PasswordHasher,
    query::{ListQuery, QueryParams, Value},
    repository::RepositoryState,
};

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

/// Who may hand out `role`. Nobody creates a super admin through the API, and only the
/// super admin creates or promotes admins.
pub fn authorize_role_grant(actor: &AuthUser, role: UserRole) -> AppResult<()> {
    match role {
        UserRole::SuperAdmin => Err(AppError::Forbidden(
            "Forbidden: The super admin role cannot be assigned".to_string(),
        )),
        UserRole::Admin => RoleGuard::SuperAdmin.check(actor),
        _ => Ok(()),
    }
}

/// Admin-level accounts are only managed by the super admin.
fn authorize_target(actor: &AuthUser, target: &User) -> AppResult<()> {
    if target.role.is_admin() && target.id != actor.id {
        RoleGuard::SuperAdmin.check(actor)?;
    }
    Ok(())
}

async fn live_user(repo: &RepositoryState, id: Uuid) -> AppResult<User> {
    repo.get_user(id)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(user_not_found)
}

fn user_list(params: QueryParams, role: Option<UserRole>) -> AppResult<ListQuery> {
    let mut query =
        ListQuery::new(&USER_RESOURCE, params).where_eq("is_deleted", Value::Boolean(false))?;
    if let Some(role) = role {
        query = query.where_eq("role", Value::Text(role.as_str().to_string()))?;
    }
    Ok(query
        .search(USER_SEARCHABLE_FIELDS)?
        .filter()?
        .sort()?
        .paginate()
        .fields()?)
}

/// create_user
///
/// [Admin Route] Creates an account. Without a `password` the configured default
/// password is used; duplicate emails are rejected with 409.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 403, description = "Role may not be granted by the caller"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let payload = payload.normalized()?;
    authorize_role_grant(&auth, payload.role)?;

    let password = payload
        .password
        .as_deref()
        .unwrap_or(&state.config.default_password);
    let password_hash = PasswordHasher::new(state.config.bcrypt_cost)
        .hash(password)
        .await?;

    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            password_hash,
            name: payload.name,
            role: payload.role,
            details: payload.details,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok("User created successfully", user)),
    ))
}

/// list_users
///
/// [Admin Route] Lists live accounts. `searchTerm` matches name, email, department and
/// the role-specific ids.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "A page of users", body = [User]),
        (status = 400, description = "Unknown field or malformed filter value")
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let query = user_list(params, None)?;
    list_page(&state.repo, query, "Users retrieved successfully").await
}

#[utoipa::path(
    get,
    path = "/api/v1/students",
    responses((status = 200, description = "A page of students", body = [User]))
)]
pub async fn list_students(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let query = user_list(params, Some(UserRole::Student))?;
    list_page(&state.repo, query, "Students retrieved successfully").await
}

#[utoipa::path(
    get,
    path = "/api/v1/teachers",
    responses((status = 200, description = "A page of teachers", body = [User]))
)]
pub async fn list_teachers(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> AppResult<Json<ApiResponse<Vec<JsonValue>>>> {
    let query = user_list(params, Some(UserRole::Teacher))?;
    list_page(&state.repo, query, "Teachers retrieved successfully").await
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = User),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = live_user(&state.repo, id).await?;
    Ok(Json(ApiResponse::ok("User retrieved successfully", user)))
}

/// update_user
///
/// [Admin Route] Partial update. Role changes follow the same rules as creation, and
/// admin-level accounts can only be edited by the super admin.
#[utoipa::path(
    patch,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = User),
        (status = 403, description = "Not allowed to modify this account"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let payload = payload.normalized()?;
    let target = live_user(&state.repo, id).await?;
    authorize_target(&auth, &target)?;

    if let Some(role) = payload.role.filter(|role| *role != target.role) {
        if target.role == UserRole::SuperAdmin {
            return Err(AppError::Forbidden(
                "Forbidden: The super admin role cannot be changed".to_string(),
            ));
        }
        authorize_role_grant(&auth, role)?;
    }

    let user = state
        .repo
        .update_user(id, payload)
        .await?
        .ok_or_else(user_not_found)?;
    tracing::info!(user_id = %id, updated_by = %auth.id, "user updated");
    Ok(Json(ApiResponse::ok("User updated successfully", user)))
}

/// delete_user
///
/// [Admin Route] Soft delete. The super admin account can never be deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 403, description = "Not allowed to delete this account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let target = live_user(&state.repo, id).await?;
    if target.role == UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Forbidden: The super admin account cannot be deleted".to_string(),
        ));
    }
    authorize_target(&auth, &target)?;

    if !state.repo.soft_delete_user(id).await? {
        return Err(user_not_found());
    }
    tracing::info!(user_id = %id, deleted_by = %auth.id, "user deleted");
    Ok(Json(ApiResponse::ok("User deleted successfully", ())))
}
