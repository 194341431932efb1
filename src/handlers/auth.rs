use axum::{Json, extract::State};

use crate::{
    AppState,
    auth::{AuthUser, TokenKind, decode_token, issue_token},
    error::{AppError, AppResult},
    models::{
        ApiResponse, ChangePasswordRequest, LoginRequest, RefreshTokenRequest, TokenResponse,
        User, validate_password,
    },
    password::PasswordHasher,
};

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

/// login
///
/// [Public Route] Exchanges email and password for an access/refresh token pair.
///
/// Unknown emails, soft-deleted accounts and wrong passwords all yield the same 401 so
/// the endpoint cannot be used to probe which accounts exist.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = TokenResponse),
        (status = 401, description = "Invalid email or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let email = payload.email.trim().to_lowercase();
    let user = state
        .repo
        .find_user_by_email(&email)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(invalid_credentials)?;

    let hasher = PasswordHasher::new(state.config.bcrypt_cost);
    if !hasher.verify(&payload.password, &user.password).await? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let tokens = TokenResponse {
        access_token: issue_token(&state.config, TokenKind::Access, &user)?,
        refresh_token: Some(issue_token(&state.config, TokenKind::Refresh, &user)?),
    };
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user logged in");
    Ok(Json(ApiResponse::ok("User logged in successfully", tokens)))
}

/// refresh_token
///
/// [Public Route] Issues a fresh access token from a valid refresh token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh-token",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New access token", body = TokenResponse),
        (status = 403, description = "Invalid or expired token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshTokenRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let claims = decode_token(&state.config, TokenKind::Refresh, &payload.refresh_token)?;
    let user = state
        .repo
        .get_user(claims.sub)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

    let tokens = TokenResponse {
        access_token: issue_token(&state.config, TokenKind::Access, &user)?,
        refresh_token: None,
    };
    Ok(Json(ApiResponse::ok(
        "Access token retrieved successfully",
        tokens,
    )))
}

/// change_password
///
/// [Authenticated Route] Replaces the caller's password after checking the old one.
#[utoipa::path(
    patch,
    path = "/api/v1/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 401, description = "Old password is incorrect")
    )
)]
pub async fn change_password(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    validate_password(&payload.new_password)?;

    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let hasher = PasswordHasher::new(state.config.bcrypt_cost);
    if !hasher.verify(&payload.old_password, &user.password).await? {
        return Err(AppError::Unauthorized(
            "Old password is incorrect".to_string(),
        ));
    }

    let hashed = hasher.hash(&payload.new_password).await?;
    if !state.repo.set_password(auth.id, hashed).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    tracing::info!(user_id = %auth.id, "password changed");
    Ok(Json(ApiResponse::ok("Password changed successfully", ())))
}

/// get_me
///
/// [Authenticated Route] Returns the caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn get_me(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<User>>> {
    let user = state
        .repo
        .get_user(auth.id)
        .await?
        .filter(|user| !user.is_deleted)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(ApiResponse::ok("User profile retrieved successfully", user)))
}
