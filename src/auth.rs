use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{User, UserRole},
    repository::RepositoryState,
};

/// Claims
///
/// The payload signed into both access and refresh tokens. The role is embedded for
/// clients, but authorization always uses the role loaded from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's id.
    pub sub: Uuid,
    pub email: String,
    pub role: UserRole,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
}

/// Which secret and lifetime a token is signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn secret(self, config: &AppConfig) -> &[u8] {
        match self {
            TokenKind::Access => config.jwt_access_secret.as_bytes(),
            TokenKind::Refresh => config.jwt_refresh_secret.as_bytes(),
        }
    }

    fn ttl_secs(self, config: &AppConfig) -> u64 {
        match self {
            TokenKind::Access => config.jwt_access_expires_in.as_secs(),
            TokenKind::Refresh => config.jwt_refresh_expires_in.as_secs(),
        }
    }
}

/// Signs an HS256 token for `user`.
pub fn issue_token(config: &AppConfig, kind: TokenKind, user: &User) -> AppResult<String> {
    let iat = Utc::now().timestamp().max(0) as usize;
    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        role: user.role,
        iat,
        exp: iat + kind.ttl_secs(config) as usize,
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(kind.secret(config)),
    )?)
}

/// Verifies signature and expiry. Any failure maps to `AppError::Token` (403).
pub fn decode_token(config: &AppConfig, kind: TokenKind, token: &str) -> AppResult<Claims> {
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(kind.secret(config)),
        &validation,
    )?;
    Ok(data.claims)
}

/// AuthUser
///
/// The resolved identity of an authenticated request. `role` comes from the database row,
/// not from the token, so a role change takes effect immediately.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// AuthUser Extractor Implementation
///
/// 1. Reuses an identity already resolved by `auth_middleware` for this request.
/// 2. Requires an `Authorization: Bearer <token>` header (401 otherwise).
/// 3. Verifies the access token (403 on a bad signature or expiry).
/// 4. Loads the user; a missing or soft-deleted account is rejected with 401.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Access token is required".to_string()))?;

        let claims = decode_token(&config, TokenKind::Access, token)?;

        let user = repo
            .get_user(claims.sub)
            .await?
            .filter(|user| !user.is_deleted)
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        let auth_user = AuthUser::from(&user);
        parts.extensions.insert(auth_user.clone());
        Ok(auth_user)
    }
}

/// auth_middleware
///
/// Guards a whole router. The extractor rejects unauthenticated requests before the
/// handler runs; the resolved identity is stored in the request extensions so the role
/// guards and handler extractors do not hit the database again.
pub async fn auth_middleware(auth_user: AuthUser, mut request: Request, next: Next) -> Response {
    tracing::debug!(user_id = %auth_user.id, role = auth_user.role.as_str(), "authenticated");
    request.extensions_mut().insert(auth_user);
    next.run(request).await
}

/// RoleGuard
///
/// The role checks used by routes and handlers. `SuperAdmin` passes every admin check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleGuard {
    Admin,
    Teacher,
    SuperAdmin,
    AdminOrTeacher,
}

impl RoleGuard {
    pub fn allows(self, role: UserRole) -> bool {
        match self {
            RoleGuard::Admin => role.is_admin(),
            RoleGuard::Teacher => role == UserRole::Teacher,
            RoleGuard::SuperAdmin => role == UserRole::SuperAdmin,
            RoleGuard::AdminOrTeacher => role.is_admin() || role == UserRole::Teacher,
        }
    }

    fn message(self) -> &'static str {
        match self {
            RoleGuard::Admin => "Forbidden: Admin access required",
            RoleGuard::Teacher => "Forbidden: Teacher access required",
            RoleGuard::SuperAdmin => "Forbidden: Super Admin access required",
            RoleGuard::AdminOrTeacher => "Forbidden: Insufficient permissions",
        }
    }

    pub fn check(self, user: &AuthUser) -> AppResult<()> {
        if self.allows(user.role) {
            Ok(())
        } else {
            tracing::warn!(user_id = %user.id, role = user.role.as_str(), guard = ?self, "access denied");
            Err(AppError::Forbidden(self.message().to_string()))
        }
    }

    async fn enforce(self, request: Request, next: Next) -> Result<Response, AppError> {
        let user = request
            .extensions()
            .get::<AuthUser>()
            .ok_or_else(|| AppError::Unauthorized("Access token is required".to_string()))?;
        self.check(user)?;
        Ok(next.run(request).await)
    }
}

/// Route layer for admin-only routers. Must sit inside `auth_middleware`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    RoleGuard::Admin.enforce(request, next).await
}

pub async fn require_admin_or_teacher(request: Request, next: Next) -> Result<Response, AppError> {
    RoleGuard::AdminOrTeacher.enforce(request, next).await
}
