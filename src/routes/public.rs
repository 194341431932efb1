use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints: the liveness probes and the token endpoints.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
}

/// The `/api/v1` routes that hand out tokens.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        // POST /auth/login
        // Email + password in, access and refresh token out.
        .route("/auth/login", post(handlers::auth::login))
        // POST /auth/refresh-token
        .route("/auth/refresh-token", post(handlers::auth::refresh_token))
}
