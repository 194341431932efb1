use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch},
};

/// Authenticated Router Module
///
/// Routes open to any logged-in user, whatever the role. The router is wrapped in
/// `auth_middleware`, so every handler here can rely on a resolved `AuthUser`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::auth::get_me))
        // PATCH /auth/change-password
        // Requires the current password.
        .route(
            "/auth/change-password",
            patch(handlers::auth::change_password),
        )
        // --- Events ---
        // GET /events?searchTerm=...&sort=...&page=...&limit=...&fields=...
        // Archived events are never listed.
        .route(
            "/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/events/{id}",
            get(handlers::events::get_event)
                .patch(handlers::events::update_event)
                .delete(handlers::events::delete_event),
        )
        // PATCH /events/{id}/archive
        // Hides the event from listings; it stays retrievable by id.
        .route(
            "/events/{id}/archive",
            patch(handlers::events::archive_event),
        )
}
