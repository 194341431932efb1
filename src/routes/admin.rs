use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// User management. Wrapped in `auth_middleware` and then `require_admin`; the
/// handlers apply the finer super-admin rules themselves.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /teachers
        .route("/teachers", get(handlers::users::list_teachers))
        // GET/POST /users
        // Creating an admin account needs the super admin.
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        // GET/PATCH/DELETE /users/{id}
        // DELETE is a soft delete.
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
}

/// Routes shared by admins and teachers. Wrapped in `require_admin_or_teacher`.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        // GET /students
        .route("/students", get(handlers::users::list_students))
}
