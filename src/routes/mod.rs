/// Router Module Index
///
/// Routing is split by access level. Every module returns a plain `Router<AppState>`;
/// the authentication and role layers are applied in `create_router`, so a route's
/// guard is decided by the module it lives in.

/// Routes accessible without a token.
pub mod public;

/// Routes that require a valid access token.
pub mod authenticated;

/// Routes that additionally require an admin-level role (or a teacher, for `/students`).
pub mod admin;
