use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated Router Module
///
/// Every route here sits behind the `auth_middleware` layer, so handlers only run for a
/// session the identity service still recognizes. Admin status and role are checked inside
/// each operation via `guard::require_role`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/auth/me
        // Profile of the signed-in administrator; 401 if the principal has no `admins` row.
        .route("/api/auth/me", get(handlers::get_me))
        // GET/PATCH/DELETE /api/messages/{id}
        // Message moderation, restricted to super_admin and message_manager.
        .route(
            "/api/messages/{id}",
            get(handlers::get_message)
                .patch(handlers::update_message)
                .delete(handlers::delete_message),
        )
}
