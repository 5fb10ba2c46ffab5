use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session.
///
/// `/api/messages` is registered here for both methods: POST is the anonymous contact form,
/// while the GET handler takes `AuthUser` itself and rejects anonymous callers with 401.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /api/diagnostics
        // Configuration presence, token check and database check.
        .route("/api/diagnostics", get(handlers::get_diagnostics))
        // --- Session ---
        .route("/api/auth/login", post(handlers::login))
        // Logout needs no valid session: an already-dead token still succeeds.
        .route("/api/auth/logout", post(handlers::logout))
        // --- Contact form ---
        .route(
            "/api/messages",
            post(handlers::create_message).get(handlers::list_messages),
        )
        // --- Published content ---
        .route("/api/blog-posts", get(handlers::get_blog_posts))
        .route("/api/blog-posts/{slug}", get(handlers::get_blog_post))
        .route("/api/projects", get(handlers::get_projects))
        .route("/api/projects/{slug}", get(handlers::get_project))
}
