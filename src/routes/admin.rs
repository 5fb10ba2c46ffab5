use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, patch, put},
};

/// Admin API Router Module
///
/// Mounted under `/api/admin` behind the authentication layer.
///
/// Access Control:
/// - blog posts and projects: super_admin, content_manager
/// - admins: super_admin only
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- Blog posts ---
        .route(
            "/blog-posts",
            get(handlers::admin_get_blog_posts).post(handlers::create_blog_post),
        )
        .route(
            "/blog-posts/{id}",
            put(handlers::update_blog_post).delete(handlers::delete_blog_post),
        )
        // --- Projects ---
        .route(
            "/projects",
            get(handlers::admin_get_projects).post(handlers::create_project),
        )
        .route(
            "/projects/{id}",
            put(handlers::update_project).delete(handlers::delete_project),
        )
        // --- Administrators ---
        // Listing and editing only; admin rows are provisioned out of band.
        .route("/admins", get(handlers::get_admins))
        .route("/admins/{id}", patch(handlers::update_admin))
}

/// Admin Pages Router
///
/// Mounted under `/admin`. Guarded by the session token's role claim (`DashboardAccess`),
/// which redirects to `/admin/login` instead of answering 401/403.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(handlers::get_dashboard))
}
