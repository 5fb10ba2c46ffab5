use axum::{
    Router,
    extract::{FromRef, Request},
    http::{HeaderName, HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod services;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use identity::{IdentityState, MockIdentityService, SupabaseIdentity};
pub use repository::{MockRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document aggregated from every `#[utoipa::path]` handler and `ToSchema` model,
/// served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::login, handlers::logout, handlers::get_me,
        handlers::create_message, handlers::list_messages, handlers::get_message,
        handlers::update_message, handlers::delete_message,
        handlers::get_blog_posts, handlers::get_blog_post, handlers::get_projects,
        handlers::get_project,
        handlers::admin_get_blog_posts, handlers::create_blog_post, handlers::update_blog_post,
        handlers::delete_blog_post, handlers::admin_get_projects, handlers::create_project,
        handlers::update_project, handlers::delete_project,
        handlers::get_admins, handlers::update_admin,
        handlers::get_dashboard, handlers::get_diagnostics
    ),
    components(
        schemas(
            models::AdminRole, models::Admin, models::AdminSummary, models::UpdateAdminRequest,
            models::LoginRequest, models::Session, models::LoginResponse, models::CurrentUser,
            models::CurrentUserResponse, models::StatusMessage,
            models::MessageType, models::MessageStatus, models::Message,
            models::CreateMessageRequest, models::UpdateMessageRequest, models::MessageList,
            models::BlogStatus, models::BlogPost, models::CreateBlogPostRequest,
            models::UpdateBlogPostRequest,
            models::ProjectStatus, models::ProjectImage, models::ProjectImageInput,
            models::Project, models::CreateProjectRequest, models::UpdateProjectRequest,
            models::DashboardStats, models::DashboardResponse,
            models::Diagnostics, models::EnvironmentCheck, models::AuthenticationCheck,
            models::DiagnosticUser, models::DatabaseCheck,
        )
    ),
    tags(
        (name = "foundation-api", description = "Foundation website back-office API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single immutable container shared by every request: the persistence layer, the
/// identity service and the loaded configuration.
#[derive(Clone)]
pub struct AppState {
    /// Repository Layer: `admins`, `messages`, `blog_posts`, `projects`.
    pub repo: RepositoryState,
    /// Identity Layer: sign-in, sign-out and session validation.
    pub identity: IdentityState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Extractors pull only the slice of state they need (`AuthUser` needs the identity handle,
// `DashboardAccess` the config).

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces a valid session on the routes it layers. `AuthUser` rejects with 401 before the
/// handler runs when the token is missing or no longer recognized by the identity service.
/// The resolved user rides along in the request extensions for the handler's own extractor.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// cors_layer
///
/// With `CORS_ORIGIN` set, only that origin may call the API, with credentials (the session
/// cookie). Without it every origin is allowed, credentials excluded.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = config
        .cors_origin
        .as_deref()
        .and_then(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring unparsable CORS_ORIGIN");
                None
            }
        });

    match origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new()
            .allow_methods(Any)
            .allow_origin(Any)
            .allow_headers(Any),
    }
}

/// create_router
///
/// Assembles the routing structure, applies the scoped authentication layer and the global
/// observability layers, and registers the application state.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/api/admin",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // The dashboard guard answers with a redirect, never 401.
        .nest("/admin", admin::dashboard_routes())
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                // Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // Request Tracing: one span per request, tagged with the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, URI and the `x-request-id` set above, so every log
/// line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
