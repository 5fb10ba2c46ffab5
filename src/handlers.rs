use crate::{
    AppState,
    auth::{self, AuthUser, SessionToken},
    config::{AppConfig, Env},
    error::AppError,
    guard::DashboardAccess,
    models::{
        Admin, AdminQuery, AuthenticationCheck, BlogPost, BlogPostQuery, CreateBlogPostRequest,
        CreateMessageRequest, CreateProjectRequest, CurrentUserResponse, DashboardResponse,
        DatabaseCheck, DiagnosticUser, Diagnostics, EnvironmentCheck, LoginRequest,
        LoginResponse, Message, MessageList, MessageQuery, Project, StatusMessage,
        UpdateAdminRequest, UpdateBlogPostRequest, UpdateMessageRequest, UpdateProjectRequest,
    },
    services::{admins, content, gate, messages},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

/// Name of the cookie that carries the access token after a browser login.
const SESSION_COOKIE: &str = auth::SESSION_COOKIES[0];

/// Builds the `Set-Cookie` value for the session cookie. `max_age = 0` clears it.
fn session_cookie(value: &str, max_age: i64, config: &AppConfig) -> String {
    let secure = if config.env == Env::Production {
        "; Secure"
    } else {
        ""
    };
    format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}{secure}")
}

// --- Auth ---

/// login
///
/// [Public Route] Exchanges email/password for a session, provided the account is an admin.
/// The access token is also set as an `HttpOnly` cookie for browser clients.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials or not an admin")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = gate::login(state.repo.as_ref(), state.identity.as_ref(), payload).await?;

    let cookie = session_cookie(
        &response.session.access_token,
        response.session.expires_in,
        &state.config,
    );
    Ok(([(header::SET_COOKIE, cookie)], Json(response)))
}

/// logout
///
/// [Public Route] Revokes the current session (if any) and clears the session cookie.
/// Idempotent: calling it without a live session still succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Signed out", body = StatusMessage),
        (status = 500, description = "Identity service failure")
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Result<impl IntoResponse, AppError> {
    let body = gate::logout(state.identity.as_ref(), token.as_deref()).await?;

    let cookie = session_cookie("", 0, &state.config);
    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// get_me
///
/// [Authenticated Route] Profile of the signed-in administrator.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Profile", body = CurrentUserResponse),
        (status = 401, description = "Not authenticated or not an admin")
    )
)]
pub async fn get_me(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CurrentUserResponse>, AppError> {
    let user = gate::current_user(state.repo.as_ref(), &principal).await?;
    Ok(Json(CurrentUserResponse { user }))
}

// --- Messages ---

/// create_message
///
/// [Public Route] Contact-form submission.
#[utoipa::path(
    post,
    path = "/api/messages",
    request_body = CreateMessageRequest,
    responses(
        (status = 201, description = "Stored", body = Message),
        (status = 400, description = "Validation error")
    )
)]
pub async fn create_message(
    State(state): State<AppState>,
    Json(payload): Json<CreateMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = messages::create_message(state.repo.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// list_messages
///
/// [Message Managers] Newest first, with optional status/type filters and pagination.
#[utoipa::path(
    get,
    path = "/api/messages",
    params(MessageQuery),
    responses(
        (status = 200, description = "Messages", body = MessageList),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn list_messages(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<MessageList>, AppError> {
    let list = messages::list_messages(state.repo.as_ref(), &principal, query).await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Found", body = Message),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_message(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Message>, AppError> {
    let message = messages::get_message(state.repo.as_ref(), &principal, id).await?;
    Ok(Json(message))
}

/// update_message
///
/// [Message Managers] Changes the moderation status (`unread`, `read`, `replied`).
#[utoipa::path(
    patch,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = UpdateMessageRequest,
    responses(
        (status = 200, description = "Updated", body = Message),
        (status = 400, description = "Missing or invalid status"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_message(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMessageRequest>,
) -> Result<Json<Message>, AppError> {
    let message = messages::update_message(state.repo.as_ref(), &principal, id, payload).await?;
    Ok(Json(message))
}

#[utoipa::path(
    delete,
    path = "/api/messages/{id}",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusMessage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_message(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMessage>, AppError> {
    let body = messages::delete_message(state.repo.as_ref(), &principal, id).await?;
    Ok(Json(body))
}

// --- Public content ---

/// get_blog_posts
///
/// [Public Route] Published posts, newest first.
#[utoipa::path(
    get,
    path = "/api/blog-posts",
    responses((status = 200, description = "Published posts", body = [BlogPost]))
)]
pub async fn get_blog_posts(State(state): State<AppState>) -> Result<Json<Vec<BlogPost>>, AppError> {
    Ok(Json(content::published_posts(state.repo.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/blog-posts/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = BlogPost),
        (status = 404, description = "Not Found or not published")
    )
)]
pub async fn get_blog_post(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<BlogPost>, AppError> {
    Ok(Json(content::published_post(state.repo.as_ref(), &slug).await?))
}

/// get_projects
///
/// [Public Route] Every project with its gallery, newest first.
#[utoipa::path(
    get,
    path = "/api/projects",
    responses((status = 200, description = "Projects", body = [Project]))
)]
pub async fn get_projects(State(state): State<AppState>) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(content::projects(state.repo.as_ref()).await?))
}

#[utoipa::path(
    get,
    path = "/api/projects/{slug}",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Found", body = Project),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_project(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Project>, AppError> {
    Ok(Json(content::project_by_slug(state.repo.as_ref(), &slug).await?))
}

// --- Content management ---

/// admin_get_blog_posts
///
/// [Content Managers] All posts regardless of status; optional `status` and `search` filters.
#[utoipa::path(
    get,
    path = "/api/admin/blog-posts",
    params(BlogPostQuery),
    responses(
        (status = 200, description = "All posts", body = [BlogPost]),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn admin_get_blog_posts(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<BlogPostQuery>,
) -> Result<Json<Vec<BlogPost>>, AppError> {
    let posts = content::list_posts(state.repo.as_ref(), &principal, query).await?;
    Ok(Json(posts))
}

/// create_blog_post
///
/// [Content Managers] The slug is derived from the title when omitted.
#[utoipa::path(
    post,
    path = "/api/admin/blog-posts",
    request_body = CreateBlogPostRequest,
    responses(
        (status = 201, description = "Created", body = BlogPost),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Slug already in use")
    )
)]
pub async fn create_blog_post(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateBlogPostRequest>,
) -> Result<(StatusCode, Json<BlogPost>), AppError> {
    let post = content::create_post(state.repo.as_ref(), &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    put,
    path = "/api/admin/blog-posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = UpdateBlogPostRequest,
    responses(
        (status = 200, description = "Updated", body = BlogPost),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already in use")
    )
)]
pub async fn update_blog_post(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBlogPostRequest>,
) -> Result<Json<BlogPost>, AppError> {
    let post = content::update_post(state.repo.as_ref(), &principal, id, payload).await?;
    Ok(Json(post))
}

#[utoipa::path(
    delete,
    path = "/api/admin/blog-posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusMessage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_blog_post(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMessage>, AppError> {
    Ok(Json(content::delete_post(state.repo.as_ref(), &principal, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/projects",
    responses(
        (status = 200, description = "All projects", body = [Project]),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn admin_get_projects(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, AppError> {
    Ok(Json(content::list_projects(state.repo.as_ref(), &principal).await?))
}

/// create_project
///
/// [Content Managers] Creates a project together with its gallery images.
#[utoipa::path(
    post,
    path = "/api/admin/projects",
    request_body = CreateProjectRequest,
    responses(
        (status = 201, description = "Created", body = Project),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Slug already in use")
    )
)]
pub async fn create_project(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    let project = content::create_project(state.repo.as_ref(), &principal, payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// update_project
///
/// [Content Managers] Partial update. A present `images` array replaces the gallery.
#[utoipa::path(
    put,
    path = "/api/admin/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    request_body = UpdateProjectRequest,
    responses(
        (status = 200, description = "Updated", body = Project),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Slug already in use")
    )
)]
pub async fn update_project(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let project = content::update_project(state.repo.as_ref(), &principal, id, payload).await?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/api/admin/projects/{id}",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Deleted", body = StatusMessage),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_project(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusMessage>, AppError> {
    Ok(Json(content::delete_project(state.repo.as_ref(), &principal, id).await?))
}

// --- Administrators ---

/// get_admins
///
/// [Super Admin] Lists admins, optionally filtered by `search`.
#[utoipa::path(
    get,
    path = "/api/admin/admins",
    params(AdminQuery),
    responses(
        (status = 200, description = "Admins", body = [Admin]),
        (status = 403, description = "Role not permitted")
    )
)]
pub async fn get_admins(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Vec<Admin>>, AppError> {
    let list = admins::list_admins(state.repo.as_ref(), &principal, query.search).await?;
    Ok(Json(list))
}

#[utoipa::path(
    patch,
    path = "/api/admin/admins/{id}",
    params(("id" = Uuid, Path, description = "Admin ID")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Updated", body = Admin),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_admin(
    AuthUser { principal, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAdminRequest>,
) -> Result<Json<Admin>, AppError> {
    let admin = admins::update_admin(state.repo.as_ref(), &principal, id, payload).await?;
    Ok(Json(admin))
}

// --- Dashboard & diagnostics ---

/// get_dashboard
///
/// [Dashboard Roles] Guarded by the role claim of the session token alone. Browsers without
/// a permitted role are redirected to `/admin/login`.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Dashboard data", body = DashboardResponse),
        (status = 303, description = "Redirect to /admin/login")
    )
)]
pub async fn get_dashboard(
    DashboardAccess { role, .. }: DashboardAccess,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let stats = state
        .repo
        .get_stats()
        .await
        .map_err(|e| AppError::operation("Failed to load dashboard", e))?;
    Ok(Json(DashboardResponse { role, stats }))
}

/// get_diagnostics
///
/// [Public Route] Integration self-check. Every check failure is reported in the body;
/// the endpoint itself always answers 200.
#[utoipa::path(
    get,
    path = "/api/diagnostics",
    responses((status = 200, description = "Diagnostics report", body = Diagnostics))
)]
pub async fn get_diagnostics(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Json<Diagnostics> {
    let config = &state.config;

    let environment = EnvironmentCheck {
        env: format!("{:?}", config.env).to_lowercase(),
        has_supabase_url: !config.supabase_url.is_empty(),
        has_supabase_key: !config.supabase_key.is_empty(),
        has_jwt_secret: !config.jwt_secret.is_empty(),
    };

    let mut authentication = AuthenticationCheck {
        has_token: token.is_some(),
        ..Default::default()
    };
    if let Some(token) = token.as_deref() {
        match state.identity.get_user(token).await {
            Ok(principal) => {
                let role = auth::decode_claims(token, &config.jwt_secret)
                    .ok()
                    .and_then(|claims| claims.admin_role());
                authentication.user = Some(DiagnosticUser {
                    id: principal.id,
                    email: principal.email,
                    role,
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "diagnostics: token check failed");
                authentication.error = Some("Invalid token".to_string());
            }
        }
    }

    let database = match state.repo.ping().await {
        Ok(()) => DatabaseCheck {
            can_query: true,
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, "diagnostics: database query failed");
            DatabaseCheck {
                can_query: false,
                error: Some("Database query failed".to_string()),
            }
        }
    };

    Json(Diagnostics {
        status: "ok".to_string(),
        environment,
        authentication,
        database,
        timestamp: Utc::now(),
    })
}
