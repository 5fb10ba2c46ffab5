mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::*;
use foundation_api::{
    AppError, MockIdentityService, MockRepository,
    auth::{AuthUser, Claims, RoleMetadata},
    config::AppConfig,
    create_router,
    guard::DashboardAccess,
    models::{AdminRole, LoginRequest},
    services::gate,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::SystemTime;
use tower::ServiceExt;
use uuid::Uuid;

// --- Helper Functions ---

fn create_token(secret: &str, role: Option<&str>, meta_role: Option<&str>, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: Uuid::new_v4(),
        email: Some("someone@foundation.org".to_string()),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
        role: role.map(String::from),
        user_metadata: meta_role.map(|r| RoleMetadata {
            role: Some(r.to_string()),
        }),
        app_metadata: None,
    };

    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

/// Helper to get the mutable Parts struct from a generated Request
fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(mut parts: Parts, token: &str) -> Parts {
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn with_cookie(mut parts: Parts, cookie: &str) -> Parts {
    parts
        .headers
        .insert(header::COOKIE, header::HeaderValue::from_str(cookie).unwrap());
    parts
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: Some(email.to_string()),
        password: Some(password.to_string()),
    }
}

// --- AuthUser extractor ---

#[tokio::test]
async fn test_auth_success_with_live_session() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, CONTENT_MANAGER).await;

    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &ctx.state)
        .await
        .unwrap();

    assert_eq!(auth_user.principal.id, CONTENT_MANAGER);
    assert_eq!(auth_user.principal.email, email_of(CONTENT_MANAGER));
    assert_eq!(auth_user.token, token);
}

#[tokio::test]
async fn test_auth_accepts_session_cookie() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;

    let mut parts = with_cookie(
        get_request_parts(Method::GET, "/".parse().unwrap()),
        &format!("theme=dark; sb-access-token={token}"),
    );
    let auth_user = AuthUser::from_request_parts(&mut parts, &ctx.state)
        .await
        .unwrap();
    assert_eq!(auth_user.principal.id, SUPER_ADMIN);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let ctx = seeded_context();
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let auth_user = AuthUser::from_request_parts(&mut parts, &ctx.state).await;
    assert!(matches!(auth_user, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_auth_failure_after_sign_out() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;
    gate::logout(ctx.identity.as_ref(), Some(token.as_str())).await.unwrap();

    // The JWT is still correctly signed and unexpired, but the session is gone.
    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);
    let auth_user = AuthUser::from_request_parts(&mut parts, &ctx.state).await;

    let err = auth_user.unwrap_err();
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_user_is_resolved_once_per_request() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;
    let before = ctx.identity.lookups();

    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);
    let first = AuthUser::from_request_parts(&mut parts, &ctx.state).await.unwrap();
    let second = AuthUser::from_request_parts(&mut parts, &ctx.state).await.unwrap();

    assert_eq!(first.principal, second.principal);
    assert_eq!(ctx.identity.lookups() - before, 1);
}

#[tokio::test]
async fn test_layered_route_makes_one_identity_lookup() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;
    let before = ctx.identity.lookups();

    let response = create_router(ctx.state.clone())
        .oneshot(bearer_request("GET", "/api/auth/me", &token, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(ctx.identity.lookups() - before, 1);
}

// --- Claim guard (dashboard) ---

#[tokio::test]
async fn test_dashboard_guard_accepts_allowed_claims() {
    let ctx = seeded_context();
    let secret = AppConfig::default().jwt_secret;

    // Supabase puts `authenticated` at the top level; the admin role lives in user_metadata.
    let token = create_token(&secret, Some("authenticated"), Some("content_manager"), 3600);
    let mut parts = with_cookie(
        get_request_parts(Method::GET, "/admin/dashboard".parse().unwrap()),
        &format!("supabase-auth-token={token}"),
    );

    let access = DashboardAccess::from_request_parts(&mut parts, &ctx.state)
        .await
        .unwrap();
    assert_eq!(access.role, AdminRole::ContentManager);

    let token = create_token(&secret, Some("super_admin"), None, 3600);
    let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);
    let access = DashboardAccess::from_request_parts(&mut parts, &ctx.state)
        .await
        .unwrap();
    assert_eq!(access.role, AdminRole::SuperAdmin);
}

#[tokio::test]
async fn test_dashboard_guard_fails_closed() {
    let ctx = seeded_context();
    let secret = AppConfig::default().jwt_secret;

    let rejected = [
        // Role outside the dashboard allow-list (either spelling).
        create_token(&secret, None, Some("message_manager"), 3600),
        create_token(&secret, None, Some("messages_manager"), 3600),
        // No admin role at all.
        create_token(&secret, Some("authenticated"), None, 3600),
        // Expired.
        create_token(&secret, None, Some("super_admin"), -3600),
        // Signed with another secret.
        create_token("some-other-secret", None, Some("super_admin"), 3600),
        // Garbage.
        "not.a.jwt".to_string(),
    ];

    for token in rejected {
        let mut parts = with_bearer(get_request_parts(Method::GET, "/".parse().unwrap()), &token);
        let result = DashboardAccess::from_request_parts(&mut parts, &ctx.state).await;
        assert!(result.is_err(), "token should have been rejected: {token}");
    }

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    assert!(
        DashboardAccess::from_request_parts(&mut parts, &ctx.state)
            .await
            .is_err()
    );
}

// --- Auth gate ---

#[tokio::test]
async fn test_login_success_returns_admin_and_session() {
    let ctx = seeded_context();

    let response = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(MESSAGE_MANAGER), PASSWORD),
    )
    .await
    .unwrap();

    assert_eq!(response.user.id, MESSAGE_MANAGER);
    assert_eq!(response.user.email, email_of(MESSAGE_MANAGER));
    assert_eq!(response.user.name, "Morgan Messages");
    assert_eq!(response.user.role, AdminRole::MessageManager);
    assert!(!response.session.access_token.is_empty());

    // last_login is stamped.
    assert!(ctx.repo.admin(MESSAGE_MANAGER).unwrap().last_login.is_some());
}

#[tokio::test]
async fn test_login_requires_both_fields() {
    let ctx = seeded_context();

    for request in [
        LoginRequest::default(),
        LoginRequest {
            email: Some("   ".to_string()),
            password: Some(PASSWORD.to_string()),
        },
        LoginRequest {
            email: Some(email_of(SUPER_ADMIN).to_string()),
            password: None,
        },
    ] {
        let err = gate::login(ctx.repo.as_ref(), ctx.identity.as_ref(), request)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(err.to_string(), "Email and password are required");
    }
    assert_eq!(ctx.identity.active_sessions(), 0);
}

#[tokio::test]
async fn test_login_passes_blank_password_to_identity_service() {
    let ctx = seeded_context();

    let err = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(SUPER_ADMIN), "   "),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::InvalidCredentials));
    assert_eq!(ctx.identity.active_sessions(), 0);
}

#[tokio::test]
async fn test_login_rejection_does_not_reveal_account_existence() {
    let ctx = seeded_context();

    let wrong_password = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(SUPER_ADMIN), "wrong"),
    )
    .await
    .unwrap_err();
    let unknown_email = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request("nobody@example.com", PASSWORD),
    )
    .await
    .unwrap_err();

    assert!(matches!(wrong_password, AppError::InvalidCredentials));
    assert!(matches!(unknown_email, AppError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    assert_eq!(wrong_password.to_string(), "Invalid credentials");
}

#[tokio::test]
async fn test_login_without_admin_row_leaves_no_session() {
    let ctx = seeded_context();

    let err = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(OUTSIDER), PASSWORD),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::AccessDenied));
    assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    // The session issued by the identity service was revoked.
    assert_eq!(ctx.identity.active_sessions(), 0);
}

#[tokio::test]
async fn test_login_admin_lookup_failure_revokes_session() {
    let secret = AppConfig::default().jwt_secret;
    let ctx = create_test_state(MockRepository::failing(), seeded_identity(&secret));

    let err = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(SUPER_ADMIN), PASSWORD),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(ctx.identity.active_sessions(), 0);
}

#[tokio::test]
async fn test_login_tolerates_last_login_failure() {
    let secret = AppConfig::default().jwt_secret;
    let mut repo = seeded_repo();
    repo.fail_last_login = true;
    let ctx = create_test_state(repo, seeded_identity(&secret));

    let response = gate::login(
        ctx.repo.as_ref(),
        ctx.identity.as_ref(),
        login_request(email_of(SUPER_ADMIN), PASSWORD),
    )
    .await
    .unwrap();

    assert_eq!(response.user.role, AdminRole::SuperAdmin);
    assert!(ctx.repo.admin(SUPER_ADMIN).unwrap().last_login.is_none());
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let ctx = seeded_context();
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;

    let first = gate::logout(ctx.identity.as_ref(), Some(token.as_str())).await.unwrap();
    let second = gate::logout(ctx.identity.as_ref(), Some(token.as_str())).await.unwrap();
    let without_token = gate::logout(ctx.identity.as_ref(), None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, without_token);
    assert_eq!(first.message, "Logged out successfully");
}

#[tokio::test]
async fn test_logout_failure_is_reported() {
    let secret = AppConfig::default().jwt_secret;
    let identity = seeded_identity(&secret).failing_sign_out();
    let ctx = create_test_state(seeded_repo(), identity);
    let token = access_token(&ctx.identity, SUPER_ADMIN).await;

    let err = gate::logout(ctx.identity.as_ref(), Some(token.as_str()))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Logout { .. }));
    assert_eq!(err.to_string(), "Failed to logout");
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_current_user_requires_admin_row() {
    let ctx = seeded_context();

    let user = gate::current_user(ctx.repo.as_ref(), &principal(CONTENT_MANAGER))
        .await
        .unwrap();
    assert_eq!(user.name, "Casey Content");
    assert_eq!(user.role, AdminRole::ContentManager);

    let err = gate::current_user(ctx.repo.as_ref(), &principal(OUTSIDER))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotAnAdmin));
    assert_eq!(err.to_string(), "Not an admin user");
}

#[tokio::test]
async fn test_legacy_role_spelling_is_normalized() {
    // An identity whose token only knows the legacy spelling still resolves to the
    // canonical role for the database check.
    let repo = MockRepository::new().with_admin(
        MESSAGE_MANAGER,
        email_of(MESSAGE_MANAGER),
        "Legacy",
        "messages_manager".parse().unwrap(),
    );
    let identity = MockIdentityService::new("secret");
    let ctx = create_test_state(repo, identity);

    let user = gate::current_user(ctx.repo.as_ref(), &principal(MESSAGE_MANAGER))
        .await
        .unwrap();
    assert_eq!(user.role, AdminRole::MessageManager);
}
