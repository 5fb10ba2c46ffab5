#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response};
use chrono::{Duration, Utc};
use foundation_api::{
    AppState, MockIdentityService, MockRepository,
    config::AppConfig,
    identity::{IdentityService, Principal},
    models::{AdminRole, BlogPost, BlogStatus, Message, MessageStatus, MessageType, Project},
};
use std::sync::Arc;
use uuid::Uuid;

// --- Seeded accounts ---

pub const PASSWORD: &str = "correct-horse-battery";

pub const SUPER_ADMIN: Uuid = Uuid::from_u128(1);
pub const CONTENT_MANAGER: Uuid = Uuid::from_u128(2);
pub const MESSAGE_MANAGER: Uuid = Uuid::from_u128(3);
/// Has an identity-service account but no `admins` row.
pub const OUTSIDER: Uuid = Uuid::from_u128(4);

pub fn email_of(id: Uuid) -> &'static str {
    match id {
        SUPER_ADMIN => "super@foundation.org",
        CONTENT_MANAGER => "content@foundation.org",
        MESSAGE_MANAGER => "messages@foundation.org",
        _ => "visitor@example.com",
    }
}

pub fn principal(id: Uuid) -> Principal {
    Principal {
        id,
        email: email_of(id).to_string(),
    }
}

/// Identity service knowing all four accounts. Role claims mirror the `admins` rows; the
/// outsider carries a `content_manager` claim to prove that the claim alone grants nothing
/// on database-checked routes.
pub fn seeded_identity(secret: &str) -> MockIdentityService {
    MockIdentityService::new(secret)
        .with_user(SUPER_ADMIN, email_of(SUPER_ADMIN), PASSWORD, Some(AdminRole::SuperAdmin))
        .with_user(
            CONTENT_MANAGER,
            email_of(CONTENT_MANAGER),
            PASSWORD,
            Some(AdminRole::ContentManager),
        )
        .with_user(
            MESSAGE_MANAGER,
            email_of(MESSAGE_MANAGER),
            PASSWORD,
            Some(AdminRole::MessageManager),
        )
        .with_user(OUTSIDER, email_of(OUTSIDER), PASSWORD, Some(AdminRole::ContentManager))
}

pub fn seeded_repo() -> MockRepository {
    MockRepository::new()
        .with_admin(SUPER_ADMIN, email_of(SUPER_ADMIN), "Sam Super", AdminRole::SuperAdmin)
        .with_admin(
            CONTENT_MANAGER,
            email_of(CONTENT_MANAGER),
            "Casey Content",
            AdminRole::ContentManager,
        )
        .with_admin(
            MESSAGE_MANAGER,
            email_of(MESSAGE_MANAGER),
            "Morgan Messages",
            AdminRole::MessageManager,
        )
}

/// Handles to the mocks behind an `AppState`, for assertions after a request.
pub struct TestContext {
    pub state: AppState,
    pub repo: Arc<MockRepository>,
    pub identity: Arc<MockIdentityService>,
}

pub fn create_test_state(repo: MockRepository, identity: MockIdentityService) -> TestContext {
    let config = AppConfig::default();
    let repo = Arc::new(repo);
    let identity = Arc::new(identity);

    let state = AppState {
        repo: repo.clone(),
        identity: identity.clone(),
        config,
    };
    TestContext {
        state,
        repo,
        identity,
    }
}

/// Seeded repository and identity service, signed with the default config's JWT secret.
pub fn seeded_context() -> TestContext {
    let secret = AppConfig::default().jwt_secret;
    create_test_state(seeded_repo(), seeded_identity(&secret))
}

/// Signs in directly against the identity service and returns the access token.
pub async fn access_token(identity: &MockIdentityService, id: Uuid) -> String {
    identity
        .sign_in_with_password(email_of(id), PASSWORD)
        .await
        .expect("seeded account signs in")
        .session
        .access_token
}

pub fn bearer_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Fixtures ---

pub fn message(first_name: &str, status: MessageStatus, kind: MessageType, age_minutes: i64) -> Message {
    Message {
        id: Uuid::new_v4(),
        first_name: first_name.to_string(),
        last_name: "Tester".to_string(),
        email: format!("{}@example.com", first_name.to_lowercase()),
        message: "Hello there".to_string(),
        message_type: kind,
        status,
        created_at: Utc::now() - Duration::minutes(age_minutes),
        ..Default::default()
    }
}

pub fn blog_post(slug: &str, status: BlogStatus) -> BlogPost {
    let now = Utc::now();
    BlogPost {
        id: Uuid::new_v4(),
        title: slug.replace('-', " "),
        slug: slug.to_string(),
        content: "Body".to_string(),
        status,
        published_at: (status == BlogStatus::Published).then_some(now),
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}

pub fn project(slug: &str) -> Project {
    let now = Utc::now();
    Project {
        id: Uuid::new_v4(),
        slug: slug.to_string(),
        title: slug.replace('-', " "),
        created_at: now,
        updated_at: now,
        ..Default::default()
    }
}
