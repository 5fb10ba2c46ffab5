use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// UnknownVariant
///
/// Returned when a text column or request field holds a value outside one of the
/// enumerated domains below (roles, message types, statuses).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Implements the text mapping shared by every enumerated column: `as_str`, `Display`,
/// `FromStr` and `TryFrom<String>` (used by `#[sqlx(try_from = "String")]`).
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? } $(, legacy { $($alias:literal => $target:ident),+ })?) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    $($($alias => Ok($name::$target),)+)?
                    _ => Err(UnknownVariant { kind: $kind, value: s.to_string() }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

// --- Administrators ---

/// AdminRole
///
/// The administrative roles stored in `admins.role`. `message_manager` is the canonical
/// spelling; rows written with the older `messages_manager` spelling are normalized on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum AdminRole {
    SuperAdmin,
    #[default]
    ContentManager,
    MessageManager,
}

text_enum!(AdminRole, "admin role", {
    SuperAdmin => "super_admin",
    ContentManager => "content_manager",
    MessageManager => "message_manager",
}, legacy { "messages_manager" => MessageManager });

/// Admin
///
/// A row of the `admins` table. The `id` is the identity-service user id; the presence of
/// this row is what turns an authenticated principal into an administrator.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Admin {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub role: AdminRole,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// AdminSummary
///
/// The identity returned to the client after a successful login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
}

/// UpdateAdminRequest
///
/// Partial update of an admin row (PATCH /api/admin/admins/{id}).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateAdminRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
}

/// AdminQuery
///
/// Query-string parameters of GET /api/admin/admins.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct AdminQuery {
    /// Case-insensitive match against email, name or role.
    pub search: Option<String>,
}

// --- Authentication ---

/// LoginRequest
///
/// Both fields are optional at the serde level so that a missing field is reported as a
/// validation error rather than a JSON rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Session
///
/// Token material issued by the identity service. Never persisted server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub user: AdminSummary,
    pub session: Session,
}

/// CurrentUser
///
/// Profile of the signed-in administrator (GET /api/auth/me).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CurrentUserResponse {
    pub user: CurrentUser,
}

/// StatusMessage
///
/// Plain confirmation body, e.g. `{"message": "Logged out successfully"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// --- Messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessageType {
    #[default]
    Contact,
    Project,
    Volunteer,
}

text_enum!(MessageType, "message type", {
    Contact => "contact",
    Project => "project",
    Volunteer => "volunteer",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MessageStatus {
    #[default]
    Unread,
    Read,
    Replied,
}

text_enum!(MessageStatus, "message status", {
    Unread => "unread",
    Read => "read",
    Replied => "replied",
});

/// Message
///
/// A row of the `messages` table: a contact-form submission.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Message {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub project: Option<String>,
    pub message: String,
    // `type` is a reserved keyword in Rust.
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub message_type: MessageType,
    #[sqlx(try_from = "String")]
    pub status: MessageStatus,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// CreateMessageRequest
///
/// Public contact-form payload (POST /api/messages). `name` is a single full-name field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMessageRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub project: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

/// NewMessage
///
/// A validated submission, ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub project: Option<String>,
    pub message: String,
    pub message_type: MessageType,
    pub status: MessageStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMessageRequest {
    pub status: Option<String>,
}

/// MessageQuery
///
/// Raw query-string parameters of GET /api/messages.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct MessageQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// MessageFilter
///
/// Validated form of `MessageQuery` handed to the repository.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageFilter {
    pub status: Option<MessageStatus>,
    pub message_type: Option<MessageType>,
    pub limit: Option<i64>,
    pub offset: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageList {
    pub messages: Vec<Message>,
    pub total: i64,
}

// --- Blog ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum BlogStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

text_enum!(BlogStatus, "blog status", {
    Draft => "draft",
    Published => "published",
    Archived => "archived",
});

/// BlogPost
///
/// A row of the `blog_posts` table.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub category: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: BlogStatus,
    #[ts(type = "string | null")]
    pub published_at: Option<DateTime<Utc>>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateBlogPostRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<BlogStatus>,
}

/// UpdateBlogPostRequest
///
/// Partial update; only provided fields are written.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateBlogPostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BlogStatus>,
}

/// BlogPostQuery
///
/// Query-string parameters of GET /api/admin/blog-posts.
#[derive(Debug, Clone, Deserialize, utoipa::IntoParams, Default)]
pub struct BlogPostQuery {
    pub status: Option<String>,
    /// Case-insensitive match against title or slug.
    pub search: Option<String>,
}

/// NewBlogPost
///
/// Fully resolved insert payload (slug derived, publication time stamped).
#[derive(Debug, Clone, PartialEq)]
pub struct NewBlogPost {
    pub title: String,
    pub slug: String,
    pub excerpt: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub status: BlogStatus,
    pub published_at: Option<DateTime<Utc>>,
}

// --- Projects ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProjectStatus {
    Planned,
    #[default]
    Ongoing,
    Completed,
}

text_enum!(ProjectStatus, "project status", {
    Planned => "planned",
    Ongoing => "ongoing",
    Completed => "completed",
});

/// ProjectImage
///
/// A gallery image from `project_images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct ProjectImage {
    pub id: Uuid,
    pub image_url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProjectImageInput {
    pub image_url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Project
///
/// A row of the `projects` table together with its gallery images, which are loaded by a
/// second query and are therefore skipped by `FromRow`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Project {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub categories: Vec<String>,
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub people_helped: i32,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    pub content: Option<String>,
    pub goals: Vec<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub images: Vec<ProjectImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub people_helped: i32,
    #[serde(default)]
    pub status: Option<ProjectStatus>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub goals: Vec<String>,
    #[serde(default)]
    pub images: Vec<ProjectImageInput>,
}

/// UpdateProjectRequest
///
/// Partial update. When `images` is present it replaces the whole gallery.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub people_helped: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goals: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ProjectImageInput>>,
}

/// NewProject
#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub slug: String,
    pub title: String,
    pub excerpt: Option<String>,
    pub image: Option<String>,
    pub categories: Vec<String>,
    pub start_date: Option<NaiveDate>,
    pub location: Option<String>,
    pub people_helped: i32,
    pub status: ProjectStatus,
    pub content: Option<String>,
    pub goals: Vec<String>,
    pub images: Vec<ProjectImageInput>,
}

// --- Dashboard ---

/// DashboardStats
///
/// Counters shown on the admin dashboard (GET /admin/dashboard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DashboardStats {
    pub total_messages: i64,
    pub unread_messages: i64,
    pub total_blog_posts: i64,
    pub published_blog_posts: i64,
    pub total_projects: i64,
    pub total_admins: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardResponse {
    pub role: AdminRole,
    pub stats: DashboardStats,
}

// --- Diagnostics ---

/// Diagnostics
///
/// Report of GET /api/diagnostics: configuration presence, session check and a test
/// query. Secrets are reported as present/absent only.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Diagnostics {
    pub status: String,
    pub environment: EnvironmentCheck,
    pub authentication: AuthenticationCheck,
    pub database: DatabaseCheck,
    #[ts(type = "string")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EnvironmentCheck {
    pub env: String,
    pub has_supabase_url: bool,
    pub has_supabase_key: bool,
    pub has_jwt_secret: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AuthenticationCheck {
    pub has_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<DiagnosticUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DiagnosticUser {
    pub id: Uuid,
    pub email: String,
    /// Admin role carried by the token's claims, if any.
    pub role: Option<AdminRole>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DatabaseCheck {
    pub can_query: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
