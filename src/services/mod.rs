/// Service Module Index
///
/// Business rules sitting between the HTTP handlers and the two injected collaborators
/// (`Repository`, `IdentityService`). Services take the collaborators as trait objects and
/// return `AppError`, so they can be driven directly from tests without a router.

/// Login, logout and current-user resolution.
pub mod gate;

/// Contact-form intake and message moderation.
pub mod messages;

/// Blog posts and projects.
pub mod content;

/// Super-admin management of `admins` rows.
pub mod admins;
