/// Router Module Index
///
/// Routes are grouped by how access is decided, so that the authentication layer is applied
/// per group in `create_router` rather than per handler.

/// Anonymous access: health, login/logout, contact form, published content, diagnostics.
pub mod public;

/// Requires a valid session (`AuthUser`); the role is then checked per operation.
pub mod authenticated;

/// Content and administrator management under `/api/admin`, plus the claim-guarded dashboard.
pub mod admin;
