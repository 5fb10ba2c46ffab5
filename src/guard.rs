use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::Redirect,
};

use crate::{
    auth::{self, Claims},
    config::AppConfig,
    error::AppError,
    identity::Principal,
    models::{Admin, AdminRole},
    repository::Repository,
};

// --- Allow-lists ---

pub const DASHBOARD_ROLES: &[AdminRole] = &[AdminRole::SuperAdmin, AdminRole::ContentManager];
pub const CONTENT_ROLES: &[AdminRole] = &[AdminRole::SuperAdmin, AdminRole::ContentManager];
pub const MESSAGE_ROLES: &[AdminRole] = &[AdminRole::SuperAdmin, AdminRole::MessageManager];
pub const ADMIN_ROLES: &[AdminRole] = &[AdminRole::SuperAdmin];

/// Where the claim guard sends rejected browsers.
pub const LOGIN_PAGE: &str = "/admin/login";

pub fn ensure_allowed(role: AdminRole, allowed: &[AdminRole]) -> Result<(), AppError> {
    if allowed.contains(&role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// require_role
///
/// The authorization check shared by every protected service operation. The caller's role is
/// re-read from `admins` on each call, so a demotion takes effect on the next request.
///
/// No `admins` row and a role outside `allowed` both fail with `Forbidden`.
pub async fn require_role(
    repo: &dyn Repository,
    principal: &Principal,
    allowed: &[AdminRole],
) -> Result<Admin, AppError> {
    let admin = repo
        .get_admin(principal.id)
        .await
        .map_err(|e| AppError::operation("Failed to verify admin", e))?
        .ok_or_else(|| {
            tracing::warn!(user_id = %principal.id, "no admin row for principal");
            AppError::Forbidden
        })?;

    if let Err(err) = ensure_allowed(admin.role, allowed) {
        tracing::warn!(admin_id = %admin.id, role = %admin.role, "role not permitted");
        return Err(err);
    }
    Ok(admin)
}

/// claim_role
///
/// Decodes the role claim of a session token and checks it against `allowed`. Every failure
/// (no token, bad signature, expired, no admin role, role not allowed) yields `None`.
pub fn claim_role(
    token: Option<&str>,
    secret: &str,
    allowed: &[AdminRole],
) -> Option<(AdminRole, Claims)> {
    let claims = auth::decode_claims(token?, secret).ok()?;
    let role = claims.admin_role()?;
    ensure_allowed(role, allowed).ok()?;
    Some((role, claims))
}

/// DashboardAccess Extractor
///
/// Guards the admin dashboard using only the signed claims in the session token; no
/// database round trip. Rejects by redirecting to the login page.
#[derive(Debug, Clone)]
pub struct DashboardAccess {
    pub role: AdminRole,
    pub claims: Claims,
}

impl<S> FromRequestParts<S> for DashboardAccess
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        let token = auth::session_token(&parts.headers);

        let (role, claims) = claim_role(token.as_deref(), &config.jwt_secret, DASHBOARD_ROLES)
            .ok_or_else(|| {
                tracing::debug!(path = %parts.uri.path(), "dashboard guard redirecting to login");
                Redirect::to(LOGIN_PAGE)
            })?;

        Ok(DashboardAccess { role, claims })
    }
}
