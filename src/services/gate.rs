use chrono::Utc;

use crate::{
    error::AppError,
    identity::{IdentityError, IdentityService, Principal},
    models::{AdminSummary, CurrentUser, LoginRequest, LoginResponse, StatusMessage},
    repository::Repository,
};

/// Signs out a session that must not outlive a failed login. Failures are only logged: the
/// caller is already returning an error.
async fn discard_session(identity: &dyn IdentityService, access_token: &str) {
    if let Err(e) = identity.sign_out(access_token).await {
        tracing::warn!(error = %e, "failed to revoke session of rejected login");
    }
}

/// login
///
/// 1. Both fields must be present. The email is trimmed; the password is passed through as-is.
/// 2. The identity service checks the password. A rejection is reported as the generic
///    `InvalidCredentials`, whatever the reason.
/// 3. The principal must have an `admins` row. Otherwise the freshly issued session is
///    revoked before failing, so nothing usable is left behind.
/// 4. `last_login` is stamped best-effort.
pub async fn login(
    repo: &dyn Repository,
    identity: &dyn IdentityService,
    request: LoginRequest,
) -> Result<LoginResponse, AppError> {
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    let password = request.password.as_deref().unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(AppError::validation("Email and password are required"));
    }

    let signed_in = identity
        .sign_in_with_password(email, password)
        .await
        .map_err(|e| match e {
            IdentityError::Rejected => {
                tracing::info!("sign-in rejected by identity service");
                AppError::InvalidCredentials
            }
            other => AppError::operation("Failed to login", other),
        })?;

    let principal = signed_in.principal;
    let session = signed_in.session;

    let admin = match repo.get_admin(principal.id).await {
        Ok(Some(admin)) => admin,
        Ok(None) => {
            tracing::warn!(user_id = %principal.id, "authenticated user is not an admin");
            discard_session(identity, &session.access_token).await;
            return Err(AppError::AccessDenied);
        }
        Err(e) => {
            discard_session(identity, &session.access_token).await;
            return Err(AppError::operation("Failed to verify admin", e));
        }
    };

    if let Err(e) = repo.touch_last_login(admin.id, Utc::now()).await {
        tracing::warn!(admin_id = %admin.id, error = %e, "failed to update last_login");
    }

    tracing::info!(admin_id = %admin.id, role = %admin.role, "admin signed in");

    Ok(LoginResponse {
        user: AdminSummary {
            id: admin.id,
            email: principal.email,
            name: admin.name,
            role: admin.role,
        },
        session,
    })
}

/// logout
///
/// Revokes the session behind `access_token`. A request without a token is already signed
/// out, so repeated calls all succeed.
pub async fn logout(
    identity: &dyn IdentityService,
    access_token: Option<&str>,
) -> Result<StatusMessage, AppError> {
    if let Some(token) = access_token {
        identity
            .sign_out(token)
            .await
            .map_err(|e| AppError::Logout {
                detail: e.to_string(),
            })?;
    }
    Ok(StatusMessage::new("Logged out successfully"))
}

/// current_user
///
/// Profile of the signed-in principal, read fresh from `admins`.
pub async fn current_user(
    repo: &dyn Repository,
    principal: &Principal,
) -> Result<CurrentUser, AppError> {
    let admin = repo
        .get_admin(principal.id)
        .await
        .map_err(|e| AppError::operation("Failed to fetch user", e))?
        .ok_or(AppError::NotAnAdmin)?;

    Ok(CurrentUser {
        id: principal.id,
        email: principal.email.clone(),
        name: admin.name,
        role: admin.role,
        last_login: admin.last_login,
        created_at: admin.created_at,
    })
}
