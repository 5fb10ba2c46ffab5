use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    error::AppError,
    identity::{IdentityError, IdentityState, Principal},
    models::AdminRole,
};

/// Cookie names the session token may arrive under, in order of preference.
pub const SESSION_COOKIES: [&str; 2] = ["sb-access-token", "supabase-auth-token"];

/// Claims
///
/// The payload of a session JWT issued by the identity service. Only the fields this
/// application reads are modelled; Supabase adds more (`aud`, `session_id`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity-service user id, also the primary key of `admins`.
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    /// Top-level role. Supabase puts its Postgres role here (`authenticated`); custom token
    /// hooks may put the admin role here instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<RoleMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_metadata: Option<RoleMetadata>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Claims {
    /// The admin role carried by the token: the top-level `role` if it names an admin role,
    /// otherwise `user_metadata.role`, otherwise `app_metadata.role`.
    pub fn admin_role(&self) -> Option<AdminRole> {
        let nested = |m: &Option<RoleMetadata>| m.as_ref().and_then(|m| m.role.clone());

        [
            self.role.clone(),
            nested(&self.user_metadata),
            nested(&self.app_metadata),
        ]
        .into_iter()
        .flatten()
        .find_map(|r| r.parse::<AdminRole>().ok())
    }
}

/// decode_claims
///
/// Verifies the signature (HS256, project JWT secret) and expiry of a session token.
/// The audience is not checked: Supabase always issues `authenticated`.
pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.validate_aud = false;

    let data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
            _ => tracing::debug!(error = %e, "session token rejected"),
        }
        e
    })?;

    Ok(data.claims)
}

/// session_token
///
/// Reads the raw session token from `Authorization: Bearer ...`, falling back to the session
/// cookies set at login.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let cookies: Vec<(&str, &str)> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .collect();

    SESSION_COOKIES.iter().find_map(|name| {
        cookies
            .iter()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    })
}

/// SessionToken Extractor
///
/// The raw session token, if any. Never rejects; used where a missing session is not an
/// error (logout, diagnostics).
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(session_token(&parts.headers)))
    }
}

/// AuthUser Extractor Result
///
/// The resolved identity of an authenticated request. Being an `AuthUser` says nothing about
/// admin status: that is decided per operation by `guard::require_role`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub principal: Principal,
    pub token: String,
}

/// AuthUser Extractor Implementation
///
/// 1. Token Extraction: bearer header or session cookie.
/// 2. Session Validation: the identity service resolves the token to its principal, so a
///    signed-out session stops working immediately, not just at expiry.
/// 3. Caching: the resolved user is stored in the request extensions, so the auth middleware
///    and the handler share one identity-service lookup.
///
/// Rejection: `AppError::Unauthorized` (401) on any failure; upstream outages are 500.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    IdentityState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let identity = IdentityState::from_ref(state);

        let token = session_token(&parts.headers).ok_or(AppError::Unauthorized)?;

        let principal = identity.get_user(&token).await.map_err(|e| match e {
            IdentityError::Rejected => AppError::Unauthorized,
            other => AppError::operation("Failed to verify session", other),
        })?;

        let user = AuthUser { principal, token };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn claims(role: Option<&str>, meta: Option<&str>) -> Claims {
        Claims {
            sub: Uuid::nil(),
            email: None,
            exp: 0,
            iat: 0,
            role: role.map(String::from),
            user_metadata: meta.map(|r| RoleMetadata {
                role: Some(r.to_string()),
            }),
            app_metadata: None,
        }
    }

    #[test]
    fn role_claim_falls_through_postgres_role() {
        assert_eq!(
            claims(Some("authenticated"), Some("content_manager")).admin_role(),
            Some(AdminRole::ContentManager)
        );
        assert_eq!(
            claims(Some("super_admin"), Some("content_manager")).admin_role(),
            Some(AdminRole::SuperAdmin)
        );
        assert_eq!(claims(Some("authenticated"), None).admin_role(), None);
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sb-access-token=cookie"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer header"));
        assert_eq!(session_token(&headers).as_deref(), Some("header"));
    }

    #[test]
    fn cookie_fallback_order() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; supabase-auth-token=legacy; sb-access-token=current"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("current"));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("supabase-auth-token=legacy"));
        assert_eq!(session_token(&headers).as_deref(), Some("legacy"));

        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
