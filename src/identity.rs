use async_trait::async_trait;
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{Claims, RoleMetadata};
use crate::models::{AdminRole, Session};

/// Principal
///
/// The authenticated identity returned by the identity service for the current request.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

/// SignIn
///
/// Result of a successful password sign-in: who signed in and the session they received.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub principal: Principal,
    pub session: Session,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The service refused the credentials or the token.
    #[error("identity service rejected the request")]
    Rejected,
    #[error("identity service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("identity service returned {status}: {body}")]
    Unexpected { status: u16, body: String },
}

// 1. IdentityService Contract
/// IdentityService
///
/// The three primitives this application consumes from the hosted identity service. The real
/// client talks to Supabase GoTrue; `MockIdentityService` keeps users and sessions in memory.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Exchanges an email/password pair for a session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignIn, IdentityError>;

    /// Revokes the session behind `access_token`. A token the service no longer knows is
    /// treated as already signed out.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;

    /// Resolves the principal owning `access_token`, or `Rejected` if the session is invalid.
    async fn get_user(&self, access_token: &str) -> Result<Principal, IdentityError>;
}

/// IdentityState
///
/// The shared handle stored in `AppState`.
pub type IdentityState = Arc<dyn IdentityService>;

// 2. The Real Implementation (Supabase GoTrue)

#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

impl From<GoTrueUser> for Principal {
    fn from(user: GoTrueUser) -> Self {
        Principal {
            id: user.id,
            email: user.email.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct GoTrueTokenResponse {
    access_token: String,
    refresh_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    expires_at: Option<i64>,
    user: GoTrueUser,
}

/// SupabaseIdentity
///
/// Client for the GoTrue REST API exposed under `{SUPABASE_URL}/auth/v1`.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseIdentity {
    pub fn new(supabase_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("{}/auth/v1", supabase_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        }
    }

    async fn unexpected(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        IdentityError::Unexpected { status, body }
    }
}

#[async_trait]
impl IdentityService for SupabaseIdentity {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignIn, IdentityError> {
        let response = self
            .client
            .post(format!("{}/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.api_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => {
                let token = response.json::<GoTrueTokenResponse>().await?;
                Ok(SignIn {
                    principal: token.user.into(),
                    session: Session {
                        access_token: token.access_token,
                        refresh_token: token.refresh_token,
                        token_type: token.token_type,
                        expires_in: token.expires_in,
                        expires_at: token.expires_at,
                    },
                })
            }
            // GoTrue answers 400 `invalid_grant` for both unknown emails and bad passwords.
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(IdentityError::Rejected)
            }
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(format!("{}/logout", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                tracing::debug!("sign_out: session already invalid");
                Ok(())
            }
            _ => Err(Self::unexpected(response).await),
        }
    }

    async fn get_user(&self, access_token: &str) -> Result<Principal, IdentityError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(response.json::<GoTrueUser>().await?.into()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(IdentityError::Rejected)
            }
            _ => Err(Self::unexpected(response).await),
        }
    }
}

// 3. The Mock Implementation (For Tests)

#[derive(Clone)]
struct MockUser {
    id: Uuid,
    password: String,
    role_claim: Option<AdminRole>,
}

/// MockIdentityService
///
/// In-memory identity service. Sessions are real HS256 JWTs signed with `jwt_secret`, so the
/// claim-based role guard can be exercised end to end; a signed-out token stops resolving
/// through `get_user` even though its signature remains valid.
pub struct MockIdentityService {
    jwt_secret: String,
    users: Mutex<HashMap<String, MockUser>>,
    sessions: Mutex<HashMap<String, Principal>>,
    lookups: AtomicUsize,
    /// When true, `sign_out` returns a simulated upstream failure.
    pub fail_sign_out: bool,
}

impl MockIdentityService {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            users: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            lookups: AtomicUsize::new(0),
            fail_sign_out: false,
        }
    }

    /// Registers a user. `role_claim` is embedded in the token's `user_metadata.role`.
    pub fn with_user(
        self,
        id: Uuid,
        email: &str,
        password: &str,
        role_claim: Option<AdminRole>,
    ) -> Self {
        lock(&self.users).insert(
            email.to_string(),
            MockUser {
                id,
                password: password.to_string(),
                role_claim,
            },
        );
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    /// Number of sessions that would still resolve through `get_user`.
    pub fn active_sessions(&self) -> usize {
        lock(&self.sessions).len()
    }

    /// Number of `get_user` calls served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn issue_token(&self, principal: &Principal, role: Option<AdminRole>) -> Result<String, IdentityError> {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: principal.id,
            email: Some(principal.email.clone()),
            exp: now + 3600,
            iat: now,
            role: Some("authenticated".to_string()),
            user_metadata: role.map(|r| RoleMetadata {
                role: Some(r.to_string()),
            }),
            app_metadata: None,
        };
        let key = EncodingKey::from_secret(self.jwt_secret.as_bytes());
        encode(&Header::default(), &claims, &key).map_err(|e| IdentityError::Unexpected {
            status: 500,
            body: e.to_string(),
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl IdentityService for MockIdentityService {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignIn, IdentityError> {
        let user = lock(&self.users)
            .get(email)
            .filter(|u| u.password == password)
            .cloned()
            .ok_or(IdentityError::Rejected)?;

        let principal = Principal {
            id: user.id,
            email: email.to_string(),
        };
        let access_token = self.issue_token(&principal, user.role_claim)?;
        lock(&self.sessions).insert(access_token.clone(), principal.clone());

        Ok(SignIn {
            principal,
            session: Session {
                access_token,
                refresh_token: Uuid::new_v4().simple().to_string(),
                token_type: "bearer".to_string(),
                expires_in: 3600,
                expires_at: None,
            },
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        if self.fail_sign_out {
            return Err(IdentityError::Unexpected {
                status: 503,
                body: "Mock Identity Error: Simulation requested".to_string(),
            });
        }
        lock(&self.sessions).remove(access_token);
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<Principal, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        lock(&self.sessions)
            .get(access_token)
            .cloned()
            .ok_or(IdentityError::Rejected)
    }
}
