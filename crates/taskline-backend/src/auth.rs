//! Auth subsystem client.
//!
//! Password-based sign-in/sign-up, session refresh, user updates, and
//! sign-out against the backend's auth API, plus a broadcast stream of
//! auth-change events for anything that needs to track session state.
//!
//! The client caches the current [`Session`] locally; every mutation of the
//! cache is mirrored as an [`AuthChange`] event. Event kinds:
//!
//! - [`AuthChange::SignedIn`] — after a successful credential exchange or
//!   sign-up
//! - [`AuthChange::SignedOut`] — after sign-out (local cache is cleared
//!   even when the remote call fails)
//! - [`AuthChange::TokenRefreshed`] — after a refresh-token grant; identity
//!   does not change

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};
use tracing::{debug, instrument, warn};

use taskline_core::UserId;

use crate::config::BackendConfig;
use crate::errors::{BackendError, parse_error_message};

/// Broadcast channel capacity for auth-change events.
const EVENT_CAPACITY: usize = 16;

/// The auth subsystem's view of a user: identity and credentials metadata,
/// no application profile fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Identity id, shared with the profile row.
    pub id: UserId,
    /// Verified email address.
    #[serde(default)]
    pub email: String,
    /// Free-form metadata supplied at sign-up (carries `username`).
    #[serde(default)]
    pub user_metadata: Value,
}

impl AuthUser {
    /// The `username` stored in sign-up metadata, if present.
    #[must_use]
    pub fn metadata_username(&self) -> Option<&str> {
        self.user_metadata["username"].as_str()
    }
}

/// A server-tracked authenticated context, identified by a token pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Bearer token for authenticated requests.
    pub access_token: String,
    /// Token used to obtain a fresh access token.
    pub refresh_token: String,
    /// Access token lifetime in seconds, as reported by the backend.
    #[serde(default)]
    pub expires_in: i64,
    /// The authenticated identity.
    pub user: AuthUser,
}

/// Auth state change notification.
#[derive(Clone, Debug, PartialEq)]
pub enum AuthChange {
    /// A session was established.
    SignedIn(Session),
    /// The session ended.
    SignedOut,
    /// The token pair was rotated; identity is unchanged.
    TokenRefreshed(Session),
}

/// Partial update of the auth identity. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize)]
pub struct UserAttributes {
    /// New email; the backend may require re-verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Metadata patch, merged server-side.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Client for the backend's auth subsystem.
///
/// Cheap to clone; clones share the session cache and event channel.
#[derive(Clone)]
pub struct AuthClient {
    config: Arc<BackendConfig>,
    http: reqwest::Client,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthChange>,
}

impl AuthClient {
    /// Create a client over a shared HTTP client.
    #[must_use]
    pub fn new(config: Arc<BackendConfig>, http: reqwest::Client) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            config,
            http,
            session: Arc::new(RwLock::new(None)),
            events,
        }
    }

    /// Subscribe to auth-change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.events.subscribe()
    }

    /// The cached session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// The cached access token, if a session is held.
    pub async fn access_token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    /// Seed the session cache from a persisted token pair.
    ///
    /// Emits no event; callers restoring state at startup verify the
    /// session explicitly via [`current_user`](Self::current_user).
    pub async fn restore_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    /// Exchange email + password for a session.
    #[instrument(skip_all, fields(grant = "password"))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let url = format!("{}/token?grant_type=password", self.config.auth_url());
        let body = serde_json::json!({ "email": email, "password": password });

        let session: Session = self.post_json(&url, &body, None).await?;
        debug!(user_id = %session.user.id, "signed in");

        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    /// Create an auth identity. `metadata` is stored on the identity and
    /// carries application fields such as `username`.
    #[instrument(skip_all)]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<Session, BackendError> {
        let url = format!("{}/signup", self.config.auth_url());
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "data": metadata,
        });

        let session: Session = self.post_json(&url, &body, None).await?;
        debug!(user_id = %session.user.id, "signed up");

        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::SignedIn(session.clone()));
        Ok(session)
    }

    /// Fetch the authenticated identity from the backend, verifying the
    /// cached access token. Fails with [`BackendError::NoSession`] when no
    /// session is held.
    #[instrument(skip_all)]
    pub async fn current_user(&self) -> Result<AuthUser, BackendError> {
        let token = self.access_token().await.ok_or(BackendError::NoSession)?;
        let url = format!("{}/user", self.config.auth_url());

        let resp = self
            .http
            .get(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&token)
            .send()
            .await?;
        Self::check::<AuthUser>(resp).await
    }

    /// Apply a partial update to the auth identity.
    ///
    /// The cached session's user is updated on success so later reads see
    /// the new identity fields.
    #[instrument(skip_all)]
    pub async fn update_user(&self, attrs: &UserAttributes) -> Result<AuthUser, BackendError> {
        let token = self.access_token().await.ok_or(BackendError::NoSession)?;
        let url = format!("{}/user", self.config.auth_url());

        let resp = self
            .http
            .put(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&token)
            .json(attrs)
            .send()
            .await?;
        let user = Self::check::<AuthUser>(resp).await?;

        if let Some(session) = self.session.write().await.as_mut() {
            session.user = user.clone();
        }
        Ok(user)
    }

    /// Rotate the token pair using the cached refresh token.
    #[instrument(skip_all, fields(grant = "refresh_token"))]
    pub async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .session
            .read()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(BackendError::NoSession)?;

        let url = format!("{}/token?grant_type=refresh_token", self.config.auth_url());
        let body = serde_json::json!({ "refresh_token": refresh_token });

        let session: Session = self.post_json(&url, &body, None).await?;
        debug!(user_id = %session.user.id, "session refreshed");

        *self.session.write().await = Some(session.clone());
        self.emit(AuthChange::TokenRefreshed(session.clone()));
        Ok(session)
    }

    /// Terminate the remote session.
    ///
    /// The local cache is cleared and `SignedOut` is emitted even when the
    /// remote call fails; a session must never outlive the caller's intent
    /// to end it. The remote error, if any, is still returned.
    #[instrument(skip_all)]
    pub async fn sign_out(&self) -> Result<(), BackendError> {
        let token = self.session.write().await.take().map(|s| s.access_token);
        self.emit(AuthChange::SignedOut);

        let Some(token) = token else {
            return Ok(());
        };

        let url = format!("{}/logout", self.config.auth_url());
        let resp = self
            .http
            .post(&url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = parse_error_message(&body, status.as_u16());
            warn!(status = status.as_u16(), "remote sign-out failed");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// POST a JSON body and decode a JSON response, with optional bearer
    /// override (defaults to the anon key for credential grants).
    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<T, BackendError> {
        let resp = self
            .http
            .post(url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer.unwrap_or(&self.config.anon_key))
            .json(body)
            .send()
            .await?;
        Self::check::<T>(resp).await
    }

    /// Convert a response into `T`, or into an API error carrying the
    /// backend's message verbatim.
    async fn check<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: parse_error_message(&body, status.as_u16()),
            });
        }
        Ok(resp.json::<T>().await?)
    }

    fn emit(&self, change: AuthChange) {
        // No receivers is fine; events are best-effort fan-out.
        let _ = self.events.send(change);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
