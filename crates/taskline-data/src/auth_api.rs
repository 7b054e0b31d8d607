//! Account operations: login, registration, profile access and updates.
//!
//! A profile is the application's row for an auth identity (table
//! `profiles`, keyed by the identity id). Every operation that returns a
//! [`User`] reads that row; the auth subsystem alone never carries
//! application fields such as `role`.

use tracing::{instrument, warn};

use taskline_backend::{Backend, Session, UserAttributes};
use taskline_core::{Credentials, ProfilePatch, Registration, User};

use crate::errors::DataError;

/// Account operations over a shared [`Backend`] handle.
#[derive(Clone)]
pub struct AuthApi {
    backend: Backend,
}

impl AuthApi {
    /// Wrap a backend handle.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Exchange credentials for a session and load the caller's profile.
    ///
    /// An identity without a profile row is unusable: the fresh session is
    /// torn down again and the call fails with
    /// [`DataError::ProfileMissing`].
    #[instrument(skip_all)]
    pub async fn login(&self, credentials: &Credentials) -> Result<User, DataError> {
        credentials.validate()?;
        let session = self
            .backend
            .auth()
            .sign_in_with_password(&credentials.email, &credentials.password)
            .await?;
        self.profile_or_sign_out(&session).await
    }

    /// Create an identity and its session; the username travels as identity
    /// metadata and the backend materializes the profile row from it.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: &Registration) -> Result<User, DataError> {
        registration.validate()?;
        let metadata = serde_json::json!({ "username": registration.username });
        let session = self
            .backend
            .auth()
            .sign_up(&registration.email, &registration.password, metadata)
            .await?;
        self.profile_or_sign_out(&session).await
    }

    /// The authenticated caller's profile.
    pub async fn profile(&self) -> Result<User, DataError> {
        let session = self
            .backend
            .auth()
            .current_session()
            .await
            .ok_or(DataError::NotAuthenticated)?;
        self.fetch_profile(&session)
            .await?
            .ok_or(DataError::ProfileMissing)
    }

    /// Apply a partial profile update and return the merged result.
    ///
    /// Email lives on the auth identity, username on the profile row. When
    /// the patch changes the email, the auth identity is updated first; if
    /// that fails the profile row is left untouched. Only the username is
    /// ever sent to the profiles table.
    #[instrument(skip_all)]
    pub async fn update_profile(&self, patch: &ProfilePatch) -> Result<User, DataError> {
        patch.validate()?;
        let session = self
            .backend
            .auth()
            .current_session()
            .await
            .ok_or(DataError::NotAuthenticated)?;
        if patch.is_empty() {
            return self.profile().await;
        }

        if let Some(email) = &patch.email {
            if *email != session.user.email {
                let attrs = UserAttributes {
                    email: Some(email.clone()),
                    ..UserAttributes::default()
                };
                let _ = self.backend.auth().update_user(&attrs).await?;
            }
        }

        let user = match &patch.username {
            Some(username) => self
                .backend
                .from("profiles")
                .eq("id", &session.user.id)
                .update(&serde_json::json!({ "username": username }))
                .fetch_optional::<User>()
                .await?
                .ok_or(DataError::ProfileMissing)?,
            None => return self.profile().await,
        };
        Ok(self.overlay_identity_email(user).await)
    }

    /// Change the caller's password, verifying the current one first.
    ///
    /// Verification is a fresh credential exchange for the session's own
    /// email, so a wrong current password surfaces as the backend's usual
    /// invalid-credentials rejection.
    #[instrument(skip_all)]
    pub async fn change_password(&self, current: &str, new: &str) -> Result<(), DataError> {
        let session = self
            .backend
            .auth()
            .current_session()
            .await
            .ok_or(DataError::NotAuthenticated)?;
        let _ = self
            .backend
            .auth()
            .sign_in_with_password(&session.user.email, current)
            .await?;

        let attrs = UserAttributes {
            password: Some(new.to_owned()),
            ..UserAttributes::default()
        };
        let _ = self.backend.auth().update_user(&attrs).await?;
        Ok(())
    }

    /// End the session, propagating any remote termination error.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> Result<(), DataError> {
        self.backend.auth().sign_out().await?;
        Ok(())
    }

    /// Fetch the session's profile row with the identity's email overlaid.
    ///
    /// The profiles table carries no authoritative email; whatever it
    /// deserializes to is replaced by the address the auth subsystem holds.
    async fn fetch_profile(&self, session: &Session) -> Result<Option<User>, DataError> {
        let user = self
            .backend
            .from("profiles")
            .eq("id", &session.user.id)
            .fetch_optional::<User>()
            .await?;
        Ok(user.map(|mut user| {
            user.email = session.user.email.clone();
            user
        }))
    }

    /// Replace `email` with the current identity's address, when a session
    /// is still held.
    async fn overlay_identity_email(&self, mut user: User) -> User {
        if let Some(session) = self.backend.auth().current_session().await {
            user.email = session.user.email;
        }
        user
    }

    async fn profile_or_sign_out(&self, session: &Session) -> Result<User, DataError> {
        match self.fetch_profile(session).await? {
            Some(user) => Ok(user),
            None => {
                warn!(user_id = %session.user.id, "identity has no profile, signing out");
                if let Err(err) = self.backend.auth().sign_out().await {
                    warn!(error = %err, "sign-out after missing profile failed");
                }
                Err(DataError::ProfileMissing)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use taskline_backend::BackendConfig;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json(user_id: &str, email: &str) -> serde_json::Value {
        serde_json::json!({
            "access_token": "at-1",
            "refresh_token": "rt-1",
            "expires_in": 3600,
            "user": {"id": user_id, "email": email, "user_metadata": {}}
        })
    }

    fn profile_json(user_id: &str, email: &str, role: &str) -> serde_json::Value {
        serde_json::json!({
            "id": user_id,
            "email": email,
            "username": "casey",
            "role": role,
            "is_active": true,
            "created_at": "2026-08-01T00:00:00Z",
            "updated_at": "2026-08-01T00:00:00Z",
        })
    }

    fn api_for(server: &MockServer) -> AuthApi {
        AuthApi::new(Backend::new(BackendConfig::new(server.uri(), "anon")))
    }

    #[tokio::test]
    async fn login_returns_the_profile_row() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000001";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "c@x.co")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{uid}")))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([profile_json(uid, "c@x.co", "admin")])),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let user = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap();
        assert_eq!(user.role, taskline_core::UserRole::Admin);
        assert_eq!(user.username, "casey");
    }

    #[tokio::test]
    async fn login_without_profile_signs_back_out() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000002";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "o@x.co")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api
            .login(&Credentials {
                email: "o@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::ProfileMissing));
    }

    #[tokio::test]
    async fn empty_password_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let err = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: String::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Validation(_)));
    }

    #[tokio::test]
    async fn email_change_failure_leaves_profile_untouched() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000003";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "c@x.co")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([profile_json(uid, "c@x.co", "user")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "msg": "email address already registered"
            })))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let _ = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap();

        let err = api
            .update_profile(&ProfilePatch {
                email: Some("taken@x.co".into()),
                username: None,
            })
            .await
            .unwrap_err();
        match err {
            DataError::Backend(taskline_backend::BackendError::Api { message, .. }) => {
                assert_eq!(message, "email address already registered");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn username_only_patch_skips_the_auth_subsystem() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000004";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "c@x.co")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([profile_json(uid, "c@x.co", "user")])),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .and(query_param("id", format!("eq.{uid}")))
            .and(body_json(serde_json::json!({"username": "casey2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": uid,
                "email": "c@x.co",
                "username": "casey2",
                "role": "user",
                "is_active": true,
                "created_at": "2026-08-01T00:00:00Z",
                "updated_at": "2026-08-02T00:00:00Z",
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let _ = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap();

        let user = api
            .update_profile(&ProfilePatch {
                email: None,
                username: Some("casey2".into()),
            })
            .await
            .unwrap();
        assert_eq!(user.username, "casey2");
    }

    #[tokio::test]
    async fn login_overlays_the_identity_email() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000005";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "c@x.co")))
            .mount(&server)
            .await;
        // A profiles row with no email column at all.
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": uid,
                "username": "casey",
                "role": "user",
                "is_active": true,
                "created_at": "2026-08-01T00:00:00Z",
                "updated_at": "2026-08-01T00:00:00Z",
            }])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let user = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap();
        assert_eq!(user.email, "c@x.co");

        let fetched = api.profile().await.unwrap();
        assert_eq!(fetched.email, "c@x.co");
    }

    #[tokio::test]
    async fn email_only_patch_never_touches_the_profiles_table() {
        let server = MockServer::start().await;
        let uid = "7f0c43a2-1111-4a7b-9c7d-000000000006";
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(uid, "c@x.co")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": uid,
                "username": "casey",
                "role": "user",
                "is_active": true,
                "created_at": "2026-08-01T00:00:00Z",
                "updated_at": "2026-08-01T00:00:00Z",
            }])))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/auth/v1/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": uid,
                "email": "fresh@x.co",
                "user_metadata": {}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/profiles"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let _ = api
            .login(&Credentials {
                email: "c@x.co".into(),
                password: "hunter2-long".into(),
            })
            .await
            .unwrap();

        let user = api
            .update_profile(&ProfilePatch {
                email: Some("fresh@x.co".into()),
                username: None,
            })
            .await
            .unwrap();
        assert_eq!(user.email, "fresh@x.co");
        assert_eq!(user.username, "casey");
    }

    #[tokio::test]
    async fn profile_without_session_is_not_authenticated() {
        let server = MockServer::start().await;
        let api = api_for(&server);
        let err = api.profile().await.unwrap_err();
        assert!(matches!(err, DataError::NotAuthenticated));
    }
}
