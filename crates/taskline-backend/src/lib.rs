//! HTTP client for the hosted backend.
//!
//! One [`Backend`] handle wraps a shared connection pool and exposes the two
//! backend surfaces: the authentication service ([`Backend::auth`]) and the
//! per-table query API ([`Backend::from`]). Query requests automatically carry
//! the held session's bearer token so row-level security applies server-side.

#![deny(unsafe_code)]

use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod errors;
pub mod query;

pub use auth::{AuthChange, AuthClient, AuthUser, Session, UserAttributes};
pub use config::BackendConfig;
pub use errors::BackendError;
pub use query::{Order, QueryBuilder, Rows};

/// Entry point to the backend. Cheap to clone; clones share the connection
/// pool and the cached session.
#[derive(Clone)]
pub struct Backend {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
    auth: AuthClient,
}

impl Backend {
    /// Build a handle for the given project configuration.
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        let config = Arc::new(config);
        let http = reqwest::Client::new();
        let auth = AuthClient::new(Arc::clone(&config), http.clone());
        Self { http, config, auth }
    }

    /// The authentication service.
    #[must_use]
    pub fn auth(&self) -> &AuthClient {
        &self.auth
    }

    /// Start a query against `table`.
    #[must_use]
    pub fn from(&self, table: &str) -> QueryBuilder {
        QueryBuilder::new(
            self.http.clone(),
            Arc::clone(&self.config),
            self.auth.clone(),
            table,
        )
    }
}
