//! Backend connection configuration.
//!
//! Connection settings are an explicit struct owned by the embedding
//! application; this layer reads no environment variables.

/// Connection settings for the hosted backend.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Project base URL, e.g. `https://abc.example.co` (no trailing slash).
    pub base_url: String,
    /// Public anonymous API key, sent as the `apikey` header and used as
    /// the bearer token when no session is held.
    pub anon_key: String,
}

impl BackendConfig {
    /// Build a config, trimming any trailing slash from the base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            let _ = base_url.pop();
        }
        Self {
            base_url,
            anon_key: anon_key.into(),
        }
    }

    /// Root of the auth subsystem.
    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/auth/v1", self.base_url)
    }

    /// Root of the query API.
    #[must_use]
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.base_url)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
