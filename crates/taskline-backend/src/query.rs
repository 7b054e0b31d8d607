//! Query API builder.
//!
//! Builds filtered, ordered, paginated requests against the backend's
//! PostgREST-style query API. Supported predicates: exact match (`eq`),
//! case-insensitive substring (`ilike`, singly or OR'd across two columns),
//! range bounds (`gte`/`lte`), and set membership (`in`). Pagination uses
//! `Range` headers; an exact pre-pagination count can be requested via
//! `Prefer: count=exact` and is read back from `Content-Range`.
//!
//! Row-level security is enforced server-side: requests carry the session's
//! bearer token when one is held, falling back to the anonymous key, and
//! authorization failures surface as ordinary API errors.

use std::fmt::Display;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::instrument;

use crate::auth::AuthClient;
use crate::config::BackendConfig;
use crate::errors::{BackendError, parse_error_message};

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl Order {
    fn suffix(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Result of a query: decoded rows plus the exact pre-pagination count when
/// one was requested.
#[derive(Clone, Debug)]
pub struct Rows<T> {
    /// Decoded rows in query order.
    pub rows: Vec<T>,
    /// Total matching rows before pagination; `None` unless
    /// [`QueryBuilder::count_exact`] was set and the backend reported one.
    pub total: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Verb {
    Select,
    Insert,
    Update,
}

/// Builder for one query against a single table.
///
/// Obtained from [`Backend::from`](crate::Backend::from); consumed by
/// [`fetch`](Self::fetch).
pub struct QueryBuilder {
    http: reqwest::Client,
    config: Arc<BackendConfig>,
    auth: AuthClient,
    table: String,
    columns: String,
    params: Vec<(String, String)>,
    order: Vec<String>,
    range: Option<(u64, u64)>,
    count_exact: bool,
    verb: Verb,
    // Serialization failures are held until fetch so the builder chain
    // stays infallible.
    body: Option<Result<Value, serde_json::Error>>,
}

impl QueryBuilder {
    pub(crate) fn new(
        http: reqwest::Client,
        config: Arc<BackendConfig>,
        auth: AuthClient,
        table: &str,
    ) -> Self {
        Self {
            http,
            config,
            auth,
            table: table.to_owned(),
            columns: "*".to_owned(),
            params: Vec::new(),
            order: Vec::new(),
            range: None,
            count_exact: false,
            verb: Verb::Select,
            body: None,
        }
    }

    /// Restrict the selected columns (defaults to `*`).
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.to_owned();
        self
    }

    /// Request the exact pre-pagination row count.
    #[must_use]
    pub fn count_exact(mut self) -> Self {
        self.count_exact = true;
        self
    }

    /// Exact-match filter.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_owned(), format!("eq.{value}")));
        self
    }

    /// Case-insensitive substring filter on one column.
    #[must_use]
    pub fn ilike(mut self, column: &str, needle: &str) -> Self {
        self.params
            .push((column.to_owned(), format!("ilike.*{needle}*")));
        self
    }

    /// Case-insensitive substring filter matching either of two columns.
    #[must_use]
    pub fn or_ilike(mut self, first: &str, second: &str, needle: &str) -> Self {
        self.params.push((
            "or".to_owned(),
            format!("({first}.ilike.*{needle}*,{second}.ilike.*{needle}*)"),
        ));
        self
    }

    /// Lower-bound filter (inclusive).
    #[must_use]
    pub fn gte(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_owned(), format!("gte.{value}")));
        self
    }

    /// Upper-bound filter (inclusive).
    #[must_use]
    pub fn lte(mut self, column: &str, value: impl Display) -> Self {
        self.params.push((column.to_owned(), format!("lte.{value}")));
        self
    }

    /// Set-membership filter. Values are quoted so identifiers containing
    /// reserved characters survive.
    #[must_use]
    pub fn in_list<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let joined = values
            .into_iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join(",");
        self.params
            .push((column.to_owned(), format!("in.({joined})")));
        self
    }

    /// Append a sort key. Multiple calls sort by the first key first.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Order) -> Self {
        self.order.push(format!("{column}.{}", direction.suffix()));
        self
    }

    /// Select a 0-based inclusive row window (`Range` header).
    #[must_use]
    pub fn range(mut self, from: u64, to: u64) -> Self {
        self.range = Some((from, to));
        self
    }

    /// Turn the query into an insert returning the created rows.
    #[must_use]
    pub fn insert(mut self, body: &impl Serialize) -> Self {
        self.verb = Verb::Insert;
        self.body = Some(serde_json::to_value(body));
        self
    }

    /// Turn the query into a partial update of all matching rows, returning
    /// the updated rows.
    #[must_use]
    pub fn update(mut self, patch: &impl Serialize) -> Self {
        self.verb = Verb::Update;
        self.body = Some(serde_json::to_value(patch));
        self
    }

    /// Execute the query and decode the rows.
    #[instrument(skip_all, fields(table = %self.table, verb = ?self.verb))]
    pub async fn fetch<T: serde::de::DeserializeOwned>(self) -> Result<Rows<T>, BackendError> {
        let url = format!("{}/{}", self.config.rest_url(), self.table);
        let token = self
            .auth
            .access_token()
            .await
            .unwrap_or_else(|| self.config.anon_key.clone());

        let mut params = self.params;
        params.push(("select".to_owned(), self.columns));
        if !self.order.is_empty() {
            params.push(("order".to_owned(), self.order.join(",")));
        }

        let mut req = match self.verb {
            Verb::Select => self.http.get(&url),
            Verb::Insert => self.http.post(&url),
            Verb::Update => self.http.patch(&url),
        };
        req = req
            .query(&params)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&token);

        let mut prefer = Vec::new();
        if self.count_exact {
            prefer.push("count=exact");
        }
        if self.verb != Verb::Select {
            prefer.push("return=representation");
        }
        if !prefer.is_empty() {
            req = req.header("Prefer", prefer.join(","));
        }

        if let Some((from, to)) = self.range {
            req = req
                .header("Range-Unit", "items")
                .header("Range", format!("{from}-{to}"));
        }

        if let Some(body) = self.body {
            req = req.json(&body?);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: parse_error_message(&body, status.as_u16()),
            });
        }

        let total = resp
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total);

        let rows = resp.json::<Vec<T>>().await?;
        Ok(Rows { rows, total })
    }

    /// Execute and return the first row, if any.
    pub async fn fetch_optional<T: serde::de::DeserializeOwned>(
        self,
    ) -> Result<Option<T>, BackendError> {
        let result = self.fetch::<T>().await?;
        Ok(result.rows.into_iter().next())
    }
}

/// Parse the total from a `Content-Range` header value like `0-9/25`.
///
/// Returns `None` for the unknown-count form `0-9/*`.
fn parse_content_range_total(value: &str) -> Option<u64> {
    let (_, total) = value.rsplit_once('/')?;
    total.parse().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
