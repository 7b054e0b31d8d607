//! Administrative reads and bulk writes.
//!
//! Whether a caller may use these operations is decided by the backend's
//! row-level security policies; this layer only shapes the queries.

use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::instrument;

use taskline_backend::{Backend, BackendError, Order, QueryBuilder};
use taskline_core::{AuditLog, Page, PageRequest, SystemStats, Task, TaskId, User, UserId};

use crate::errors::DataError;

/// Trailing window for the "recent activity" figure in [`SystemStats`].
const RECENT_ACTIVITY_DAYS: i64 = 7;

/// Per-user activity summary over a trailing window.
#[derive(Clone, Debug, PartialEq)]
pub struct UserActivity {
    /// The user summarized.
    pub user_id: UserId,
    /// Window length in days.
    pub window_days: u32,
    /// Audit events recorded for the user in the window.
    pub total_events: u64,
    /// Tasks the user created in the window.
    pub tasks_created: u64,
    /// Audit events in the window, grouped by action.
    pub actions: BTreeMap<String, u64>,
}

#[derive(Deserialize)]
struct StatusRow {
    status: String,
}

#[derive(Deserialize)]
struct PriorityRow {
    priority: String,
}

#[derive(Deserialize)]
struct ActionRow {
    action: String,
}

/// Administrative operations over a shared [`Backend`] handle.
#[derive(Clone)]
pub struct AdminApi {
    backend: Backend,
}

impl AdminApi {
    /// Wrap a backend handle.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Snapshot system-wide counts.
    ///
    /// Six independent queries run concurrently; any failure aborts the
    /// whole snapshot as a single [`DataError::Stats`]. Status and priority
    /// breakdowns are frequency maps over every non-deleted task, so their
    /// values each sum to `total_tasks`.
    #[instrument(skip_all)]
    pub async fn system_stats(&self) -> Result<SystemStats, DataError> {
        let since = (Utc::now() - Duration::days(RECENT_ACTIVITY_DAYS)).to_rfc3339();

        let (total_users, active_users, total_tasks, statuses, priorities, recent_activity) =
            tokio::try_join!(
                exact_count(self.backend.from("profiles")),
                exact_count(self.backend.from("profiles").eq("is_active", true)),
                exact_count(self.backend.from("tasks").eq("is_deleted", false)),
                fetch_all::<StatusRow>(
                    self.backend
                        .from("tasks")
                        .select("status")
                        .eq("is_deleted", false),
                ),
                fetch_all::<PriorityRow>(
                    self.backend
                        .from("tasks")
                        .select("priority")
                        .eq("is_deleted", false),
                ),
                exact_count(self.backend.from("audit_logs").gte("timestamp", &since)),
            )
            .map_err(|err| DataError::Stats(err.to_string()))?;

        Ok(SystemStats {
            total_users,
            active_users,
            total_tasks,
            tasks_by_status: frequency(statuses.into_iter().map(|r| r.status)),
            tasks_by_priority: frequency(priorities.into_iter().map(|r| r.priority)),
            recent_activity,
        })
    }

    /// Paginated audit trail, newest first, optionally narrowed to one user
    /// and/or a case-insensitive action substring.
    #[instrument(skip_all, fields(page = request.page()))]
    pub async fn audit_logs(
        &self,
        request: PageRequest,
        user_id: Option<&UserId>,
        action: Option<&str>,
    ) -> Result<Page<AuditLog>, DataError> {
        let mut query = self
            .backend
            .from("audit_logs")
            .count_exact()
            .order("timestamp", Order::Descending)
            .range(request.from(), request.to());
        if let Some(user_id) = user_id {
            query = query.eq("user_id", user_id);
        }
        if let Some(action) = action {
            query = query.ilike("action", action);
        }

        let result = query.fetch::<AuditLog>().await?;
        let total = result.total.unwrap_or(result.rows.len() as u64);
        Ok(Page::new(result.rows, total, request))
    }

    /// Paginated profile listing, newest account first.
    ///
    /// Rows on this path come from the `profiles` table alone, with no auth
    /// join, so `email` deserializes to the empty string.
    #[instrument(skip_all, fields(page = request.page()))]
    pub async fn users(&self, request: PageRequest) -> Result<Page<User>, DataError> {
        let result = self
            .backend
            .from("profiles")
            .select("id,username,role,is_active,created_at,updated_at")
            .count_exact()
            .order("created_at", Order::Descending)
            .range(request.from(), request.to())
            .fetch::<User>()
            .await?;
        let total = result.total.unwrap_or(result.rows.len() as u64);
        Ok(Page::new(result.rows, total, request))
    }

    /// Fetch one profile by id; `NotFound` when no such account exists.
    ///
    /// Same join caveat as [`users`](Self::users): `email` is empty here.
    pub async fn user(&self, id: &UserId) -> Result<User, DataError> {
        self.backend
            .from("profiles")
            .select("id,username,role,is_active,created_at,updated_at")
            .eq("id", id)
            .fetch_optional::<User>()
            .await?
            .ok_or_else(|| DataError::not_found("user"))
    }

    /// Assign every non-deleted task in `task_ids` to one user; returns the
    /// updated rows (ids that matched nothing are silently absent).
    #[instrument(skip_all, fields(count = task_ids.len(), assignee = %user_id))]
    pub async fn bulk_assign(
        &self,
        task_ids: &[TaskId],
        user_id: &UserId,
    ) -> Result<Vec<Task>, DataError> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }
        let result = self
            .backend
            .from("tasks")
            .in_list("id", task_ids)
            .eq("is_deleted", false)
            .update(&serde_json::json!({ "assigned_to": user_id }))
            .fetch::<Task>()
            .await?;
        Ok(result.rows)
    }

    /// Summarize one user's activity over the trailing `days`.
    #[instrument(skip_all, fields(user_id = %user_id, days))]
    pub async fn user_activity(
        &self,
        user_id: &UserId,
        days: u32,
    ) -> Result<UserActivity, DataError> {
        let since = (Utc::now() - Duration::days(i64::from(days))).to_rfc3339();

        let (events, tasks_created) = tokio::try_join!(
            fetch_all::<ActionRow>(
                self.backend
                    .from("audit_logs")
                    .select("action")
                    .eq("user_id", user_id)
                    .gte("timestamp", &since),
            ),
            exact_count(
                self.backend
                    .from("tasks")
                    .eq("created_by", user_id)
                    .eq("is_deleted", false)
                    .gte("created_at", &since),
            ),
        )?;

        Ok(UserActivity {
            user_id: user_id.clone(),
            window_days: days,
            total_events: events.len() as u64,
            tasks_created,
            actions: frequency(events.into_iter().map(|r| r.action)),
        })
    }
}

/// Run a count-only query: one-row window, exact count from the response.
async fn exact_count(query: QueryBuilder) -> Result<u64, BackendError> {
    let result = query
        .select("id")
        .count_exact()
        .range(0, 0)
        .fetch::<serde_json::Value>()
        .await?;
    Ok(result.total.unwrap_or(result.rows.len() as u64))
}

async fn fetch_all<T: serde::de::DeserializeOwned>(
    query: QueryBuilder,
) -> Result<Vec<T>, BackendError> {
    Ok(query.fetch::<T>().await?.rows)
}

fn frequency(values: impl Iterator<Item = String>) -> BTreeMap<String, u64> {
    let mut map = BTreeMap::new();
    for value in values {
        *map.entry(value).or_insert(0) += 1;
    }
    map
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
