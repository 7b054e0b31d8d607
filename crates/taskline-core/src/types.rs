//! Entity types shared across the SDK.
//!
//! These mirror the backend's wire shapes: `profiles`, `tasks`, and
//! `audit_logs` rows, plus the client-side `SystemStats` aggregate. All
//! timestamps are UTC and serialize as RFC 3339.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AuditLogId, TaskId, UserId};

/// Application role stored on the profile row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular user.
    User,
    /// Administrator with access to reporting and bulk operations.
    Admin,
}

impl UserRole {
    /// Wire representation of the role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user as seen by this layer: the profile row joined with the auth
/// identity's email.
///
/// `email` is sourced from the auth subsystem, not the profile row. Paths
/// that cannot reach the auth subsystem (the admin profile listing) leave
/// it empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Shared identifier of the auth identity and the profile row.
    pub id: UserId,
    /// Email from the auth identity; empty when unavailable.
    #[serde(default)]
    pub email: String,
    /// Display name, unique per user.
    pub username: String,
    /// Application role.
    pub role: UserRole,
    /// Whether the account is active.
    pub is_active: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last row update time.
    pub updated_at: DateTime<Utc>,
}

/// Task workflow status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started.
    Todo,
    /// Being worked on.
    InProgress,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Wire representation of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    /// All statuses, in workflow order.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::Todo, Self::InProgress, Self::Done]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Can wait.
    Low,
    /// Default.
    Medium,
    /// Should be picked up soon.
    High,
    /// Drop everything.
    Urgent,
}

impl TaskPriority {
    /// Wire representation of the priority.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// All priorities, lowest first.
    #[must_use]
    pub fn all() -> [Self; 4] {
        [Self::Low, Self::Medium, Self::High, Self::Urgent]
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task row.
///
/// `is_deleted` is the soft-delete flag: once true the row is permanently
/// excluded from listings and lookups through this layer, though it still
/// exists in the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Row identifier.
    pub id: TaskId,
    /// Short title (1..=200 chars).
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Optional deadline.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Assignee, if any.
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    /// Creator; stamped by the data layer from the active session.
    pub created_by: UserId,
    /// Soft-delete flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last row update time.
    pub updated_at: DateTime<Utc>,
}

/// An audit log entry (read-only from this layer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    /// Row identifier.
    pub id: AuditLogId,
    /// Acting user.
    pub user_id: UserId,
    /// Related task, if the action touched one.
    #[serde(default)]
    pub task_id: Option<TaskId>,
    /// Action label, e.g. `TASK_UPDATED`.
    pub action: String,
    /// Field values before the action.
    #[serde(default)]
    pub old_values: Option<serde_json::Value>,
    /// Field values after the action.
    #[serde(default)]
    pub new_values: Option<serde_json::Value>,
    /// When the action happened.
    pub timestamp: DateTime<Utc>,
}

/// Point-in-time system aggregate assembled client-side from six count
/// queries.
///
/// Invariant: the values of `tasks_by_status` and of `tasks_by_priority`
/// each sum to `total_tasks` (soft-deleted tasks are excluded everywhere).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    /// All profile rows.
    pub total_users: u64,
    /// Profile rows with `is_active = true`.
    pub active_users: u64,
    /// Non-deleted tasks.
    pub total_tasks: u64,
    /// Non-deleted task count per observed status value.
    pub tasks_by_status: BTreeMap<String, u64>,
    /// Non-deleted task count per observed priority value.
    pub tasks_by_priority: BTreeMap<String, u64>,
    /// Audit events in the trailing 7 days.
    pub recent_activity: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
