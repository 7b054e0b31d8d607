//! Request parameter structs.
//!
//! Partial updates are explicit structs with optional fields, validated
//! client-side before dispatch. Length limits match the backend's schema
//! constraints: title 1..=200, username 3..=50, password 8..=100.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::ids::UserId;
use crate::types::{TaskPriority, TaskStatus};

/// Maximum task title length.
const TITLE_MAX: usize = 200;
/// Username length bounds.
const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 50;
/// Password length bounds.
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 100;

fn validate_email(email: &str) -> Result<(), ValidationError> {
    // Shape check only; the auth subsystem owns real validation.
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::new("email", "missing '@'"));
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::new("email", "malformed address"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.len() < PASSWORD_MIN {
        return Err(ValidationError::new(
            "password",
            format!("must be at least {PASSWORD_MIN} characters"),
        ));
    }
    if password.len() > PASSWORD_MAX {
        return Err(ValidationError::new(
            "password",
            format!("must be at most {PASSWORD_MAX} characters"),
        ));
    }
    Ok(())
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ValidationError::new(
            "username",
            format!("must be {USERNAME_MIN}..={USERNAME_MAX} characters"),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.trim().is_empty() {
        return Err(ValidationError::new("title", "must not be empty"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(ValidationError::new(
            "title",
            format!("must be at most {TITLE_MAX} characters"),
        ));
    }
    Ok(())
}

/// Email + password credential pair for login.
#[derive(Clone, Debug)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password, forwarded to the auth subsystem.
    pub password: String,
}

impl Credentials {
    /// Validate shape before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        if self.password.is_empty() {
            return Err(ValidationError::new("password", "must not be empty"));
        }
        Ok(())
    }
}

/// Registration request: credentials plus the username stored as auth
/// metadata.
#[derive(Clone, Debug)]
pub struct Registration {
    /// Account email.
    pub email: String,
    /// Plain-text password.
    pub password: String,
    /// Display name (3..=50 chars).
    pub username: String,
}

impl Registration {
    /// Validate shape before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        validate_username(&self.username)
    }
}

/// Fields for creating a task.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewTask {
    /// Short title (1..=200 chars).
    pub title: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Initial status; the backend defaults to `todo` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Initial priority; the backend defaults to `medium` when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// Optional deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// Optional assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
}

impl NewTask {
    /// A task with just a title; everything else backend-defaulted.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: None,
            priority: None,
            due_date: None,
            assigned_to: None,
        }
    }

    /// Validate shape before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_title(&self.title)
    }
}

/// Partial task update. `None` fields are left untouched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// New deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    /// New assignee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
}

impl TaskPatch {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.assigned_to.is_none()
    }

    /// Validate shape before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            validate_title(title)?;
        }
        Ok(())
    }
}

/// Partial profile update. An email change is routed to the auth identity
/// before the profile row is touched.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    /// New email (auth identity field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// New username (profile field).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl ProfilePatch {
    /// True when no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.username.is_none()
    }

    /// Validate shape before dispatch.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref email) = self.email {
            validate_email(email)?;
        }
        if let Some(ref username) = self.username {
            validate_username(username)?;
        }
        Ok(())
    }
}

/// Listing filters for tasks. All fields combine with AND; `search` matches
/// title OR description case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct TaskFilter {
    /// Exact status match.
    pub status: Option<TaskStatus>,
    /// Exact priority match.
    pub priority: Option<TaskPriority>,
    /// Exact assignee match.
    pub assigned_to: Option<UserId>,
    /// Exact creator match.
    pub created_by: Option<UserId>,
    /// Due date lower bound (inclusive).
    pub due_after: Option<DateTime<Utc>>,
    /// Due date upper bound (inclusive).
    pub due_before: Option<DateTime<Utc>>,
    /// Case-insensitive substring over title OR description.
    pub search: Option<String>,
}

impl TaskFilter {
    /// Filter on status only.
    #[must_use]
    pub fn by_status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_reject_bad_email() {
        let creds = Credentials {
            email: "nope".to_owned(),
            password: "secret".to_owned(),
        };
        let err = creds.validate().unwrap_err();
        assert_eq!(err.field, "email");
    }

    #[test]
    fn credentials_accept_plain_shape() {
        let creds = Credentials {
            email: "casey@example.com".to_owned(),
            password: "x".to_owned(),
        };
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn registration_enforces_password_length() {
        let reg = Registration {
            email: "casey@example.com".to_owned(),
            password: "short".to_owned(),
            username: "casey".to_owned(),
        };
        let err = reg.validate().unwrap_err();
        assert_eq!(err.field, "password");
    }

    #[test]
    fn registration_enforces_username_bounds() {
        let reg = Registration {
            email: "casey@example.com".to_owned(),
            password: "longenough".to_owned(),
            username: "ab".to_owned(),
        };
        let err = reg.validate().unwrap_err();
        assert_eq!(err.field, "username");
    }

    #[test]
    fn new_task_rejects_blank_title() {
        let err = NewTask::titled("   ").validate().unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn new_task_rejects_oversized_title() {
        let err = NewTask::titled("x".repeat(201)).validate().unwrap_err();
        assert_eq!(err.field, "title");
    }

    #[test]
    fn new_task_serializes_only_set_fields() {
        let json = serde_json::to_value(NewTask::titled("Ship it")).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Ship it"}));
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(TaskPatch::default().is_empty());
        assert!(ProfilePatch::default().is_empty());
    }

    #[test]
    fn patch_with_title_validates() {
        let patch = TaskPatch {
            title: Some(String::new()),
            ..TaskPatch::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn profile_patch_checks_both_fields() {
        let patch = ProfilePatch {
            email: Some("new@example.com".to_owned()),
            username: Some("ab".to_owned()),
        };
        let err = patch.validate().unwrap_err();
        assert_eq!(err.field, "username");
    }

    #[test]
    fn task_patch_serializes_only_set_fields() {
        let patch = TaskPatch {
            status: Some(TaskStatus::Done),
            ..TaskPatch::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"status": "done"}));
    }
}
