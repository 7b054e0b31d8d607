//! Task CRUD over the backend query API.
//!
//! Deletion is always soft: rows gain `is_deleted = true` and every read
//! path filters them out. Authorization is not re-checked here; the
//! backend's row-level security decides what each session may touch.

use tracing::instrument;

use taskline_backend::{Backend, Order};
use taskline_core::{
    AuditLog, NewTask, Page, PageRequest, Task, TaskFilter, TaskId, TaskPatch, UserId,
};

use crate::errors::DataError;

/// Task operations over a shared [`Backend`] handle.
#[derive(Clone)]
pub struct TaskApi {
    backend: Backend,
}

impl TaskApi {
    /// Wrap a backend handle.
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// List non-deleted tasks, newest first, with the pre-pagination total.
    ///
    /// `filter.search` matches the title or the description,
    /// case-insensitively.
    #[instrument(skip_all, fields(page = request.page(), size = request.size()))]
    pub async fn list(
        &self,
        request: PageRequest,
        filter: &TaskFilter,
    ) -> Result<Page<Task>, DataError> {
        let mut query = self
            .backend
            .from("tasks")
            .count_exact()
            .eq("is_deleted", false)
            .order("created_at", Order::Descending)
            .range(request.from(), request.to());

        if let Some(status) = filter.status {
            query = query.eq("status", status.as_str());
        }
        if let Some(priority) = filter.priority {
            query = query.eq("priority", priority.as_str());
        }
        if let Some(assigned_to) = &filter.assigned_to {
            query = query.eq("assigned_to", assigned_to);
        }
        if let Some(created_by) = &filter.created_by {
            query = query.eq("created_by", created_by);
        }
        if let Some(after) = filter.due_after {
            query = query.gte("due_date", after.to_rfc3339());
        }
        if let Some(before) = filter.due_before {
            query = query.lte("due_date", before.to_rfc3339());
        }
        if let Some(needle) = &filter.search {
            query = query.or_ilike("title", "description", needle);
        }

        let result = query.fetch::<Task>().await?;
        let total = result.total.unwrap_or(result.rows.len() as u64);
        Ok(Page::new(result.rows, total, request))
    }

    /// Fetch one task; soft-deleted rows are treated as absent.
    pub async fn get(&self, id: &TaskId) -> Result<Task, DataError> {
        self.backend
            .from("tasks")
            .eq("id", id)
            .eq("is_deleted", false)
            .fetch_optional::<Task>()
            .await?
            .ok_or_else(|| DataError::not_found("task"))
    }

    /// Create a task stamped with the caller as `created_by`.
    #[instrument(skip_all)]
    pub async fn create(&self, task: &NewTask) -> Result<Task, DataError> {
        task.validate()?;
        let session = self
            .backend
            .auth()
            .current_session()
            .await
            .ok_or(DataError::NotAuthenticated)?;

        let mut body = serde_json::to_value(task).map_err(taskline_backend::BackendError::from)?;
        body["created_by"] = serde_json::to_value(&session.user.id)
            .map_err(taskline_backend::BackendError::from)?;

        self.backend
            .from("tasks")
            .insert(&body)
            .fetch_optional::<Task>()
            .await?
            .ok_or_else(|| DataError::not_found("task"))
    }

    /// Apply a partial update and return the updated row.
    ///
    /// An empty patch is a read: the current row comes back unchanged.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn update(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, DataError> {
        patch.validate()?;
        if patch.is_empty() {
            return self.get(id).await;
        }

        self.backend
            .from("tasks")
            .eq("id", id)
            .eq("is_deleted", false)
            .update(patch)
            .fetch_optional::<Task>()
            .await?
            .ok_or_else(|| DataError::not_found("task"))
    }

    /// Soft-delete a task. The row survives for the audit trail.
    #[instrument(skip_all, fields(task_id = %id))]
    pub async fn delete(&self, id: &TaskId) -> Result<(), DataError> {
        let _ = self
            .backend
            .from("tasks")
            .eq("id", id)
            .eq("is_deleted", false)
            .update(&serde_json::json!({ "is_deleted": true }))
            .fetch_optional::<Task>()
            .await?
            .ok_or_else(|| DataError::not_found("task"))?;
        Ok(())
    }

    /// Reassign one task and return the updated row.
    #[instrument(skip_all, fields(task_id = %id, assignee = %user_id))]
    pub async fn assign(&self, id: &TaskId, user_id: &UserId) -> Result<Task, DataError> {
        self.backend
            .from("tasks")
            .eq("id", id)
            .eq("is_deleted", false)
            .update(&serde_json::json!({ "assigned_to": user_id }))
            .fetch_optional::<Task>()
            .await?
            .ok_or_else(|| DataError::not_found("task"))
    }

    /// The audit trail for one task, oldest entry first.
    pub async fn history(&self, id: &TaskId) -> Result<Vec<AuditLog>, DataError> {
        let result = self
            .backend
            .from("audit_logs")
            .eq("task_id", id)
            .order("timestamp", Order::Ascending)
            .fetch::<AuditLog>()
            .await?;
        Ok(result.rows)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use taskline_backend::BackendConfig;
    use taskline_core::{TaskPriority, TaskStatus};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const UID: &str = "7f0c43a2-2222-4a7b-9c7d-000000000001";
    const TID: &str = "b9a1d7e0-2222-4a7b-9c7d-000000000009";

    fn task_json(id: &str, title: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "title": title,
            "description": null,
            "status": "todo",
            "priority": "medium",
            "due_date": null,
            "assigned_to": null,
            "created_by": UID,
            "is_deleted": false,
            "created_at": "2026-08-10T00:00:00Z",
            "updated_at": "2026-08-10T00:00:00Z",
        })
    }

    fn api_for(server: &MockServer) -> TaskApi {
        TaskApi::new(Backend::new(BackendConfig::new(server.uri(), "anon")))
    }

    async fn sign_in(server: &MockServer, api: &TaskApi) {
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "refresh_token": "rt-1",
                "expires_in": 3600,
                "user": {"id": UID, "email": "c@x.co", "user_metadata": {}}
            })))
            .mount(server)
            .await;
        let _ = api
            .backend
            .auth()
            .sign_in_with_password("c@x.co", "hunter2-long")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn list_builds_filters_and_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("is_deleted", "eq.false"))
            .and(query_param("status", "eq.in_progress"))
            .and(query_param("priority", "eq.urgent"))
            .and(query_param(
                "or",
                "(title.ilike.*deploy*,description.ilike.*deploy*)",
            ))
            .and(query_param("order", "created_at.desc"))
            .and(header("range", "20-29"))
            .and(header("prefer", "count=exact"))
            .respond_with(
                ResponseTemplate::new(206)
                    .insert_header("content-range", "20-20/21")
                    .set_body_json(serde_json::json!([task_json(TID, "Deploy it")])),
            )
            .mount(&server)
            .await;

        let api = api_for(&server);
        let filter = TaskFilter {
            status: Some(TaskStatus::InProgress),
            priority: Some(TaskPriority::Urgent),
            search: Some("deploy".into()),
            ..TaskFilter::default()
        };
        let page = api.list(PageRequest::new(3, 10), &filter).await.unwrap();
        assert_eq!(page.total, 21);
        assert_eq!(page.page, 3);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn get_missing_task_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let id = TaskId::from(TID);
        let err = api.get(&id).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound { entity: "task" }));
    }

    #[tokio::test]
    async fn create_stamps_the_caller() {
        let server = MockServer::start().await;
        let api = api_for(&server);
        sign_in(&server, &api).await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/tasks"))
            .and(body_json(serde_json::json!({
                "title": "Write brief",
                "created_by": UID,
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!([task_json(TID, "Write brief")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let created = api.create(&NewTask::titled("Write brief")).await.unwrap();
        assert_eq!(created.title, "Write brief");
    }

    #[tokio::test]
    async fn create_without_session_is_rejected_locally() {
        let server = MockServer::start().await;
        let api = api_for(&server);
        let err = api.create(&NewTask::titled("x")).await.unwrap_err();
        assert!(matches!(err, DataError::NotAuthenticated));
    }

    #[tokio::test]
    async fn delete_is_a_soft_delete_patch() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/tasks"))
            .and(query_param("id", format!("eq.{TID}")))
            .and(query_param("is_deleted", "eq.false"))
            .and(body_json(serde_json::json!({"is_deleted": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([task_json(TID, "Old task")])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let api = api_for(&server);
        let id = TaskId::from(TID);
        api.delete(&id).await.unwrap();
    }

    #[tokio::test]
    async fn delete_of_already_deleted_task_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let id = TaskId::from(TID);
        let err = api.delete(&id).await.unwrap_err();
        assert!(matches!(err, DataError::NotFound { .. }));
    }

    #[tokio::test]
    async fn history_is_oldest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/audit_logs"))
            .and(query_param("task_id", format!("eq.{TID}")))
            .and(query_param("order", "timestamp.asc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "id": "0a0a0a0a-3333-4a7b-9c7d-000000000001",
                "user_id": UID,
                "task_id": TID,
                "action": "task_created",
                "old_values": null,
                "new_values": {"title": "Deploy it"},
                "timestamp": "2026-08-10T00:00:00Z",
            }])))
            .mount(&server)
            .await;

        let api = api_for(&server);
        let id = TaskId::from(TID);
        let trail = api.history(&id).await.unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "task_created");
    }
}
