//! Typed access to the remote task service.
//!
//! Every failure (unreachable host, non-success status, undecodable body) comes
//! back as a [`RequestError`]. Nothing is retried and no timeout is applied.

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::schedule::Schedule;
use crate::task::{Task, TaskDraft, TaskId};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid service URL: {0}")]
    Url(String),
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("service answered {0}")]
    Status(StatusCode),
    #[error("malformed response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct TaskApi {
    client: Client,
    base: Url,
}

impl TaskApi {
    pub fn new(base_url: &str) -> Result<Self, RequestError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, RequestError> {
        // A trailing slash keeps `join` from dropping the last path segment.
        let normalized = format!("{}/", base_url.trim_end_matches('/'));
        let base = Url::parse(&normalized).map_err(|e| RequestError::Url(e.to_string()))?;
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url, RequestError> {
        self.base
            .join(path)
            .map_err(|e| RequestError::Url(e.to_string()))
    }

    /// Submit a new task. The returned body is whatever the service echoes back;
    /// callers reload the list rather than render it.
    pub async fn create_task(&self, draft: &TaskDraft) -> Result<serde_json::Value, RequestError> {
        let url = self.url("tasks")?;
        debug!(%url, name = %draft.name, "creating task");
        let request = self.client.post(url).json(draft);
        self.fetch_json(request).await
    }

    /// All tasks in the order the service returns them.
    pub async fn list_tasks(&self) -> Result<Vec<Task>, RequestError> {
        let url = self.url("tasks")?;
        debug!(%url, "listing tasks");
        self.fetch_json(self.client.get(url)).await
    }

    /// Delete a task. Any response that arrives counts as success; only a
    /// transport failure is an error.
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), RequestError> {
        let url = self.task_url(id, None)?;
        debug!(%url, "deleting task");
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| log_failure(RequestError::Transport(e)))?;
        if !response.status().is_success() {
            debug!(status = %response.status(), task_id = %id, "delete answered with non-success status");
        }
        Ok(())
    }

    /// Flag a task as finished.
    pub async fn mark_done(&self, id: &TaskId) -> Result<(), RequestError> {
        let url = self.task_url(id, Some("done"))?;
        debug!(%url, "marking task done");
        self.send(self.client.put(url)).await.map(|_| ())
    }

    /// The service's day-grouped schedule, optionally capped at `daily_hours` per day.
    pub async fn get_schedule(&self, daily_hours: Option<f64>) -> Result<Schedule, RequestError> {
        let mut url = self.url("schedule")?;
        if let Some(hours) = daily_hours {
            url.query_pairs_mut()
                .append_pair("dailyHours", &hours.to_string());
        }
        debug!(%url, "fetching schedule");
        self.fetch_json(self.client.get(url)).await
    }

    /// Liveness probe against the service's `/health` route.
    pub async fn health(&self) -> Result<(), RequestError> {
        let url = self.url("health")?;
        self.send(self.client.get(url)).await.map(|_| ())
    }

    fn task_url(&self, id: &TaskId, action: Option<&str>) -> Result<Url, RequestError> {
        let mut url = self.url("tasks")?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| RequestError::Url(self.base.to_string()))?;
            segments.pop_if_empty().push(id.as_str());
            if let Some(action) = action {
                segments.push(action);
            }
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RequestError> {
        let response = request
            .send()
            .await
            .map_err(|e| log_failure(RequestError::Transport(e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(log_failure(RequestError::Status(status)));
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RequestError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| log_failure(RequestError::Decode(e)))
    }
}

fn log_failure(err: RequestError) -> RequestError {
    warn!(error = %err, "task service request failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn draft() -> TaskDraft {
        TaskDraft {
            name: "Write report".to_string(),
            estimated_hours: 2.0,
            deadline: Some("2099-01-01".to_string()),
            priority: "high".to_string(),
        }
    }

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let api = TaskApi::new("http://example.com/api").unwrap();
        assert_eq!(api.url("tasks").unwrap().as_str(), "http://example.com/api/tasks");

        let api = TaskApi::new("http://example.com/api/").unwrap();
        assert_eq!(
            api.task_url(&TaskId::new("7"), Some("done")).unwrap().as_str(),
            "http://example.com/api/tasks/7/done"
        );
    }

    #[test]
    fn test_bad_base_url() {
        assert!(matches!(TaskApi::new("not a url"), Err(RequestError::Url(_))));
    }

    #[tokio::test]
    async fn test_create_task_posts_draft() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .and(body_json(json!({
                "name": "Write report",
                "estimatedHours": 2.0,
                "deadline": "2099-01-01",
                "priority": "high"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "Task added"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        let body = api.create_task(&draft()).await.unwrap();
        assert_eq!(body["message"], "Task added");
    }

    #[tokio::test]
    async fn test_create_task_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Invalid JSON"})))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        let err = api.create_task(&draft()).await.unwrap_err();
        assert!(matches!(err, RequestError::Status(s) if s == StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_list_tasks_preserves_server_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 3, "name": "C", "estimatedHours": 1, "deadline": null, "priority": "Low"},
                {"id": 1, "name": "A", "estimatedHours": 2, "deadline": "2025-01-01", "priority": "High"},
                {"id": 2, "name": "B", "estimatedHours": 3, "deadline": "", "priority": "Medium"}
            ])))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        let tasks = api.list_tasks().await.unwrap();
        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["C", "A", "B"]);
    }

    #[tokio::test]
    async fn test_list_tasks_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tasks"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        assert!(matches!(api.list_tasks().await, Err(RequestError::Decode(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Nothing listens on the discard port.
        let api = TaskApi::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(api.list_tasks().await, Err(RequestError::Transport(_))));
        assert!(matches!(
            api.delete_task(&TaskId::new("42")).await,
            Err(RequestError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_accepts_any_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/tasks/42"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Task not found"})))
            .expect(1)
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        assert!(api.delete_task(&TaskId::new("42")).await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_done() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/tasks/5/done"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Updated"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/tasks/6/done"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        assert!(api.mark_done(&TaskId::new("5")).await.is_ok());
        assert!(api.mark_done(&TaskId::new("6")).await.is_err());
    }

    #[tokio::test]
    async fn test_get_schedule_with_daily_hours() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .and(query_param("dailyHours", "4.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "2025-11-14 (Fri)": ["Work (2.0h)"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        let schedule = api.get_schedule(Some(4.5)).await.unwrap();
        assert_eq!(schedule.days().len(), 1);
        assert_eq!(schedule.days()[0].label, "2025-11-14 (Fri)");
    }

    #[tokio::test]
    async fn test_get_schedule_rejects_wrong_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/schedule"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["not", "a", "map"])))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        assert!(api.get_schedule(None).await.is_err());
    }

    #[tokio::test]
    async fn test_health() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .mount(&server)
            .await;

        let api = TaskApi::new(&server.uri()).unwrap();
        assert!(api.health().await.is_ok());
    }
}
