use async_trait::async_trait;
use press_core::{BackendSettings, TaskDescriptor};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{BackendError, Result};
use crate::types::{ErrorRecord, HealthStatus};
use crate::BackendClient;

/// Backend reached over HTTP.
///
/// Endpoints, relative to the base URL:
/// - `GET  /workers/{worker}/task` returns a descriptor, or 204 when idle
/// - `POST /tasks/{id}/started`
/// - `POST /tasks/{id}/finished`
/// - `POST /tasks/{id}/errors` with an [`ErrorRecord`]
/// - `POST /workers/{worker}/health` with a [`HealthStatus`]
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
    worker_id: String,
}

impl HttpBackend {
    pub fn new(settings: &BackendSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.url.trim_end_matches('/').to_string(),
            token: settings.token.clone().filter(|t| !t.is_empty()),
            worker_id: settings.worker_id.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("X-Worker-Id", &self.worker_id);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), "Backend request failed");
        Err(BackendError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<()> {
        debug!(path, "POST backend");
        let response = self
            .authorize(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn get_task(&self) -> Result<Option<TaskDescriptor>> {
        let path = format!("/workers/{}/task", self.worker_id);
        let response = self
            .authorize(self.client.get(self.url(&path)))
            .send()
            .await?;

        if matches!(response.status(), StatusCode::NO_CONTENT | StatusCode::NOT_FOUND) {
            return Ok(None);
        }

        let body = Self::check(response).await?.text().await?;
        let task = TaskDescriptor::from_json(&body).map_err(|e| BackendError::InvalidTask {
            task_id: task_id_of(&body),
            reason: e.to_string(),
        })?;
        debug!(task_id = %task.id, method = %task.method(), "Fetched task");
        Ok(Some(task))
    }

    async fn report_started(&self, task_id: &str) -> Result<()> {
        self.post_json(&format!("/tasks/{}/started", task_id), &serde_json::json!({}))
            .await
    }

    async fn report_health_status(&self, status: &HealthStatus) -> Result<()> {
        self.post_json(&format!("/workers/{}/health", self.worker_id), status)
            .await
    }

    async fn report_finished(&self, task_id: &str) -> Result<()> {
        self.post_json(&format!("/tasks/{}/finished", task_id), &serde_json::json!({}))
            .await
    }

    async fn report_errored(&self, record: &ErrorRecord) -> Result<()> {
        self.post_json(&format!("/tasks/{}/errors", record.task_id), record)
            .await
    }
}

/// The `id` of a payload that did not parse as a descriptor.
fn task_id_of(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("worker_id", &self.worker_id)
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}
