use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::{ClientError, Result};
use crate::task::{Task, TaskDraft, TaskId};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// The persistence collaborator the controller talks to.
#[async_trait]
pub trait TaskBackend {
    async fn list(&self) -> Result<Vec<Task>>;

    async fn create(&self, draft: &TaskDraft) -> Result<Task>;

    /// Sends the full record and returns the backend's canonical copy.
    async fn update(&self, task: &Task) -> Result<Task>;

    async fn delete(&self, id: TaskId) -> Result<()>;

    async fn health(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// REST client for the `/api/tasks` resource.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http_client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: String,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(endpoint)?;
        debug!(%method, %url, "backend request");
        Ok(self.http_client.request(method, url))
    }

    async fn send(&self, builder: RequestBuilder, id: Option<TaskId>) -> Result<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::NOT_FOUND
            && let Some(id) = id
        {
            return Err(ClientError::NotFound(id));
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status { status, body })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        id: Option<TaskId>,
    ) -> Result<T> {
        let response = self.send(builder, id).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl TaskBackend for HttpBackend {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Task>> {
        let builder = self.request(Method::GET, "/api/tasks")?;
        self.send_json(builder, None).await
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create(&self, draft: &TaskDraft) -> Result<Task> {
        let builder = self.request(Method::POST, "/api/tasks")?.json(draft);
        self.send_json(builder, None).await
    }

    #[instrument(skip(self, task), fields(id = %task.id))]
    async fn update(&self, task: &Task) -> Result<Task> {
        let endpoint = format!("/api/tasks/{}", task.id);
        let builder = self.request(Method::PUT, &endpoint)?.json(task);
        self.send_json(builder, Some(task.id)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: TaskId) -> Result<()> {
        let endpoint = format!("/api/tasks/{id}");
        let builder = self.request(Method::DELETE, &endpoint)?;
        self.send(builder, Some(id)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health(&self) -> Result<String> {
        let builder = self.request(Method::GET, "/health")?;
        let body: HealthBody = self.send_json(builder, None).await?;
        Ok(body.status)
    }
}
