use std::time::Duration;

use copydesk_core::{ClaimReport, OperationRequest, TaskId, TaskStatusReport};
use copydesk_logging::desk_debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ApiError, FailureKind};

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Remote collaborator that runs long operations and checks claims.
#[async_trait::async_trait]
pub trait TaskApi: Send + Sync {
    async fn start_task(&self, request: &OperationRequest) -> Result<TaskId, ApiError>;

    async fn poll_task_status(&self, task_id: &TaskId) -> Result<TaskStatusReport, ApiError>;

    async fn check_claims(&self, content: &str) -> Result<ClaimReport, ApiError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartResponse {
    task_id: TaskId,
}

#[derive(Debug, Serialize)]
struct FactCheckBody<'a> {
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct HttpTaskApi {
    base_url: reqwest::Url,
    client: reqwest::Client,
}

impl HttpTaskApi {
    pub fn new(settings: ApiSettings) -> Result<Self, ApiError> {
        let base_url = reqwest::Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { base_url, client })
    }

    /// Appends `segments` to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::new(FailureKind::InvalidUrl, self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<B, T>(&self, url: reqwest::Url, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        desk_debug!("POST {}", url);
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        read_json(request).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: reqwest::Url) -> Result<T, ApiError> {
        desk_debug!("GET {}", url);
        read_json(self.client.get(url).header(ACCEPT, "application/json")).await
    }
}

#[async_trait::async_trait]
impl TaskApi for HttpTaskApi {
    async fn start_task(&self, request: &OperationRequest) -> Result<TaskId, ApiError> {
        let url = self.endpoint(&["api", request.kind().as_str(), "start"])?;
        let started: StartResponse = self.post_json(url, request).await?;
        Ok(started.task_id)
    }

    async fn poll_task_status(&self, task_id: &TaskId) -> Result<TaskStatusReport, ApiError> {
        let url = self.endpoint(&["api", "tasks", task_id.as_str(), "status"])?;
        self.get_json(url).await
    }

    async fn check_claims(&self, content: &str) -> Result<ClaimReport, ApiError> {
        let url = self.endpoint(&["api", "fact-check"])?;
        self.post_json(url, &FactCheckBody { content }).await
    }
}

async fn read_json<T: DeserializeOwned>(request: reqwest::RequestBuilder) -> Result<T, ApiError> {
    let response = request.send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }

    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&bytes).map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
