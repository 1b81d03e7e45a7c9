//! HTTP client for the backend job API.
//!
//! The backend exposes its long-running jobs over a small JSON API:
//! starting a job returns a task id immediately, and the result is fetched
//! by polling. Every response uses the backend's standard envelope of
//! `{"result": ..., "message": "..."}` where a null result together with a
//! non-empty message means the call failed.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

use folio_core::TaskId;

use crate::backend::{BackendRpc, BoxFuture};
use crate::error::{RpcError, RpcResult};

/// Default timeout for backend requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Request body for starting a job.
#[derive(Debug, Serialize)]
struct StartJobRequest<'a> {
    name: &'a str,
    args: Value,
}

/// The backend's standard response envelope.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    message: String,
}

/// JSON-over-HTTP implementation of the backend job API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a new client against the given API base URL
    /// (e.g. `http://127.0.0.1:4242/api/1`).
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()
            .map_err(|e| RpcError::Transport(format!("Failed to create HTTP client: {e}")))?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self { client, base_url })
    }

    async fn post(&self, path: &str, body: Option<&StartJobRequest<'_>>) -> RpcResult<ApiResponse> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("HTTP request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn get(&self, path: &str) -> RpcResult<ApiResponse> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("HTTP request failed: {e}")))?;
        Self::decode(response).await
    }

    async fn decode(response: reqwest::Response) -> RpcResult<ApiResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Transport(format!("HTTP {status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| RpcError::Protocol(format!("Failed to parse response: {e}")))
    }

    /// Pull the task id out of a job-start envelope.
    fn task_id_from(envelope: ApiResponse) -> RpcResult<TaskId> {
        let result = match envelope.result {
            Some(result) => result,
            None => return Err(RpcError::Backend(envelope.message)),
        };
        let raw = result
            .get("task_id")
            .ok_or_else(|| RpcError::Protocol(format!("missing task_id in {result}")))?;
        TaskId::from_value(raw).map_err(|e| RpcError::Protocol(e.to_string()))
    }
}

impl BackendRpc for HttpBackend {
    fn start_job(&self, name: &str, args: Value) -> BoxFuture<'_, RpcResult<TaskId>> {
        let name = name.to_string();
        Box::pin(async move {
            debug!(job = %name, "starting backend job");
            let request = StartJobRequest { name: &name, args };
            let envelope = self.post("/jobs", Some(&request)).await?;
            let id = Self::task_id_from(envelope)?;
            debug!(job = %name, task_id = %id, "backend job started");
            Ok(id)
        })
    }

    fn poll_job(&self, id: TaskId) -> BoxFuture<'_, RpcResult<Option<Value>>> {
        Box::pin(async move {
            trace!(task_id = %id, "polling backend job");
            let envelope = self.get(&format!("/jobs/{id}")).await?;
            // A null result means the job is still running; error-shaped
            // results come back as a payload and are the caller's problem.
            Ok(envelope.result)
        })
    }

    fn query_all_balances(&self) -> BoxFuture<'_, RpcResult<TaskId>> {
        Box::pin(async move {
            debug!("requesting consolidated balance query");
            let envelope = self.post("/balances/query", None).await?;
            Self::task_id_from(envelope)
        })
    }
}
