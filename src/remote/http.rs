//! HTTP implementation of the PipelineApi trait
//!
//! Talks to the pipeline service's JSON API:
//! - `POST {base}/pipeline/run`
//! - `POST {base}/pipeline/source-list`
//! - `GET  {base}/pipeline/status/{id}`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{Value, json};

use super::{PipelineApi, PollResponse, RemoteError, RemoteStatus, RunRequest, StepReport};
use crate::id::{PromptId, RunId};

/// Connection settings for the pipeline service
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Base URL including the API prefix, e.g. `http://localhost:5000/api`
    pub base_url: String,
    /// Bearer token sent with every request
    pub token: Option<String>,
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpSettings {
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Pipeline service client
pub struct HttpPipelineApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPipelineApi {
    pub fn new(settings: HttpSettings) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| RemoteError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            token: settings.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the JSON body of a successful response
    async fn send_request(&self, request: RequestBuilder) -> Result<Value, RemoteError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        // Error bodies carry {"error": "..."}; fall back to the status reason
        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|body| body.get("error").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());
            log::debug!("pipeline API error {}: {}", status, message);
            return Err(RemoteError::http(status.as_u16(), message));
        }

        serde_json::from_str(&text).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}

/// Run identifier from a submission response (`story_id`, or `id`)
pub fn parse_run_id(body: &Value) -> Result<RunId, RemoteError> {
    let raw = body.get("story_id").or_else(|| body.get("id"));
    let id = match raw {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    id.map(RunId).ok_or(RemoteError::MissingRunId)
}

/// Status response: `{status, runs: [{status, error_message}], ...}`
///
/// A body without a `status` string is treated as still running.
pub fn parse_poll_response(body: Value) -> Result<PollResponse, RemoteError> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .map(RemoteStatus::from_wire)
        .unwrap_or(RemoteStatus::Running);

    let steps = match body.get("runs").or_else(|| body.get("steps")) {
        Some(Value::Array(runs)) => runs
            .iter()
            .map(|run| StepReport {
                status: run
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                error_message: run
                    .get("error_message")
                    .and_then(Value::as_str)
                    .filter(|m| !m.is_empty())
                    .map(String::from),
            })
            .collect(),
        _ => Vec::new(),
    };

    Ok(PollResponse {
        status,
        steps,
        result: Some(body),
    })
}

#[async_trait]
impl PipelineApi for HttpPipelineApi {
    async fn submit_run(&self, request: RunRequest) -> Result<RunId, RemoteError> {
        let body = json!({
            "story_id": request.parent,
            "selected_story": request.source_body,
            "refinement_prompt_id": request.refinement_id,
        });
        let response = self
            .send_request(self.client.post(self.url("/pipeline/run")).json(&body))
            .await?;
        parse_run_id(&response)
    }

    async fn submit_source_list(&self, prompt_id: PromptId) -> Result<RunId, RemoteError> {
        let body = json!({ "prompt_id": prompt_id });
        let response = self
            .send_request(self.client.post(self.url("/pipeline/source-list")).json(&body))
            .await?;
        parse_run_id(&response)
    }

    async fn poll_status(&self, run_id: RunId) -> Result<PollResponse, RemoteError> {
        let response = self
            .send_request(self.client.get(self.url(&format!("/pipeline/status/{}", run_id))))
            .await?;
        parse_poll_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_id_variants() {
        assert_eq!(parse_run_id(&json!({"story_id": 12})), Ok(RunId(12)));
        assert_eq!(parse_run_id(&json!({"id": "34"})), Ok(RunId(34)));
        assert_eq!(parse_run_id(&json!({"story_id": null})), Err(RemoteError::MissingRunId));
        assert_eq!(parse_run_id(&json!({})), Err(RemoteError::MissingRunId));
    }

    #[test]
    fn test_parse_poll_response_maps_runs_to_steps() {
        let body = json!({
            "status": "failed",
            "runs": [
                {"step_type": "refinement", "status": "completed", "error_message": null},
                {"step_type": "validation", "status": "failed", "error_message": "X"}
            ]
        });
        let response = parse_poll_response(body.clone()).unwrap();
        assert_eq!(response.status, RemoteStatus::Failed);
        assert_eq!(response.steps.len(), 2);
        assert_eq!(response.failure_message(), "X");
        assert_eq!(response.result, Some(body));
    }

    #[test]
    fn test_parse_poll_response_without_status_is_running() {
        let response = parse_poll_response(json!({"runs": []})).unwrap();
        assert_eq!(response.status, RemoteStatus::Running);
        assert_eq!(response.result, Some(json!({"runs": []})));

        let response = parse_poll_response(json!({"status": 3})).unwrap();
        assert_eq!(response.status, RemoteStatus::Running);
    }

    #[test]
    fn test_settings_trailing_slash_trimmed() {
        let api = HttpPipelineApi::new(HttpSettings::with_base_url("http://h.example/api/")).unwrap();
        assert_eq!(api.url("/pipeline/run"), "http://h.example/api/pipeline/run");
    }
}
