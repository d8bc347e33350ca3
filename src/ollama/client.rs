//! reqwest-based [`ModelClient`] for the Ollama HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::config::Timeouts;
use crate::error::ModelError;

use super::ModelClient;
use super::types::{ErrorBody, GenerateRequest, GenerateResponse, InstalledModel, PullRequest, TagsResponse};

/// Ollama client. The host is passed per call so one client can serve any server.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    timeouts: Timeouts,
}

impl OllamaClient {
    pub fn new(timeouts: &Timeouts) -> Result<Self, ModelError> {
        let client = Client::builder()
            .connect_timeout(timeouts.connection())
            .build()
            .map_err(|e| ModelError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            timeouts: *timeouts,
        })
    }

    fn url(host: &str, path: &str) -> String {
        format!("{}{}", host.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into the matching error.
    async fn error_for_status(response: Response, model: Option<&str>) -> ModelError {
        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .map(|b| b.error)
            .unwrap_or(raw);
        let lower = message.to_lowercase();

        match model {
            Some(model) if status == StatusCode::NOT_FOUND || lower.contains("not found") => {
                ModelError::ModelNotFound(model.to_string())
            }
            Some(model) if lower.contains("invalid model") => ModelError::InvalidModel {
                model: model.to_string(),
                reason: message,
            },
            _ => ModelError::Http {
                status: status.as_u16(),
                body: message,
            },
        }
    }
}

fn map_send_error(e: reqwest::Error, host: &str, timeout: Duration) -> ModelError {
    if e.is_timeout() {
        ModelError::Timeout(timeout.as_millis() as u64)
    } else if e.is_connect() {
        ModelError::Connection {
            host: host.to_string(),
            message: e.to_string(),
        }
    } else {
        ModelError::Network(e.to_string())
    }
}

#[async_trait]
impl ModelClient for OllamaClient {
    async fn generate(&self, model: &str, host: &str, prompt: &str) -> Result<String, ModelError> {
        let timeout = self.timeouts.generation();
        debug!("Generating with {} on {} ({} prompt chars)", model, host, prompt.len());

        let response = self
            .client
            .post(Self::url(host, "/api/generate"))
            .timeout(timeout)
            .json(&GenerateRequest {
                model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| map_send_error(e, host, timeout))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response, Some(model)).await);
        }

        let body: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ModelError::Timeout(timeout.as_millis() as u64)
            } else {
                ModelError::InvalidResponse(e.to_string())
            }
        })?;

        if body.response.trim().is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(body.response)
    }

    async fn test_connection(&self, host: &str) -> bool {
        match self
            .client
            .get(Self::url(host, "/api/tags"))
            .timeout(self.timeouts.connection())
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Connection probe to {} failed: {}", host, e);
                false
            }
        }
    }

    async fn list_models(&self, host: &str) -> Result<Vec<InstalledModel>, ModelError> {
        let timeout = self.timeouts.connection();
        let response = self
            .client
            .get(Self::url(host, "/api/tags"))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_send_error(e, host, timeout))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response, None).await);
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;
        Ok(tags.models)
    }

    async fn pull_model(&self, host: &str, model: &str) -> Result<(), ModelError> {
        let timeout = self.timeouts.model_pull();
        let response = self
            .client
            .post(Self::url(host, "/api/pull"))
            .timeout(timeout)
            .json(&PullRequest { model, stream: true })
            .send()
            .await
            .map_err(|e| map_send_error(e, host, timeout))?;

        if !response.status().is_success() {
            return Err(Self::error_for_status(response, Some(model)).await);
        }

        // Progress lines are not interesting; wait for the stream to end.
        let body = response
            .text()
            .await
            .map_err(|e| map_send_error(e, host, timeout))?;

        // A failed pull still answers 200 and reports the error on its last line.
        let failure = body
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .and_then(|l| serde_json::from_str::<ErrorBody>(l).ok());
        if let Some(ErrorBody { error }) = failure {
            return Err(if error.to_lowercase().contains("not found") {
                ModelError::ModelNotFound(model.to_string())
            } else {
                ModelError::InvalidModel {
                    model: model.to_string(),
                    reason: error,
                }
            });
        }

        debug!("Pulled {} from {}", model, host);
        Ok(())
    }
}
