use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

use crate::config::GenerationParams;
use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::task::Category;

/// The generation-service seam. The workflow only needs a role-tagged
/// request/response call; everything else about the service is opaque.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, category: Category, prompt: &str) -> Result<String, ServiceError>;
}

/// Structured review decision returned by the architect's review call.
/// Replaces free-text keyword scanning with an explicit contract.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReviewVerdict {
    pub approved: bool,
    #[serde(default)]
    pub summary: String,
}

impl ReviewVerdict {
    /// Extract a verdict from a completion that may wrap the JSON object in
    /// prose or a code fence.
    pub fn extract(response: &str) -> Result<Self, ServiceError> {
        let trimmed = response.trim();
        if let Ok(verdict) = serde_json::from_str(trimmed) {
            return Ok(verdict);
        }
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                if let Ok(verdict) = serde_json::from_str(&trimmed[start..=end]) {
                    return Ok(verdict);
                }
            }
        }
        Err(ServiceError::MalformedResponse(format!(
            "no review verdict object in response ({} bytes)",
            response.len()
        )))
    }
}

/// Client for an OpenAI-style chat completion endpoint. Model and generation
/// parameters are bound per role; every call carries the configured timeout.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    models: crate::config::RoleBound<String>,
    parameters: crate::config::RoleBound<GenerationParams>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl OpenAiClient {
    pub fn new(config: &ServiceConfig, api_key: String) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            models: config.models.clone(),
            parameters: config.parameters.clone(),
        })
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, category: Category, prompt: &str) -> Result<String, ServiceError> {
        let model = self.models.for_category(category);
        let params = self.parameters.for_category(category);
        let body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": format!("You are a {category} agent.") },
                { "role": "user", "content": prompt },
            ],
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
        });

        tracing::debug!(%category, %model, prompt_len = prompt.len(), "requesting completion");

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ServiceError::Timeout {
                        role: category.to_string(),
                    }
                } else {
                    ServiceError::from(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| ServiceError::MalformedResponse(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ServiceError::MalformedResponse("empty choices array".to_string()))
    }
}
