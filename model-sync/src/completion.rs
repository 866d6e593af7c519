//! Chat-completions adapter for the transformation service.
//!
//! Speaks the OpenAI-style `POST {base_url}/chat/completions` API. The prompt itself
//! comes from [`model_sync_core::transform`]; this module only handles transport,
//! status mapping and response parsing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use model_sync_core::contract::{TransformRequest, Transformer};
use model_sync_core::transform::{clean_completion, user_message, SYSTEM_ROLE};
use model_sync_core::SyncError;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::load_config::TransformationSection;

pub struct ChatCompletionsClient {
    http: Client,
    endpoint: String,
    model: String,
    api_key: SecretString,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionsClient {
    pub fn new(config: &TransformationSection, api_key: SecretString) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building transformation service HTTP client")?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        info!(
            endpoint = %endpoint,
            model = %config.model,
            timeout_secs = config.timeout_secs,
            "Initialized ChatCompletionsClient"
        );
        Ok(Self {
            http,
            endpoint,
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Transformer for ChatCompletionsClient {
    async fn transform<'a>(&self, request: TransformRequest<'a>) -> Result<String, SyncError> {
        let user = user_message(&request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_ROLE,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };
        debug!(
            model = %self.model,
            prompt_bytes = user.len(),
            "Sending transformation request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "Failed to reach transformation service");
                SyncError::TransformationService(format!("network error: {e}"))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, "Transformation service rate limited the request");
            return Err(SyncError::TransformationService(format!(
                "rate limited: {text}"
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, "Transformation service returned an error");
            return Err(SyncError::TransformationService(format!(
                "HTTP {status}: {text}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            SyncError::TransformationService(format!("malformed response: {e}"))
        })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                SyncError::TransformationService("response contained no completion".to_string())
            })?;

        let cleaned = clean_completion(&content)?;
        info!(bytes = cleaned.len(), "Received transformed client model");
        Ok(cleaned)
    }
}
