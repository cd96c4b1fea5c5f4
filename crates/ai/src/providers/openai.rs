use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::Provider;
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, functions_to_openai_spec, messages_to_openai_spec,
    openai_response_to_image_urls, openai_response_to_message,
};
use crate::capabilities::images::ImageGenerator;
use crate::models::capability::CapabilityDescriptor;
use crate::models::message::Message;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiProviderConfig {
        &self.config
    }

    async fn post(&self, path: &str, payload: Value) -> Result<Value> {
        let url = format!("{}/{}", self.config.host.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                // The body usually carries an `error` object worth surfacing
                let body: Value = response.json().await.unwrap_or(Value::Null);
                match body.get("error") {
                    Some(error) => Err(api_error(error)),
                    None => Err(anyhow!("Request failed: {}\nPayload: {}", status, payload)),
                }
            }
        }
    }
}

fn api_error(error: &Value) -> anyhow::Error {
    match check_openai_context_length_error(error) {
        Some(err) => err.into(),
        None => anyhow!("OpenAI API error: {}", error),
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
    ) -> Result<Message> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_to_openai_spec(messages),
        });

        if !capabilities.is_empty() {
            payload["functions"] = json!(functions_to_openai_spec(capabilities)?);
        }
        if let Some(temp) = self.config.temperature {
            payload["temperature"] = json!(temp);
        }
        if let Some(tokens) = self.config.max_tokens {
            payload["max_tokens"] = json!(tokens);
        }

        debug!(
            model = %self.config.model,
            messages = messages.len(),
            functions = capabilities.len(),
            "requesting chat completion"
        );
        let response = self.post("v1/chat/completions", payload).await?;

        if let Some(error) = response.get("error") {
            return Err(api_error(error));
        }

        openai_response_to_message(&response)
    }
}

#[async_trait]
impl ImageGenerator for OpenAiProvider {
    async fn generate(&self, prompt: &str, number: u32, size: &str) -> Result<Vec<String>> {
        let payload = json!({
            "prompt": prompt,
            "n": number,
            "size": size,
        });

        debug!(number, size, "requesting image generation");
        let response = self.post("v1/images/generations", payload).await?;

        if let Some(error) = response.get("error") {
            return Err(api_error(error));
        }

        openai_response_to_image_urls(&response)
    }
}
