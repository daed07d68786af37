//! Provider for OpenAI-compatible chat/completions endpoints.
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::ModelProvider;
use crate::llm::encode_image;

pub struct OpenAiCompatibleProvider {
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_completion_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &ModelConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_base: config.api_base.clone(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
            client,
        }
    }
}

#[async_trait]
impl ModelProvider for OpenAiCompatibleProvider {
    async fn get_response(&self, prompt: &str, images: &[PathBuf]) -> DroidClawResult<String> {
        let mut content = vec![serde_json::json!({ "type": "text", "text": prompt })];
        for image in images {
            let b64 = encode_image(image)?;
            content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": format!("data:image/jpeg;base64,{b64}") },
            }));
        }

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "temperature": self.temperature,
            "max_tokens": self.max_completion_tokens,
        });

        tracing::debug!(model = %self.model, images = images.len(), "sending model request");

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DroidClawError::Model(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response.json().await?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string();

        tracing::info!(
            content_len = text.len(),
            prompt_tokens = json["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            completion_tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0),
            "model response received"
        );

        if text.is_empty() {
            return Err(DroidClawError::Model("empty model response".into()));
        }
        Ok(text)
    }
}
