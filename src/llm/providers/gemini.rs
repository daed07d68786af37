//! Provider for the Google generateContent API.
use std::path::PathBuf;

use async_trait::async_trait;

use crate::config::ModelConfig;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::provider::ModelProvider;
use crate::llm::encode_image;

pub struct GeminiProvider {
    api_base: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_completion_tokens: u32,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &ModelConfig, api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_completion_tokens: config.max_completion_tokens,
            client,
        }
    }
}

#[async_trait]
impl ModelProvider for GeminiProvider {
    async fn get_response(&self, prompt: &str, images: &[PathBuf]) -> DroidClawResult<String> {
        let mut parts = vec![serde_json::json!({ "text": prompt })];
        for image in images {
            let b64 = encode_image(image)?;
            parts.push(serde_json::json!({
                "inline_data": { "mime_type": "image/jpeg", "data": b64 },
            }));
        }

        let body = serde_json::json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_completion_tokens,
            },
        });

        let url = format!("{}/{}:generateContent", self.api_base, self.model);
        tracing::debug!(model = %self.model, images = images.len(), "sending model request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(DroidClawError::Model(format!("{status}: {err_body}")));
        }

        let json: serde_json::Value = response.json().await?;
        let text = json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .to_string();

        tracing::info!(
            content_len = text.len(),
            prompt_tokens = json["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0),
            completion_tokens = json["usageMetadata"]["candidatesTokenCount"]
                .as_u64()
                .unwrap_or(0),
            "model response received"
        );

        if text.is_empty() {
            return Err(DroidClawError::Model("empty model response".into()));
        }
        Ok(text)
    }
}
