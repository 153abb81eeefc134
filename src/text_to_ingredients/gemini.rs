use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::{build_prompt, parse_ingredient_records, IngredientExtractor};
use crate::config::LlmSettings;
use crate::error::ExtractError;
use crate::http_client;
use crate::model::IngredientRecord;

/// Ingredient extraction through Google Gemini `generateContent`
pub struct GeminiExtractor {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

impl GeminiExtractor {
    /// Create a Gemini client
    ///
    /// # Arguments
    /// * `settings` - Model, API base URL and optional generation parameters
    /// * `api_key` - Gemini API key, sent as `?key=`
    /// * `timeout` - Optional per-request timeout; `None` keeps the HTTP client default
    ///
    /// # Errors
    /// Returns `ExtractError::Builder` if the HTTP client cannot be constructed
    pub fn new(
        settings: &LlmSettings,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ExtractError> {
        Ok(GeminiExtractor {
            client: http_client(timeout)?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_output_tokens: settings.max_output_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generation_config(&self) -> Option<Value> {
        let mut config = Map::new();
        if let Some(temperature) = self.temperature {
            config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = self.max_output_tokens {
            config.insert("maxOutputTokens".to_string(), json!(max_tokens));
        }
        (!config.is_empty()).then_some(Value::Object(config))
    }

    /// Send one prompt and return the model's text answer
    async fn generate(&self, prompt: String) -> Result<String, ExtractError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut body = json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }]
        });
        if let Some(config) = self.generation_config() {
            body["generationConfig"] = config;
        }

        debug!("Sending analysis request to Google Gemini ({})", self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_body: Value = response.json().await.map_err(|e| {
            ExtractError::Llm(format!("unreadable Google Gemini response ({}): {}", status, e))
        })?;
        debug!("Google Gemini response: {:?}", response_body);

        // Check for API error response
        if let Some(error) = response_body.get("error") {
            let error_code = error["code"].as_i64().unwrap_or(0);
            let error_message = error["message"].as_str().unwrap_or("Unknown error");
            return Err(ExtractError::Llm(format!(
                "Google Gemini API error ({}): {}",
                error_code, error_message
            )));
        }
        if !status.is_success() {
            return Err(ExtractError::Llm(format!(
                "Google Gemini API error ({})",
                status
            )));
        }

        response_body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                let reason = response_body["candidates"][0]["finishReason"]
                    .as_str()
                    .or_else(|| response_body["promptFeedback"]["blockReason"].as_str())
                    .unwrap_or("no text in response");
                ExtractError::Llm(format!(
                    "Failed to extract content from Google Gemini response: {}",
                    reason
                ))
            })
    }
}

#[async_trait]
impl IngredientExtractor for GeminiExtractor {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn extract(&self, raw_text: &str) -> Result<Vec<IngredientRecord>, ExtractError> {
        let answer = self.generate(build_prompt(raw_text)).await?;
        let records = parse_ingredient_records(&answer)?;

        for record in records.iter().filter(|r| !r.is_verbatim_in(raw_text)) {
            warn!(
                "Ingredient list ({}) is not a verbatim substring of the OCR text",
                record.lang
            );
        }

        Ok(records)
    }
}
