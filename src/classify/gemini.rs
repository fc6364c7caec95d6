//! Gemini `generateContent` client.

use super::{ClassificationRequest, Classifier, ClassifyError};
use crate::config::ClassifierConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

/// Longest slice of an error body kept in [`ClassifyError::Status`].
const ERROR_BODY_LIMIT: usize = 512;

pub struct GeminiClassifier {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl GeminiClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self, ClassifyError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ClassifyError::MissingApiKey)?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    fn body(&self, request: &ClassificationRequest) -> Value {
        let mut generation_config = json!({ "temperature": self.temperature });
        if let Some(schema) = &request.response_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }
        json!({
            "systemInstruction": { "parts": [{ "text": request.system_instruction }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: &Value) -> Option<String> {
    let parts = response
        .pointer("/candidates/0/content/parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait::async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> String {
        format!("gemini:{}", self.model)
    }

    async fn complete(&self, request: &ClassificationRequest) -> Result<String, ClassifyError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if let Some((cut, _)) = body.char_indices().nth(ERROR_BODY_LIMIT) {
                body.truncate(cut);
            }
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        candidate_text(&payload).ok_or(ClassifyError::EmptyResponse)
    }
}
