use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::client::LlmClient;
use crate::error::SuggestionError;
use crate::util::SecretString;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn build_http_client(timeout_secs: u64) -> Result<Client, SuggestionError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SuggestionError::Network(format!("failed to build HTTP client: {}", e)))
}

/// Map a transport failure. The URL is dropped since it may carry the API key.
fn classify_send_error(err: reqwest::Error, local: bool, endpoint: &str) -> SuggestionError {
    let err = err.without_url();
    if local {
        SuggestionError::ModelLoad(format!("cannot reach model server at {}: {}", endpoint, err))
    } else if err.is_timeout() {
        SuggestionError::Network(format!("request to {} timed out", endpoint))
    } else {
        SuggestionError::Network(format!("request to {} failed: {}", endpoint, err))
    }
}

fn classify_status(status: StatusCode, body: String, local: bool) -> SuggestionError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SuggestionError::Auth(format!("backend rejected the credential ({})", status))
        }
        // Gemini answers an invalid key with 400 INVALID_ARGUMENT
        StatusCode::BAD_REQUEST if body.contains("API_KEY_INVALID") => {
            SuggestionError::Auth("backend rejected the API key".to_string())
        }
        // Ollama answers an unpulled model with 404
        StatusCode::NOT_FOUND if local => SuggestionError::ModelLoad(body),
        _ => SuggestionError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

fn non_empty(text: Option<String>) -> Result<String, SuggestionError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or(SuggestionError::EmptyResponse)
}

// ============================================================================
// OpenAI-compatible Client (OpenAI, Ollama, llama.cpp server, ...)
// ============================================================================

pub struct OpenAIClient {
    api_key: SecretString,
    /// Set when a key is required; names where it was expected
    key_source: Option<String>,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    local: bool,
    client: Client,
}

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

impl OpenAIClient {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, SuggestionError> {
        Self::with_base_url(
            api_key,
            model,
            OPENAI_BASE_URL.to_string(),
            max_tokens,
            timeout_secs,
        )
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, SuggestionError> {
        Ok(Self {
            api_key: api_key.into(),
            key_source: None,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            temperature: 0.7,
            local: false,
            client: build_http_client(timeout_secs)?,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Require a key: requests made without one fail with an auth error
    /// naming `key_source` instead of reaching the server
    pub fn with_key_source(mut self, key_source: String) -> Self {
        self.key_source = Some(key_source);
        self
    }

    /// Treat connection failures and unknown models as a local model that
    /// failed to load rather than as network trouble
    pub fn as_local(mut self) -> Self {
        self.local = true;
        self
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, prompt: &str) -> Result<String, SuggestionError> {
        if let Some(ref key_source) = self.key_source {
            if self.api_key.is_empty() {
                return Err(SuggestionError::Auth(key_source.clone()));
            }
        }

        let request = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![OpenAIMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!(
            "Calling OpenAI-compatible API at {} with model: {}",
            self.base_url, self.model
        );

        let url = format!("{}/chat/completions", self.base_url);
        let mut req = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&request);

        if !self.api_key.is_empty() && !self.api_key.expose().eq_ignore_ascii_case("none") {
            req = req.header("authorization", format!("Bearer {}", self.api_key.expose()));
        }

        let response = req
            .send()
            .await
            .map_err(|e| classify_send_error(e, self.local, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text, self.local));
        }

        let api_response: OpenAIResponse = response.json().await.map_err(|e| {
            SuggestionError::Api {
                status: status.as_u16(),
                body: format!("unparseable response: {}", e.without_url()),
            }
        })?;

        non_empty(
            api_response
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content),
        )
    }

    fn describe(&self) -> String {
        let kind = if self.local { "local" } else { "openai" };
        format!("{}/{}", kind, self.model)
    }
}

// ============================================================================
// Gemini Client (Google Generative AI)
// ============================================================================

pub struct GeminiClient {
    api_key: SecretString,
    /// Where the key was expected, reported when it is missing
    key_source: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: Option<f32>,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, SuggestionError> {
        Self::with_base_url(
            api_key,
            model,
            GEMINI_BASE_URL.to_string(),
            max_tokens,
            timeout_secs,
        )
    }

    pub fn with_base_url(
        api_key: String,
        model: String,
        base_url: String,
        max_tokens: u32,
        timeout_secs: u64,
    ) -> Result<Self, SuggestionError> {
        Ok(Self {
            api_key: api_key.into(),
            key_source: "no API key configured".to_string(),
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_tokens,
            temperature: None,
            client: build_http_client(timeout_secs)?,
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_key_source(mut self, key_source: String) -> Self {
        self.key_source = key_source;
        self
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, SuggestionError> {
        if self.api_key.is_empty() {
            return Err(SuggestionError::Auth(self.key_source.clone()));
        }

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
                temperature: self.temperature,
            }),
        };

        debug!("Calling Gemini API with model: {}", self.model);

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", self.api_key.expose())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_send_error(e, false, &self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_text, false));
        }

        let api_response: GeminiResponse = response.json().await.map_err(|e| {
            SuggestionError::Api {
                status: status.as_u16(),
                body: format!("unparseable response: {}", e.without_url()),
            }
        })?;

        non_empty(
            api_response
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| {
                    c.parts
                        .into_iter()
                        .filter_map(|p| p.text)
                        .collect::<Vec<_>>()
                        .join("")
                }),
        )
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

// ============================================================================
// Tests
// ============================================================================
