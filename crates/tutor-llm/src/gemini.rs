//! Gemini `generateContent` REST client.
//!
//! Uses the blocking reqwest client: construct and call it from a blocking
//! context (a plain thread or `tokio::task::spawn_blocking`), never directly
//! on an async executor.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::HeaderValue;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_core::config::LlmConfig;

use crate::client::{Completion, LanguageModel, SafetySetting, SafetySettings};
use crate::error::LlmError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Language model backed by the Gemini HTTP API.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_timeout(api_key, model, Duration::from_secs(60))
    }

    pub fn with_timeout(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| transport_error("failed to build HTTP client", e))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Build from configuration, resolving the API key from the config or
    /// its environment variable.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| LlmError::MissingApiKey(config.api_key_env.clone()))?;
        let client = Self::with_timeout(
            api_key,
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(client.with_base_url(config.base_url.clone()))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

impl LanguageModel for GeminiClient {
    fn complete(&self, prompt: &str, safety: &SafetySettings) -> Result<Completion, LlmError> {
        let body = build_request(prompt, safety);
        debug!(model = %self.model, prompt_len = prompt.len(), "Sending generateContent request");

        let mut api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| LlmError::Transport("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .map_err(|e| transport_error("Gemini request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text, retry_after));
        }

        let parsed: GenerateContentResponse = response.json().map_err(|e| {
            LlmError::InvalidResponse(format!(
                "Failed to parse Gemini response: {}",
                e.without_url()
            ))
        })?;

        Ok(interpret_response(parsed))
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// -- Wire types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content>,
    safety_settings: &'a [SafetySetting],
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ContentResponse>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// -- Private helpers --

fn build_request<'a>(prompt: &str, safety: &'a SafetySettings) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        }],
        safety_settings: safety.as_slice(),
    }
}

/// Concatenate the text parts of the first candidate, or report why there
/// are none.
fn interpret_response(response: GenerateContentResponse) -> Completion {
    let block_reason = response.prompt_feedback.and_then(|f| f.block_reason);
    let Some(candidate) = response.candidates.and_then(|c| c.into_iter().next()) else {
        return Completion::Empty {
            finish_reason: block_reason,
        };
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        Completion::Empty {
            finish_reason: candidate.finish_reason.or(block_reason),
        }
    } else {
        Completion::Text(text)
    }
}

fn map_http_error(status: StatusCode, body: &str, retry_after: Option<Duration>) -> LlmError {
    let parsed = serde_json::from_str::<ErrorWrapper>(body).ok();
    let status_text = parsed
        .as_ref()
        .and_then(|w| w.error.status.clone())
        .unwrap_or_default();
    let message = parsed
        .and_then(|w| w.error.message)
        .unwrap_or_else(|| body.to_string());

    if status == StatusCode::TOO_MANY_REQUESTS || status_text == "RESOURCE_EXHAUSTED" {
        return LlmError::RateLimited {
            message,
            retry_after,
        };
    }

    let message = if status_text.is_empty() {
        message
    } else {
        format!("{}: {}", status_text, message)
    };
    LlmError::Http {
        status: status.as_u16(),
        message,
    }
}

/// Drop the request URL from reqwest's message so nothing about the
/// endpoint or its credentials reaches logs.
fn transport_error(context: &str, e: reqwest::Error) -> LlmError {
    LlmError::Transport(format!("{}: {}", context, e.without_url()))
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
