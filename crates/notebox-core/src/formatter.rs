//! Note formatting using the Gemini API.
//!
//! The formatter takes the joined text of a batch and a system instruction
//! and returns the Markdown note produced by the model. The call is remote,
//! slow (seconds) and fallible, so it sits behind the [`NoteFormatter`]
//! trait and tests substitute their own implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini REST API base URL.
const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Upper bound for a single formatting request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors that can occur while formatting a note.
#[derive(Error, Debug)]
pub enum FormattingError {
    /// Gemini API key not configured.
    #[error("Gemini API key not set (GEMINI_API_KEY)")]
    NoApiKey,

    /// The HTTP request could not be completed.
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// The API answered with a non-success status.
    #[error("Gemini API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The response parsed but carried no text.
    #[error("Empty response from model{}", reason_suffix(.0))]
    EmptyResponse(Option<String>),
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_deref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default()
}

/// A text-to-text transformation producing the note body.
#[async_trait]
pub trait NoteFormatter: Send + Sync {
    /// Format `content` following `system_instruction`.
    async fn format(
        &self,
        system_instruction: &str,
        content: &str,
    ) -> Result<String, FormattingError>;
}

/// Gemini `generateContent` client.
#[derive(Clone)]
pub struct GeminiFormatter {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiFormatter {
    /// Create a formatter for the given key and model.
    ///
    /// A missing key is not an error here; every call then fails with
    /// [`FormattingError::NoApiKey`] so the user sees it in chat.
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            client: build_client(REQUEST_TIMEOUT),
            api_key,
            model: model.into(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    /// Point the client at a different API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The model this formatter calls.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl NoteFormatter for GeminiFormatter {
    async fn format(
        &self,
        system_instruction: &str,
        content: &str,
    ) -> Result<String, FormattingError> {
        let api_key = self.api_key.as_deref().ok_or(FormattingError::NoApiKey)?;

        let request = GenerateRequest::new(system_instruction, content);
        trace!(model = %self.model, chars = content.chars().count(), "Sending generateContent request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| FormattingError::RequestFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FormattingError::RequestFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(FormattingError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let text = extract_text(&body)?;
        debug!(model = %self.model, chars = text.chars().count(), "Note formatted");
        Ok(text)
    }
}

/// `generateContent` request body.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
}

impl<'a> GenerateRequest<'a> {
    fn new(system_instruction: &'a str, content: &'a str) -> Self {
        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: system_instruction }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: content }],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// `generateContent` response body (only the fields we read).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate.
/// HTTP client with a request timeout.
///
/// If the builder fails, logs a warning and returns a default client without
/// the timeout.
fn build_client(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, timeout_secs = timeout.as_secs(), "Failed to build HTTP client with timeout, using defaults");
            reqwest::Client::new()
        }
    }
}

fn extract_text(body: &str) -> Result<String, FormattingError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| FormattingError::ParseError(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response.prompt_feedback.and_then(|f| f.block_reason);
        return Err(FormattingError::EmptyResponse(reason));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FormattingError::EmptyResponse(candidate.finish_reason));
    }

    Ok(text)
}

/// Pull `error.message` out of an API error body, or fall back to the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = GenerateRequest::new("be terse", "buy milk");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system_instruction"]["parts"][0]["text"], "be terse");
        assert!(json["system_instruction"].get("role").is_none());
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "buy milk");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r##"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "# Shopping\n"}, {"text": "- milk"}]},
                "finishReason": "STOP"
            }]
        }"##;
        assert_eq!(extract_text(body).unwrap(), "# Shopping\n- milk");
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        match extract_text(body) {
            Err(FormattingError::EmptyResponse(reason)) => {
                assert_eq!(reason.as_deref(), Some("SAFETY"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_empty_candidate() {
        let body = r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#;
        let err = extract_text(body).unwrap_err();
        assert_eq!(err.to_string(), "Empty response from model (MAX_TOKENS)");
    }

    #[test]
    fn test_extract_text_malformed() {
        assert!(matches!(
            extract_text("not json"),
            Err(FormattingError::ParseError(_))
        ));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(api_error_message(body), "Quota exceeded");
        assert_eq!(api_error_message("Bad Gateway\n"), "Bad Gateway");
    }

    #[test]
    fn test_endpoint() {
        let formatter = GeminiFormatter::new(None, DEFAULT_MODEL)
            .with_base_url("http://localhost:9999/v1beta/models/");
        assert_eq!(
            formatter.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[tokio::test]
    async fn test_format_without_api_key() {
        let formatter = GeminiFormatter::new(None, DEFAULT_MODEL);
        let result = formatter.format("instruction", "content").await;
        assert!(matches!(result, Err(FormattingError::NoApiKey)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_request_failure() {
        let formatter = GeminiFormatter::new(Some("test-key".to_string()), DEFAULT_MODEL)
            .with_base_url("http://127.0.0.1:1/v1beta/models");
        let result = formatter.format("instruction", "content").await;
        assert!(matches!(result, Err(FormattingError::RequestFailed(_))));
    }
}
