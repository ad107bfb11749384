//! Minimal Gemini client for our use-cases.
//!
//! We only call `models/{model}:generateContent` with a single user text part and
//! read back the first candidate's text. Calls are instrumented and log the model,
//! latency and response size (not contents).
//!
//! NOTE: the API key travels as a query parameter; it is never logged.

use std::time::{Duration, Instant};

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::util::trunc_for_log;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("request to Gemini failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("Gemini HTTP {status}: {message}")]
  Upstream { status: u16, message: String },
  #[error("Gemini returned no text ({0})")]
  EmptyResponse(String),
  #[error("could not parse model output: {0}")]
  Parse(String),
}

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  api_key: String,
  pub base_url: String,
  pub model: String,
}

impl std::fmt::Debug for Gemini {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Gemini").field("base_url", &self.base_url).field("model", &self.model).finish_non_exhaustive()
  }
}

impl Gemini {
  pub fn new(api_key: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Option<Self> {
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .ok()?;
    let base_url = base_url.into().trim_end_matches('/').to_string();
    Some(Self { client, api_key: api_key.into(), base_url, model: model.into() })
  }

  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url = std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
    Self::new(api_key, base_url, model)
  }

  /// Plain-text completion: one prompt in, the first candidate's text out.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  pub async fn generate_text(&self, prompt: &str) -> Result<String, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let req = GenerateContentRequest {
      contents: vec![Content { parts: vec![Part { text: prompt.to_string() }] }],
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .query(&[("key", self.api_key.as_str())])
      .header(USER_AGENT, "edubot-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req).send().await
      .map_err(|e| {
        // reqwest errors include the URL, which carries the key.
        let e = e.without_url();
        error!(target: "gemini", error = %e, "Gemini request could not be sent");
        GenerationError::Transport(e)
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      error!(target: "gemini", status = status.as_u16(), body = %trunc_for_log(&body, 600), "Gemini API error");
      let message = extract_gemini_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(GenerationError::Upstream { status: status.as_u16(), message });
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| GenerationError::Transport(e.without_url()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(target: "gemini", prompt_tokens = ?usage.prompt_token_count, completion_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }

    let text = body.first_text().ok_or_else(|| {
      let reason = body
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
        .or_else(|| body.candidates.first().and_then(|c| c.finish_reason.clone()))
        .unwrap_or_else(|| "no candidates".into());
      GenerationError::EmptyResponse(reason)
    })?;

    info!(target: "gemini", elapsed = ?start.elapsed(), response_len = text.len(), "Gemini response received");
    Ok(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
struct GenerateContentRequest {
  contents: Vec<Content>,
}
#[derive(Serialize, Deserialize)]
struct Content {
  #[serde(default)]
  parts: Vec<Part>,
}
#[derive(Serialize, Deserialize)]
struct Part {
  #[serde(default)]
  text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] prompt_feedback: Option<PromptFeedback>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
  fn first_text(&self) -> Option<String> {
    let content = self.candidates.first()?.content.as_ref()?;
    let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
    if text.trim().is_empty() { None } else { Some(text) }
  }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<Content>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
  #[serde(default)] block_reason: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}

/// Try to extract a clean error message from a Gemini error body.
fn extract_gemini_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
