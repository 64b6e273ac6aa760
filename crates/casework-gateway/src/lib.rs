//! Chat-completions adapter for the case-generation gateway.
//!
//! Talks to any OpenAI-compatible `/chat/completions` endpoint and maps its
//! failures onto [`GenerationError`].

use std::time::Duration;

use casework_core::{
  GenerationError,
  gateway::{GenerationGateway, GenerationRequest},
};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Error)]
pub enum Error {
  #[error("failed to build HTTP client: {0}")]
  Client(#[from] reqwest::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Connection settings for the generation service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
  #[serde(default = "default_endpoint")]
  pub endpoint:     String,
  #[serde(default)]
  pub api_key:      String,
  #[serde(default = "default_model")]
  pub model:        String,
  /// Transport-level timeout. The coordinator applies its own deadline on
  /// top of this one.
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_endpoint() -> String { DEFAULT_ENDPOINT.to_owned() }
fn default_model() -> String { DEFAULT_MODEL.to_owned() }
fn default_timeout_secs() -> u64 { 90 }

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      endpoint:     default_endpoint(),
      api_key:      String::new(),
      model:        default_model(),
      timeout_secs: default_timeout_secs(),
    }
  }
}

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  model:    &'a str,
  messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  role:    &'static str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
  message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
  #[serde(default)]
  content: Option<String>,
}

impl ChatResponse {
  /// Text of the first choice, if it has any.
  fn into_text(self) -> Result<String, GenerationError> {
    self
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .filter(|text| !text.trim().is_empty())
      .ok_or(GenerationError::EmptyResponse)
  }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// [`GenerationGateway`] over an OpenAI-compatible HTTP API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct OpenAiGateway {
  client:  Client,
  config:  GatewayConfig,
  timeout: Duration,
}

impl OpenAiGateway {
  pub fn new(config: GatewayConfig) -> Result<Self> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self { client, config, timeout })
  }

  pub fn model(&self) -> &str { &self.config.model }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
  }

  fn transport_error(&self, e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
      GenerationError::Timeout(self.timeout)
    } else {
      GenerationError::Upstream(e.to_string())
    }
  }
}

fn status_error(status: StatusCode, body: &str) -> GenerationError {
  let reason = match status {
    StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => "authentication rejected",
    StatusCode::TOO_MANY_REQUESTS => "rate limited",
    StatusCode::NOT_FOUND => "model or endpoint not found",
    _ => "request failed",
  };
  GenerationError::Upstream(format!("HTTP {status}: {reason}: {}", body.trim()))
}

impl GenerationGateway for OpenAiGateway {
  async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
    let body = ChatRequest {
      model:    &self.config.model,
      messages: [
        ChatMessage { role: "system", content: &request.system_instruction },
        ChatMessage { role: "user", content: &request.user_prompt },
      ],
    };

    let resp = self
      .client
      .post(self.url())
      .bearer_auth(&self.config.api_key)
      .json(&body)
      .send()
      .await
      .map_err(|e| self.transport_error(e))?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp.text().await.unwrap_or_default();
      return Err(status_error(status, &text));
    }

    let parsed: ChatResponse = resp
      .json()
      .await
      .map_err(|e| GenerationError::Upstream(format!("malformed response: {e}")))?;
    let text = parsed.into_text()?;
    debug!(model = %self.config.model, chars = text.len(), "generation complete");
    Ok(text)
  }
}
