//! [`ChatBackend`], a [`TextBackend`] over `POST {base_url}/chat/completions`.

use std::time::Duration;

use diag_core::generate::{BackendError, TextBackend};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Message<'a> {
  role:    &'a str,
  content: &'a str,
}

#[derive(Serialize)]
struct Payload<'a> {
  model:    &'a str,
  messages: [Message<'a>; 1],
}

#[derive(Deserialize)]
struct ChatResponse {
  #[serde(default)]
  choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
  message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
  content: Option<String>,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

/// One model on one chat-completions endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based, so a
/// primary and a fallback built with [`ChatBackend::with_model`] share one
/// connection pool.
#[derive(Clone)]
pub struct ChatBackend {
  client:   Client,
  base_url: String,
  api_key:  String,
  model:    String,
}

impl ChatBackend {
  /// `timeout` of `None` leaves the transport's default (no deadline).
  pub fn new(
    base_url: impl Into<String>,
    api_key: impl Into<String>,
    model: impl Into<String>,
    timeout: Option<Duration>,
  ) -> Result<Self> {
    let api_key = api_key.into();
    if api_key.trim().is_empty() {
      return Err(Error::MissingApiKey);
    }

    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }

    Ok(Self {
      client: builder.build()?,
      base_url: base_url.into(),
      api_key,
      model: model.into(),
    })
  }

  /// The same endpoint and credentials, talking to a different model.
  pub fn with_model(&self, model: impl Into<String>) -> Self {
    Self {
      model: model.into(),
      ..self.clone()
    }
  }

  fn url(&self) -> String {
    format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
  }
}

fn transport_error(e: reqwest::Error) -> BackendError {
  if e.is_timeout() {
    BackendError::Timeout
  } else {
    BackendError::Transport(e.to_string())
  }
}

impl TextBackend for ChatBackend {
  fn name(&self) -> &str { &self.model }

  async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
    let payload = Payload {
      model:    &self.model,
      messages: [Message {
        role:    "user",
        content: prompt,
      }],
    };

    tracing::debug!(model = %self.model, "requesting chat completion");
    let resp = self
      .client
      .post(self.url())
      .bearer_auth(&self.api_key)
      .json(&payload)
      .send()
      .await
      .map_err(transport_error)?;

    let status = resp.status();
    if !status.is_success() {
      let message = resp.text().await.unwrap_or_default();
      return Err(if status == StatusCode::TOO_MANY_REQUESTS {
        BackendError::Quota(message)
      } else {
        BackendError::Api {
          status: status.as_u16(),
          message,
        }
      });
    }

    let body: ChatResponse = resp.json().await.map_err(transport_error)?;
    body
      .choices
      .into_iter()
      .next()
      .and_then(|c| c.message.content)
      .map(|text| text.trim().to_owned())
      .filter(|text| !text.is_empty())
      .ok_or(BackendError::EmptyResponse)
  }
}
