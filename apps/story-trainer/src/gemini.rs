//! Blocking client for the Gemini `generateContent` REST API.

use crate::config::AiConfig;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::thread::sleep;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_RETRIES: usize = 2;
const BASE_BACKOFF_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("generative API not configured: set {0}")]
    NotConfigured(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("response contained no text")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn first_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

pub struct GeminiClient {
    client: Client,
    api_key: Option<String>,
    api_key_env: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    /// Build a client reading the API key from the variable named in config.
    pub fn from_config(config: &AiConfig) -> Self {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty());
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            api_key_env: config.api_key_env.clone(),
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    /// Send a single-turn prompt and return the generated text.
    pub fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::NotConfigured(self.api_key_env.clone()))?;

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let payload = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let mut attempt = 0;
        loop {
            let result = self
                .client
                .post(&url)
                .header("x-goog-api-key", api_key)
                .json(&payload)
                .send();

            let err = match result {
                Ok(resp) if resp.status().is_success() => {
                    let bytes = resp.bytes()?;
                    let parsed: GenerateResponse = serde_json::from_slice(&bytes)?;
                    debug!(model = %self.model, "generation succeeded");
                    return first_text(parsed).ok_or(AiError::Empty);
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().unwrap_or_default();
                    if !is_retryable(status) {
                        return Err(AiError::HttpStatus { status, body });
                    }
                    AiError::HttpStatus { status, body }
                }
                Err(e) => AiError::Request(e),
            };

            if attempt >= MAX_RETRIES {
                return Err(err);
            }
            warn!(attempt, error = %err, "generation failed, retrying");
            sleep(Duration::from_millis(BASE_BACKOFF_MS << attempt));
            attempt += 1;
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}
