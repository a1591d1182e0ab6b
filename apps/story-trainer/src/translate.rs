//! English/Korean translation backends.

use crate::gemini::{AiError, GeminiClient};
use reqwest::blocking::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const WEB_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    En,
    Ko,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ko => "ko",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Ko => "Korean",
        }
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error("translation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected translation response: {0}")]
    Parse(String),
    #[error("no translator available")]
    Unavailable,
}

pub trait Translator {
    fn translate(&self, text: &str, from: Lang, to: Lang) -> Result<String, TranslateError>;
}

/// Translate, returning `text` unchanged on any failure.
pub fn translate_or_original(translator: &dyn Translator, text: &str, from: Lang, to: Lang) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }
    match translator.translate(text, from, to) {
        Ok(translated) if !translated.trim().is_empty() => translated,
        Ok(_) => {
            warn!(from = from.code(), to = to.code(), "empty translation, keeping original");
            text.to_string()
        }
        Err(err) => {
            warn!(from = from.code(), to = to.code(), error = %err, "translation failed, keeping original");
            text.to_string()
        }
    }
}

/// Translation through the generative model.
pub struct GeminiTranslator<'a> {
    client: &'a GeminiClient,
}

impl<'a> GeminiTranslator<'a> {
    pub fn new(client: &'a GeminiClient) -> Self {
        Self { client }
    }
}

impl Translator for GeminiTranslator<'_> {
    fn translate(&self, text: &str, from: Lang, to: Lang) -> Result<String, TranslateError> {
        let prompt = format!(
            "Translate the following {} text into natural {} suitable for young children. \
             Reply with the translation only.\n\n{}",
            from.name(),
            to.name(),
            text
        );
        Ok(self.client.generate(&prompt)?)
    }
}

/// The public Google Translate web endpoint.
pub struct WebTranslator {
    client: Client,
    endpoint: String,
}

impl WebTranslator {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: WEB_ENDPOINT.to_string(),
        }
    }
}

impl Translator for WebTranslator {
    fn translate(&self, text: &str, from: Lang, to: Lang) -> Result<String, TranslateError> {
        let body: serde_json::Value = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", from.code()),
                ("tl", to.code()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        parse_web_response(&body)
    }
}

/// Join the translated segments of a `translate_a/single` response.
///
/// The payload is positional: `[[["<translated>", "<source>", ...], ...], ...]`.
fn parse_web_response(body: &serde_json::Value) -> Result<String, TranslateError> {
    let segments = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslateError::Parse("missing segment list".to_string()))?;

    let text: String = segments
        .iter()
        .filter_map(|seg| seg.get(0).and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(TranslateError::Parse("no translated text".to_string()));
    }
    Ok(text.trim().to_string())
}

/// Tries each translator in order; the first success wins.
pub struct ChainTranslator<'a> {
    translators: Vec<Box<dyn Translator + 'a>>,
}

impl<'a> ChainTranslator<'a> {
    pub fn new() -> Self {
        Self {
            translators: Vec::new(),
        }
    }

    pub fn with(mut self, translator: impl Translator + 'a) -> Self {
        self.translators.push(Box::new(translator));
        self
    }

    /// Generative model first when configured, then the web endpoint.
    pub fn standard(client: &'a GeminiClient, timeout: Duration) -> Self {
        let chain = Self::new();
        let chain = if client.is_available() {
            chain.with(GeminiTranslator::new(client))
        } else {
            chain
        };
        chain.with(WebTranslator::new(timeout))
    }
}

impl Default for ChainTranslator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator for ChainTranslator<'_> {
    fn translate(&self, text: &str, from: Lang, to: Lang) -> Result<String, TranslateError> {
        let mut last_err = TranslateError::Unavailable;
        for (i, translator) in self.translators.iter().enumerate() {
            match translator.translate(text, from, to) {
                Ok(result) => return Ok(result),
                Err(err) => {
                    debug!(backend = i, error = %err, "translator failed, trying next");
                    last_err = err;
                }
            }
        }
        Err(last_err)
    }
}
