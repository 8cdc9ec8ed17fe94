//! Game Backend HTTP Client
//!
//! Talks to the game backend that fronts the language models and the image
//! generator:
//!
//! - `POST /analyze-image` (form: `objectName`, `image_url`, `model_type`)
//! - `POST /generate-image` (form: `prompt`)
//! - `POST /clear-images`
//! - `POST /translate` (JSON: `text`, `model_type`)
//!
//! Every response uses the same `{ code, message, data }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::traits::{ClearClient, ImageGenClient, ModelChoice, PromptClient, TranslateClient};
use crate::catalog::SubjectEntry;
use crate::error::GameError;
use crate::round::ImageReference;

/// Default request timeout; image synthesis is slow
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Use the configured client, or a plain one if it could not be built
pub(crate) fn client_or_fallback(built: reqwest::Result<Client>, service: &str) -> Client {
    built.unwrap_or_else(|e| {
        tracing::warn!(
            error = %e,
            service,
            "Failed to build HTTP client, falling back to one without a timeout"
        );
        Client::new()
    })
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: Option<i64>,
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct PromptData {
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    image_url: String,
}

#[derive(Debug, Deserialize)]
struct TranslationData {
    translation: String,
}

/// Decode a response envelope
///
/// Success requires a 2xx status and a `code` that is either absent or 200.
/// Any other outcome is turned into an error through `fail`.
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    fail: fn(String) -> GameError,
) -> Result<Option<T>, GameError> {
    let envelope: Envelope<T> = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) if status.is_success() => return Err(fail(format!("malformed response: {e}"))),
        Err(_) => return Err(fail(format!("backend returned {status}"))),
    };

    match envelope.code {
        Some(code) if code != 200 => Err(fail(
            envelope
                .message
                .unwrap_or_else(|| format!("backend returned code {code}")),
        )),
        _ if !status.is_success() => Err(fail(
            envelope
                .message
                .unwrap_or_else(|| format!("backend returned {status}")),
        )),
        _ => Ok(envelope.data),
    }
}

/// HTTP client for the game backend
#[derive(Clone, Debug)]
pub struct HttpGameBackend {
    client: Client,
    base_url: String,
}

impl HttpGameBackend {
    /// Create a client for `base_url` with the given request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = client_or_fallback(
            Client::builder().timeout(timeout).build(),
            "game backend",
        );

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Backend-relative image paths are resolved against the base URL
    fn resolve_image_url(&self, url: &str) -> String {
        if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            url.to_string()
        }
    }

    async fn read(
        response: Result<reqwest::Response, reqwest::Error>,
        fail: fn(String) -> GameError,
    ) -> Result<(StatusCode, String), GameError> {
        let response = response.map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| fail(e.to_string()))?;
        Ok((status, body))
    }
}

#[async_trait]
impl PromptClient for HttpGameBackend {
    async fn derive(
        &self,
        subject: &SubjectEntry,
        image: &ImageReference,
        model: ModelChoice,
    ) -> Result<String, GameError> {
        let form = [
            ("objectName", subject.id.as_str()),
            ("image_url", image.url.as_str()),
            ("model_type", model.wire_name()),
        ];
        let response = self
            .client
            .post(self.endpoint("analyze-image"))
            .form(&form)
            .send()
            .await;
        let (status, body) = Self::read(response, GameError::DerivationFailed).await?;

        let data: Option<PromptData> =
            decode_envelope(status, &body, GameError::DerivationFailed)?;
        let prompt = data.map(|d| d.prompt.trim().to_string()).unwrap_or_default();
        if prompt.is_empty() {
            return Err(GameError::DerivationFailed("empty prompt".into()));
        }
        Ok(prompt)
    }
}

#[async_trait]
impl ImageGenClient for HttpGameBackend {
    async fn synthesize(&self, prompt: &str) -> Result<ImageReference, GameError> {
        let response = self
            .client
            .post(self.endpoint("generate-image"))
            .form(&[("prompt", prompt)])
            .send()
            .await;
        let (status, body) = Self::read(response, GameError::SynthesisFailed).await?;

        let data: Option<ImageData> = decode_envelope(status, &body, GameError::SynthesisFailed)?;
        match data {
            Some(d) if !d.image_url.is_empty() => {
                Ok(ImageReference::new(self.resolve_image_url(&d.image_url)))
            }
            _ => Err(GameError::SynthesisFailed("no image url in response".into())),
        }
    }
}

#[async_trait]
impl ClearClient for HttpGameBackend {
    async fn purge(&self) -> Result<(), GameError> {
        let response = self
            .client
            .post(self.endpoint("clear-images"))
            .send()
            .await;
        let (status, body) = Self::read(response, GameError::PurgeFailed).await?;
        decode_envelope::<serde_json::Value>(status, &body, GameError::PurgeFailed)?;
        Ok(())
    }
}

#[async_trait]
impl TranslateClient for HttpGameBackend {
    async fn translate(&self, text: &str, model: ModelChoice) -> Result<String, GameError> {
        let response = self
            .client
            .post(self.endpoint("translate"))
            .json(&serde_json::json!({
                "text": text,
                "model_type": model.wire_name(),
            }))
            .send()
            .await;
        let (status, body) = Self::read(response, GameError::DerivationFailed).await?;

        let data: Option<TranslationData> =
            decode_envelope(status, &body, GameError::DerivationFailed)?;
        data.map(|d| d.translation)
            .ok_or_else(|| GameError::DerivationFailed("no translation in response".into()))
    }
}
