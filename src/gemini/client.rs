// HTTP client for the Gemini generateContent API

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::types::{GeminiResponse, GenerateReply, GenerationOptions, GeminiRequest};
use super::TextGenerator;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

// Outer bound on any single request; per-call budgets are tighter and
// enforced separately.
const CLIENT_TIMEOUT_SECS: u64 = 60;

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(CLIENT_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the endpoint base URL. Used by tests to point at a mock
    /// server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The raw request/response exchange; the `TextGenerator` impl folds
    /// its errors into a `GenerateReply`.
    async fn send_once(&self, prompt: &str, options: &GenerationOptions) -> Result<GenerateReply> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GeminiRequest::from_prompt(prompt, options);

        tracing::debug!(model = %self.model, prompt_chars = prompt.chars().count(), "sending generation request");

        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status().as_u16();
        let raw: Value = response
            .json()
            .await
            .context("Failed to read Gemini API response body")?;

        if !(200..300).contains(&status) {
            tracing::error!(status, body = %raw, "Gemini API error");
            return Ok(GenerateReply {
                ok: false,
                status,
                text: String::new(),
                finish_reason: None,
                cancelled: false,
                raw,
            });
        }

        let parsed: GeminiResponse =
            serde_json::from_value(raw.clone()).context("Failed to parse Gemini API response")?;

        let Some(candidate) = parsed.candidates.first() else {
            tracing::error!(body = %raw, "no candidates in Gemini response");
            return Ok(GenerateReply {
                ok: false,
                status,
                text: String::new(),
                finish_reason: None,
                cancelled: false,
                raw,
            });
        };

        // Safety filter hits are logged but not treated as failure; the
        // caller decides based on the extracted text.
        if candidate
            .safety_ratings
            .iter()
            .any(|rating| rating.probability == "HIGH" || rating.probability == "MEDIUM")
        {
            tracing::warn!("content flagged by safety filter: {:?}", candidate.safety_ratings);
        }

        let finish_reason = candidate.finish_reason.clone();
        let text = candidate.text().unwrap_or_default().to_string();

        Ok(GenerateReply {
            ok: !text.is_empty(),
            status,
            text,
            finish_reason,
            cancelled: false,
            raw,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> GenerateReply {
        let call = tokio::time::timeout(options.timeout, self.send_once(prompt, options));

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("generation cancelled by caller");
                GenerateReply::cancelled()
            }
            outcome = call => match outcome {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => {
                    tracing::error!("Gemini request failed: {:#}", e);
                    GenerateReply::transport_failure(format!("{e:#}"))
                }
                Err(_) => {
                    tracing::warn!(timeout_secs = options.timeout.as_secs(), "generation timed out");
                    GenerateReply::cancelled()
                }
            },
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}
