// Gemini generateContent wire types and the gateway reply

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// `finishReason` value signalling output-length truncation.
pub const FINISH_MAX_TOKENS: &str = "MAX_TOKENS";

/// Sampling and budget knobs, fixed per call site.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub top_p: f64,
    /// Wall-clock budget for the whole call; the request is aborted when it
    /// elapses.
    pub timeout: Duration,
}

impl GenerationOptions {
    /// Debater turns: creative but bounded, generous token budget for
    /// models that spend tokens on hidden deliberation.
    pub fn turn() -> Self {
        Self {
            temperature: 0.7,
            max_output_tokens: 1500,
            top_p: 0.9,
            timeout: Duration::from_secs(25),
        }
    }

    /// Stance derivation: near-deterministic, tiny output.
    pub fn stances() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: 400,
            top_p: 0.9,
            timeout: Duration::from_secs(20),
        }
    }

    /// Moderator summary and evaluation calls.
    pub fn moderator() -> Self {
        Self {
            temperature: 0.5,
            max_output_tokens: 1000,
            top_p: 0.9,
            timeout: Duration::from_secs(25),
        }
    }
}

/// Normalized gateway outcome. `ok` is true only for a 2xx response that
/// produced a non-empty candidate list; `cancelled` marks timeout or a
/// fired cancellation token, which callers treat as benign.
#[derive(Debug, Clone)]
pub struct GenerateReply {
    pub ok: bool,
    pub status: u16,
    pub text: String,
    pub finish_reason: Option<String>,
    pub cancelled: bool,
    /// Upstream body (or transport error description) for diagnostics.
    pub raw: Value,
}

impl GenerateReply {
    pub fn cancelled() -> Self {
        Self {
            ok: false,
            status: 0,
            text: String::new(),
            finish_reason: None,
            cancelled: true,
            raw: Value::Null,
        }
    }

    pub fn transport_failure(detail: String) -> Self {
        Self {
            ok: false,
            status: 0,
            text: String::new(),
            finish_reason: None,
            cancelled: false,
            raw: serde_json::json!({ "error": detail }),
        }
    }

    /// Truncated by the output-token limit but carrying partial text.
    pub fn truncated(&self) -> bool {
        self.finish_reason.as_deref() == Some(FINISH_MAX_TOKENS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GeminiGenerationConfig,
}

impl GeminiRequest {
    pub fn from_prompt(prompt: &str, options: &GenerationOptions) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                top_p: options.top_p,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeminiGenerationConfig {
    pub temperature: f64,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
    #[serde(rename = "topP")]
    pub top_p: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
    #[serde(rename = "safetyRatings")]
    #[serde(default)]
    pub safety_ratings: Vec<GeminiSafetyRating>,
}

impl GeminiCandidate {
    /// First part's text, the way the upstream contract nests it.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_ref()
            .and_then(|content| content.parts.first())
            .map(|part| part.text.as_str())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiSafetyRating {
    pub category: String,
    pub probability: String,
}
