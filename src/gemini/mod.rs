// Gemini gateway — the single network boundary of the service
//
// One POST per generation, a wall-clock budget per call site, cooperative
// cancellation, no retries: retry policy belongs to callers, and the turn
// sequencer deliberately has none beyond user-triggered cancellation.

mod client;
mod types;

pub use client::GeminiClient;
pub use types::{
    GeminiCandidate, GeminiContent, GeminiPart, GeminiRequest, GeminiResponse, GenerateReply,
    GenerationOptions, FINISH_MAX_TOKENS,
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Seam between handlers and the network. Production uses `GeminiClient`;
/// tests substitute a scripted generator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Issue one generation call. Infallible by contract: transport
    /// failures, timeouts and cancellation are all folded into the reply.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> GenerateReply;

    fn model(&self) -> &str;
}
