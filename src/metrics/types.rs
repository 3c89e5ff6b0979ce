// Metric record types

use serde::{Deserialize, Serialize};

/// One handled request. Topics are stored hashed, never verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMetric {
    pub timestamp: String,
    pub endpoint: String,
    /// SHA256 of the debate topic, for correlation without content
    pub topic_hash: String,
    pub duration_ms: u64,
    /// Upstream Gemini status, 0 when no upstream call was made
    pub upstream_status: u16,
    pub ok: bool,
}
