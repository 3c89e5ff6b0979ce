// Request metrics
// JSONL logging of per-request outcomes, one file per day

mod logger;
mod types;

pub use logger::MetricsLogger;
pub use types::RequestMetric;
