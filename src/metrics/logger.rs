// Metrics logger

use anyhow::{Context, Result};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use super::types::RequestMetric;

pub struct MetricsLogger {
    metrics_dir: PathBuf,
}

impl MetricsLogger {
    pub fn new(metrics_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&metrics_dir).with_context(|| {
            format!(
                "Failed to create metrics directory: {}",
                metrics_dir.display()
            )
        })?;

        Ok(Self { metrics_dir })
    }

    /// Log a request metric to today's JSONL file
    pub fn log(&self, metric: &RequestMetric) -> Result<()> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let log_file = self.metrics_dir.join(format!("{}.jsonl", today));

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open metrics log: {}", log_file.display()))?;

        let json = serde_json::to_string(metric).context("Failed to serialize metric")?;
        writeln!(file, "{}", json).context("Failed to write metric to log")?;

        Ok(())
    }

    /// Hash a topic for privacy (SHA256)
    pub fn hash_topic(topic: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(topic.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Read metrics for a specific date (YYYY-MM-DD)
    #[cfg(test)]
    fn read_metrics(&self, date: &str) -> Result<Vec<RequestMetric>> {
        let log_file = self.metrics_dir.join(format!("{}.jsonl", date));

        if !log_file.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&log_file)
            .with_context(|| format!("Failed to read metrics log: {}", log_file.display()))?;

        let metrics = contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();

        Ok(metrics)
    }
}
