// Configuration structs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    /// Gemini API credential. May be empty: the server still starts and
    /// every generation endpoint answers 500 until a key is configured.
    pub api_key: String,

    /// Generation model name (e.g. "gemini-2.5-flash")
    pub model: String,

    /// Directory for request-metrics JSONL files
    pub metrics_dir: PathBuf,

    /// Path to the transcript SQLite database
    pub store_path: PathBuf,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Debate pacing and budget configuration
    pub debate: DebateConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g. "127.0.0.1:8787")
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Maximum number of live debate sessions kept in memory
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Sessions idle longer than this are purged
    #[serde(default = "default_session_timeout")]
    pub session_timeout_minutes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            max_sessions: default_max_sessions(),
            session_timeout_minutes: default_session_timeout(),
        }
    }
}

/// Debate configuration. `max_turns` is the single source of truth for the
/// turn budget; per-request totals are validated against it, never trusted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_max_sessions() -> usize {
    100
}

fn default_session_timeout() -> u64 {
    30
}

fn default_max_turns() -> usize {
    4
}

impl Config {
    /// Config with data paths rooted under `~/.podium`.
    pub fn with_api_key(api_key: String) -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".podium");

        Self {
            api_key,
            model: "gemini-2.5-flash".to_string(),
            metrics_dir: data_dir.join("metrics"),
            store_path: data_dir.join("transcripts.db"),
            server: ServerConfig::default(),
            debate: DebateConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_api_key("key".to_string());
        assert_eq!(config.debate.max_turns, 4);
        assert_eq!(config.server.max_sessions, 100);
        assert_eq!(config.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_server_config_partial_toml() {
        let parsed: ServerConfig = toml::from_str("bind_address = \"0.0.0.0:9000\"").unwrap();
        assert_eq!(parsed.bind_address, "0.0.0.0:9000");
        assert_eq!(parsed.max_sessions, 100);
    }
}
