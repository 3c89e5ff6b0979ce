// Configuration loader
// Reads ~/.podium/config.toml, then the GEMINI_API_KEY environment variable

use anyhow::{Context, Result};
use std::path::PathBuf;

use super::settings::{Config, DebateConfig, ServerConfig};

/// Load configuration from the Podium config file or environment.
///
/// A missing credential is not fatal here: the server starts and surfaces
/// the missing key as a 500 on generation endpoints, so health checks and
/// transcript reads keep working.
pub fn load_config() -> Result<Config> {
    if let Some(config) = try_load_from_file()? {
        return Ok(config);
    }

    let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        tracing::warn!(
            "no Gemini API key configured; set GEMINI_API_KEY or add api_key to {}",
            config_path().display()
        );
    }
    Ok(Config::with_api_key(api_key))
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".podium/config.toml")
}

fn try_load_from_file() -> Result<Option<Config>> {
    let path = config_path();
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    #[derive(serde::Deserialize)]
    struct TomlConfig {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        metrics_dir: Option<PathBuf>,
        #[serde(default)]
        store_path: Option<PathBuf>,
        #[serde(default)]
        server: Option<ServerConfig>,
        #[serde(default)]
        debate: Option<DebateConfig>,
    }

    let parsed: TomlConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    // Environment overrides the file for the credential, which makes
    // rotating a key in deployment a restart rather than an edit.
    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => key,
        _ => parsed.api_key,
    };

    let mut config = Config::with_api_key(api_key);
    if let Some(model) = parsed.model {
        config.model = model;
    }
    if let Some(metrics_dir) = parsed.metrics_dir {
        config.metrics_dir = metrics_dir;
    }
    if let Some(store_path) = parsed.store_path {
        config.store_path = store_path;
    }
    if let Some(server) = parsed.server {
        config.server = server;
    }
    if let Some(debate) = parsed.debate {
        config.debate = debate;
    }

    tracing::info!("loaded configuration from {}", path.display());
    Ok(Some(config))
}
