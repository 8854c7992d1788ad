/*!
common/src/lib.rs

Shared configuration types for newscast.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default + override merging
- Validation of the values the service cannot run without
*/

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// HTTP server section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Directory served at `/` (landing page). Ignored if missing on disk.
    pub static_dir: Option<String>,
    /// Value of the `Access-Control-Allow-Origin` header.
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: Some("static".to_string()),
            allowed_origin: "*".to_string(),
        }
    }
}

/// Feed list and rendering of the aggregated headline string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    /// Feed URLs, in display order
    pub urls: Vec<String>,
    pub separator: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            separator: "   |   ".to_string(),
        }
    }
}

/// Refresh scheduling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub interval_seconds: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 600,
        }
    }
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

/// Per-feed HTTP fetching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 5,
            user_agent: concat!("newscast/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Text-to-speech backend selection and limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// "google-translate" (keyless) or "google-cloud"
    pub backend: String,
    pub language: String,
    pub slow: bool,
    /// Host of the translate_tts endpoint
    pub host: String,
    /// Endpoint of the Cloud Text-to-Speech `text:synthesize` call
    pub api_url: Option<String>,
    /// Environment variable holding the Cloud API key
    pub api_key_env: Option<String>,
    pub voice_name: Option<String>,
    pub max_chunk_bytes: usize,
    /// Maximum number of chunk requests in flight
    pub concurrency: usize,
    /// Redirect to a backend-hosted URL instead of streaming, when possible
    pub redirect: bool,
    pub timeout_seconds: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            backend: "google-translate".to_string(),
            language: "ko".to_string(),
            slow: false,
            host: "https://translate.google.com".to_string(),
            api_url: None,
            api_key_env: None,
            voice_name: None,
            max_chunk_bytes: 4500,
            concurrency: 4,
            redirect: false,
            timeout_seconds: 15,
        }
    }
}

/// Placeholder texts shown while no good snapshot is available
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MessagesConfig {
    pub loading: String,
    pub failed: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            loading: "news loading…".to_string(),
            failed: "news loading failed".to_string(),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub feeds: FeedsConfig,
    pub scheduler: SchedulerConfig,
    pub fetch: FetchConfig,
    pub tts: TtsConfig,
    pub messages: MessagesConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        for raw in &self.feeds.urls {
            let parsed = url::Url::parse(raw).with_context(|| format!("Invalid feed URL: {}", raw))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                bail!("Unsupported feed URL scheme '{}': {}", parsed.scheme(), raw);
            }
        }
        if self.scheduler.interval_seconds == 0 {
            bail!("scheduler.interval_seconds must be greater than zero");
        }
        // One UTF-8 character can take 4 bytes and is never split
        if self.tts.max_chunk_bytes < 4 {
            bail!("tts.max_chunk_bytes must be at least 4");
        }
        if self.tts.concurrency == 0 {
            bail!("tts.concurrency must be greater than zero");
        }
        Ok(())
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
