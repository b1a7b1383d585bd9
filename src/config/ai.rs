// src/config/ai.rs
//! Completion provider config, loaded from `config/ai.json`.

use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";

fn default_daily_limit() -> u32 {
    20
}
fn default_timeout_ms() -> u64 {
    8_000
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// "openai" (case-insensitive); anything else disables generation.
    #[serde(default)]
    pub provider: String,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Hard ceiling for one completion request.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: String::new(),
            daily_limit: default_daily_limit(),
            api_key: default_api_key(),
            model: default_model(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: AiConfig = serde_json::from_str(data)?;

        // Normalize provider
        cfg.provider = cfg.provider.trim().to_lowercase();

        // Resolve api key if "ENV"
        if cfg.enabled && cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY")
                    .map_err(|_| anyhow::anyhow!("Missing OPENAI_API_KEY env var"))?,
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if cfg.timeout_ms == 0 {
            cfg.timeout_ms = default_timeout_ms();
        }

        Ok(cfg)
    }

    /// Like `load_from_file`, but any read/parse problem yields the disabled default.
    pub fn load_or_disabled<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::debug!(target: "ai", error = %e, "ai config unavailable, generation disabled");
                Self::default()
            }
        }
    }
}
