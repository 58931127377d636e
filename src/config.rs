use crate::engine::teams::IdSpace;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

const ENV_FILE: &str = ".env";
const API_KEY_VAR: &str = "BALLDONTLIE_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Log to this file instead of stderr.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_filter() -> String {
    "statline=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Upper bound on pages followed for one season slice.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_timeout")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub id_space: IdSpace,
}

fn default_base_url() -> String { "https://api.balldontlie.io".to_string() }
fn default_per_page() -> u32 { 100 }
fn default_max_pages() -> u32 { 10 }
fn default_timeout() -> u64 { 10_000 }

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            request_timeout_ms: default_timeout(),
            id_space: IdSpace::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct WindowConfig {
    #[serde(default = "default_last_n")]
    pub default_last_n: usize,
    #[serde(default = "default_h2h_limit")]
    pub head_to_head_limit: usize,
}

fn default_last_n() -> usize { 10 }
fn default_h2h_limit() -> usize { crate::engine::HEAD_TO_HEAD_LIMIT }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_last_n: default_last_n(),
            head_to_head_limit: default_h2h_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SanitizerConfig {
    /// Extra recorded-abbreviation corrections, layered over the built-ins.
    #[serde(default)]
    pub team_aliases: HashMap<String, String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse config TOML")
    }

    /// Load the file when it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let content = match std::fs::read_to_string(Path::new(ENV_FILE)) {
            Ok(c) => c,
            Err(_) => return,
        };
        for (key, value) in parse_env(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }

    /// Game-log API key from the environment.
    pub fn api_key() -> Result<String> {
        match std::env::var(API_KEY_VAR) {
            Ok(key) if !key.trim().is_empty() => Ok(sanitize_key(&key)),
            _ => anyhow::bail!("{} is not set (environment or .env)", API_KEY_VAR),
        }
    }
}

fn parse_env(content: &str) -> Vec<(String, String)> {
    // Strip BOM if present (common on Windows-created files)
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    content
        .lines()
        .map(|line| line.trim().trim_matches('\r'))
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}
