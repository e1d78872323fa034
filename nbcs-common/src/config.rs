//! Configuration management for nbcs services.
//!
//! The bot reads a single `config.json` from the configuration directory
//! (`NBCS_CONFIG_DIR`, defaulting to `./nbcs`). Every section is optional.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `DISCORD_TOKEN` → discord.token
//! - `DISCORD_APPLICATION_ID` → discord.application_id
//! - `DISCORD_GUILD_ID` → discord.guild_id
//! - `NBCS_DATA_DIR` → storage.data_dir
//! - `NBCS_LOG_LEVEL` → observability.log_level
//! - `NBCS_LOG_FORMAT` → observability.log_format
//! - `API_BASE_URL` → ai.base_url
//! - `NBCS_DEFAULT_SYSTEM_PROMPT` → ai.default_system_prompt

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder token written by setup templates; never a valid token.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_BOT_TOKEN_HERE";

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    std::env::var("NBCS_CONFIG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("nbcs"))
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ai: AiDefaultsConfig,

    #[serde(default)]
    pub presentation: PresentationConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ============================================================================
// Discord
// ============================================================================

/// Discord bot credentials and registration scope.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Bot token
    #[serde(default)]
    pub token: Option<String>,

    /// Application (client) ID used for command registration and webhooks
    #[serde(default)]
    pub application_id: Option<String>,

    /// Register commands in a single guild instead of globally
    #[serde(default)]
    pub guild_id: Option<String>,
}

// ============================================================================
// Storage
// ============================================================================

/// Where per-user settings files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn system_prompts_path(&self) -> PathBuf {
        self.data_dir.join("system_prompts.json")
    }

    pub fn ai_config_path(&self) -> PathBuf {
        self.data_dir.join("ai_config.json")
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("nbcs")
}

// ============================================================================
// AI Defaults
// ============================================================================

/// Process-wide defaults applied to any per-user AI setting left unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiDefaultsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub stream: bool,

    /// System prompt used when a user has not set their own
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,

    /// Timeout for a single completion request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for AiDefaultsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            stream: false,
            default_system_prompt: default_system_prompt(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}

fn default_model() -> String {
    "google/gemini-2.0-flash-001".into()
}

fn default_temperature() -> f64 {
    1.0
}

fn default_top_p() -> f64 {
    0.9
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_system_prompt() -> String {
    "You are a helpful assistant.".into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

// ============================================================================
// Presentation
// ============================================================================

/// How streamed replies are surfaced while they are still arriving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamPreview {
    /// Edit the pending reply with partial text, at most once per interval
    Throttled,
    /// Stay silent until the stream drains, then send everything
    #[default]
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    #[serde(default)]
    pub stream_preview: StreamPreview,

    /// Minimum time between preview edits in throttled mode
    #[serde(default = "default_preview_interval_ms")]
    pub preview_interval_ms: u64,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            stream_preview: StreamPreview::default(),
            preview_interval_ms: default_preview_interval_ms(),
        }
    }
}

fn default_preview_interval_ms() -> u64 {
    1000
}

// ============================================================================
// Observability
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("DISCORD_TOKEN") {
            self.discord.token = Some(token);
        }
        if let Some(app_id) = non_empty("DISCORD_APPLICATION_ID") {
            self.discord.application_id = Some(app_id);
        }
        if let Some(guild_id) = non_empty("DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(guild_id);
        }
        if let Some(dir) = non_empty("NBCS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = non_empty("NBCS_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = non_empty("NBCS_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(base_url) = non_empty("API_BASE_URL") {
            self.ai.base_url = base_url;
        }
        if let Some(prompt) = non_empty("NBCS_DEFAULT_SYSTEM_PROMPT") {
            self.ai.default_system_prompt = prompt;
        }
    }

    /// Discord token, ignoring the template placeholder.
    pub fn discord_token(&self) -> Option<&str> {
        self.discord
            .token
            .as_deref()
            .filter(|t| !t.is_empty() && *t != PLACEHOLDER_TOKEN)
    }
}
