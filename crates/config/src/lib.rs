//! Configuration loading, validation, and management for Waypost.
//!
//! Loads configuration from `waypost.toml` (working directory or
//! `~/.waypost/`) with environment variable overrides. Validates all
//! settings at startup: a bad threshold should fail the process, not a
//! chat turn.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `waypost.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_chat_model")]
    pub chat_model: String,

    /// Default embedding model
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Default temperature for generation
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Tier routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Session store configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Summarizer and suggester configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_chat_model() -> String {
    "gpt-4o-mini".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_temperature() -> f32 {
    0.7
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("default_temperature", &self.default_temperature)
            .field("routing", &self.routing)
            .field("session", &self.session)
            .field("engine", &self.engine)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

/// Tier routing thresholds and bounds.
///
/// Confidence calibration is corpus-dependent, so every threshold here
/// is externally tunable without a code change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Minimum top similarity for the FAQ tier (T)
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,

    /// Top similarity at which the stored answer is returned verbatim,
    /// skipping generation entirely (T_fast)
    #[serde(default = "default_fast_path_threshold")]
    pub fast_path_threshold: f32,

    /// How many knowledge matches to retrieve per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Character budget for assembled prompt context
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// How many recent turns of history feed the prompt
    #[serde(default = "default_history_turns")]
    pub history_turns: usize,

    /// The marker the general-knowledge model emits to request escalation
    #[serde(default = "default_escalation_sentinel")]
    pub escalation_sentinel: String,

    /// Timeout for a single generative-model call
    #[serde(default = "default_generate_timeout_secs")]
    pub generate_timeout_secs: u64,

    /// Timeout for embedding + index query
    #[serde(default = "default_retrieval_timeout_secs")]
    pub retrieval_timeout_secs: u64,
}

fn default_score_threshold() -> f32 {
    0.75
}
fn default_fast_path_threshold() -> f32 {
    0.90
}
fn default_top_k() -> usize {
    3
}
fn default_max_context_chars() -> usize {
    1200
}
fn default_history_turns() -> usize {
    6
}
fn default_escalation_sentinel() -> String {
    "ESCALATE_TO_HUMAN".into()
}
fn default_generate_timeout_secs() -> u64 {
    30
}
fn default_retrieval_timeout_secs() -> u64 {
    10
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            fast_path_threshold: default_fast_path_threshold(),
            top_k: default_top_k(),
            max_context_chars: default_max_context_chars(),
            history_turns: default_history_turns(),
            escalation_sentinel: default_escalation_sentinel(),
            generate_timeout_secs: default_generate_timeout_secs(),
            retrieval_timeout_secs: default_retrieval_timeout_secs(),
        }
    }
}

/// Session lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Hours of inactivity before a session expires
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,

    /// How often the background expiration sweep runs
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_ttl_hours() -> u64 {
    24
}
fn default_sweep_interval_secs() -> u64 {
    3600
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Summarizer and action-suggester bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum words in a conversation summary
    #[serde(default = "default_summary_word_limit")]
    pub summary_word_limit: usize,

    /// Maximum next-action suggestions returned
    #[serde(default = "default_suggestion_count")]
    pub suggestion_count: usize,
}

fn default_summary_word_limit() -> usize {
    200
}
fn default_suggestion_count() -> usize {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            summary_word_limit: default_summary_word_limit(),
            suggestion_count: default_suggestion_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    8087
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path.
    ///
    /// Looks for `waypost.toml` in the working directory, then in
    /// `~/.waypost/`. Environment variables override file values:
    /// - `WAYPOST_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `WAYPOST_PROVIDER`, `WAYPOST_CHAT_MODEL`, `WAYPOST_EMBEDDING_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let local = PathBuf::from("waypost.toml");
        let path = if local.exists() {
            local
        } else {
            Self::config_dir().join("waypost.toml")
        };
        let mut config = Self::load_from(&path)?;

        // Environment variable overrides (highest priority)
        if config.api_key.is_none() {
            config.api_key = std::env::var("WAYPOST_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("WAYPOST_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("WAYPOST_CHAT_MODEL") {
            config.chat_model = model;
        }

        if let Ok(model) = std::env::var("WAYPOST_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".waypost")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        let r = &self.routing;
        if !(0.0..=1.0).contains(&r.score_threshold) {
            return Err(ConfigError::ValidationError(
                "routing.score_threshold must be in [0, 1]".into(),
            ));
        }
        if !(0.0..=1.0).contains(&r.fast_path_threshold) {
            return Err(ConfigError::ValidationError(
                "routing.fast_path_threshold must be in [0, 1]".into(),
            ));
        }
        if r.fast_path_threshold < r.score_threshold {
            return Err(ConfigError::ValidationError(
                "routing.fast_path_threshold must be >= routing.score_threshold".into(),
            ));
        }
        if r.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "routing.top_k must be > 0".into(),
            ));
        }
        if r.max_context_chars == 0 {
            return Err(ConfigError::ValidationError(
                "routing.max_context_chars must be > 0".into(),
            ));
        }
        if r.escalation_sentinel.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "routing.escalation_sentinel must not be empty".into(),
            ));
        }
        if self.session.ttl_hours == 0 {
            return Err(ConfigError::ValidationError(
                "session.ttl_hours must be > 0".into(),
            ));
        }
        if self.engine.summary_word_limit == 0 {
            return Err(ConfigError::ValidationError(
                "engine.summary_word_limit must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            default_temperature: default_temperature(),
            routing: RoutingConfig::default(),
            session: SessionConfig::default(),
            engine: EngineConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
