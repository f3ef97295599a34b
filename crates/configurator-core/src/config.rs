//! Configuration system for the configurator SDK.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Configuration validation failed:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),
}

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine connection settings
    pub engine: EngineConfig,
    /// Session lifetime back-end
    pub lifetime: LifetimeConfig,
    /// Retry behaviour for transient failures
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL of the engine API
    pub base_url: String,
    /// API key (can be set directly or via environment)
    pub api_key: Option<String>,
    /// Environment variable name for the API key
    pub api_key_env: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Header carrying the session id on session-scoped calls
    pub session_id_header: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://engine.configurator.cloud/api/v2".to_string(),
            api_key: None,
            api_key_env: Some("CONFIGURATOR_API_KEY".to_string()),
            timeout_secs: 30,
            session_id_header: "X-Session-Id".to_string(),
        }
    }
}

impl EngineConfig {
    /// Resolve the API key from either direct value or environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }
        if let Some(ref env_var) = self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Some(key);
            }
        }
        None
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Who creates and closes sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifetimeMode {
    /// The SDK holds an API key and talks to the engine directly.
    #[default]
    ApiKey,
    /// A caller-owned back-end creates and closes sessions.
    Delegated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LifetimeConfig {
    pub mode: LifetimeMode,
    /// Endpoint creating a session (delegated mode)
    pub create_session_url: Option<String>,
    /// Endpoint closing a session (delegated mode)
    pub close_session_url: Option<String>,
}

/// Retry configuration for unauthenticated and timed-out operations.
///
/// Delays grow exponentially from `base_delay_ms` and are capped at
/// `max_delay_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    /// Delay before the retry following the given zero-based failed attempt.
    ///
    /// Delay = min(base * 2^attempt, max)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.base_delay_ms.saturating_mul(1 << attempt.min(10));
        Duration::from_millis(base_delay.min(self.max_delay_ms))
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Field path (e.g., "retry.max_attempts")
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Layered sources: defaults, user file, project file, local file, env.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(Self::config_dir().join("config.toml")))
            .merge(Toml::file(".configurator/config.toml"))
            // gitignored overrides
            .merge(Toml::file(".configurator/config.local.toml"))
            .merge(Env::prefixed("CONFIGURATOR_").split("__"))
    }

    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let config = Self::load()?;
        config.into_validated()
    }

    /// Fail on validation errors, log warnings.
    pub fn into_validated(self) -> Result<Self, ConfigError> {
        let result = self.validate();

        if !result.is_ok() {
            let errors = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(ConfigError::Invalid(errors));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_http_url(&self.engine.base_url) {
            result.add_error("engine.base_url", "base_url must start with http:// or https://");
        }

        if self.engine.timeout_secs == 0 {
            result.add_error("engine.timeout_secs", "timeout_secs must be greater than 0");
        }

        if self.engine.session_id_header.trim().is_empty() {
            result.add_error("engine.session_id_header", "session_id_header cannot be empty");
        }

        if self.engine.api_key.as_ref().is_some_and(|k| k.is_empty()) {
            result.add_warning("engine.api_key", "API key is empty string");
        }

        match self.lifetime.mode {
            LifetimeMode::ApiKey => {
                if self.engine.api_key.is_none() && self.engine.api_key_env.is_none() {
                    result.add_warning(
                        "engine.api_key",
                        "no API key or api_key_env configured for api_key lifetime mode",
                    );
                }
            }
            LifetimeMode::Delegated => {
                for (field, url) in [
                    ("lifetime.create_session_url", &self.lifetime.create_session_url),
                    ("lifetime.close_session_url", &self.lifetime.close_session_url),
                ] {
                    match url {
                        None => result.add_error(field, "required in delegated lifetime mode"),
                        Some(url) if !is_http_url(url) => {
                            result.add_error(field, "must start with http:// or https://")
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        if self.retry.max_attempts == 0 {
            result.add_error("retry.max_attempts", "max_attempts must be at least 1");
        }

        if self.retry.max_attempts > 10 {
            result.add_warning("retry.max_attempts", "max_attempts is very high (> 10)");
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            result.add_error("retry.max_delay_ms", "max_delay_ms cannot be lower than base_delay_ms");
        }

        result
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("configurator"))
            .unwrap_or_else(|| PathBuf::from("~/.config/configurator"))
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
