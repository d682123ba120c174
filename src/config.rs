//! 代理配置：YAML 文件 + 环境变量覆盖
//!
//! Proxy configuration. Built-in defaults, then an optional YAML file, then
//! `TANGKHUL_*` environment overrides, then validation.

use crate::client::RetryPolicy;
use crate::drivers::ApiStyle;
use crate::error::ErrorContext;
use crate::prompts::DEFAULT_LANGUAGE;
use crate::sanitize::SanitizeOptions;
use crate::types::ProviderKind;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Upper bound on `retry.max_attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 5;
/// Upper bound on `retry.max_delay_ms`; also caps an honoured `Retry-After`.
pub const MAX_RETRY_DELAY_MS: u32 = 30_000;

/// Connection and model settings for one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_style: ApiStyle,
    pub base_url: String,
    pub chat_path: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Inline key; takes precedence over `api_key_env`. Never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn openai() -> Self {
        Self {
            api_style: ApiStyle::OpenAi,
            base_url: "https://api.openai.com/v1".to_string(),
            chat_path: "/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
        }
    }

    pub fn perplexity() -> Self {
        Self {
            api_style: ApiStyle::Perplexity,
            base_url: "https://api.perplexity.ai".to_string(),
            chat_path: "/chat/completions".to_string(),
            model: "sonar".to_string(),
            max_tokens: 500,
            temperature: 0.2,
            api_key_env: "PERPLEXITY_API_KEY".to_string(),
            api_key: None,
        }
    }

    /// Inline key if set and non-blank, else the named environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|k| !k.trim().is_empty())
            })
    }

    fn apply(&mut self, file: ProviderFile) {
        if let Some(v) = file.api_style {
            self.api_style = v;
        }
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.chat_path {
            self.chat_path = v;
        }
        if let Some(v) = file.model {
            self.model = v;
        }
        if let Some(v) = file.max_tokens {
            self.max_tokens = v;
        }
        if let Some(v) = file.temperature {
            self.temperature = v;
        }
        if let Some(v) = file.api_key_env {
            self.api_key_env = v;
        }
        if file.api_key.is_some() {
            self.api_key = file.api_key;
        }
    }
}

/// History retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Non-system turns forwarded to a provider per request.
    pub max_turns: usize,
    /// Conversations kept by the in-memory store before LRU eviction.
    pub max_conversations: usize,
    /// Turns kept per stored conversation.
    pub max_stored_turns: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_turns: 20,
            max_conversations: 1_000,
            max_stored_turns: 200,
        }
    }
}

/// Resolved proxy configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProxyConfig {
    pub bind: String,
    pub language: String,
    pub default_provider: ProviderKind,
    pub request_timeout: Duration,
    pub primary: ProviderSettings,
    pub secondary: ProviderSettings,
    pub retry: RetryPolicy,
    pub history: HistorySettings,
    pub sanitize: SanitizeOptions,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8888".to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            default_provider: ProviderKind::Primary,
            request_timeout: Duration::from_secs(20),
            primary: ProviderSettings::openai(),
            secondary: ProviderSettings::perplexity(),
            retry: RetryPolicy::default(),
            history: HistorySettings::default(),
            sanitize: SanitizeOptions::default(),
        }
    }
}

// On-disk shape: everything optional, layered over the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    bind: Option<String>,
    language: Option<String>,
    default_provider: Option<ProviderKind>,
    request_timeout_secs: Option<u64>,
    primary: Option<ProviderFile>,
    secondary: Option<ProviderFile>,
    retry: Option<RetryPolicy>,
    history: Option<HistorySettings>,
    sanitize: Option<SanitizeOptions>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProviderFile {
    api_style: Option<ApiStyle>,
    base_url: Option<String>,
    chat_path: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    api_key_env: Option<String>,
    api_key: Option<String>,
}

impl ProxyConfig {
    /// Defaults, then `path` (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    Error::configuration_with_context(
                        format!("Cannot read config file: {}", e),
                        ErrorContext::new()
                            .with_details(path.display().to_string())
                            .with_source("config_loader"),
                    )
                })?;
                Self::from_yaml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document over the defaults. Does not read the environment.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut config = Self::default();
        if text.trim().is_empty() {
            return Ok(config);
        }
        let file: ConfigFile = serde_yaml::from_str(text)?;
        config.apply_file(file);
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.bind {
            self.bind = v;
        }
        if let Some(v) = file.language {
            self.language = v;
        }
        if let Some(v) = file.default_provider {
            self.default_provider = v;
        }
        if let Some(secs) = file.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(p) = file.primary {
            self.primary.apply(p);
        }
        if let Some(p) = file.secondary {
            self.secondary.apply(p);
        }
        if let Some(v) = file.retry {
            self.retry = v;
        }
        if let Some(v) = file.history {
            self.history = v;
        }
        if let Some(v) = file.sanitize {
            self.sanitize = v;
        }
    }

    /// Apply `TANGKHUL_*` overrides read through `lookup`.
    ///
    /// Unparseable values are ignored, like unset ones.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TANGKHUL_BIND") {
            self.bind = v;
        }
        if let Some(v) = get("TANGKHUL_LANGUAGE") {
            self.language = v;
        }
        if let Some(secs) = get("TANGKHUL_TIMEOUT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(kind) = get("TANGKHUL_DEFAULT_PROVIDER").and_then(|v| ProviderKind::parse(&v)) {
            self.default_provider = kind;
        }
        if let Some(v) = get("TANGKHUL_PRIMARY_BASE_URL") {
            self.primary.base_url = v;
        }
        if let Some(v) = get("TANGKHUL_SECONDARY_BASE_URL") {
            self.secondary.base_url = v;
        }
        if let Some(v) = get("TANGKHUL_PRIMARY_MODEL") {
            self.primary.model = v;
        }
        if let Some(v) = get("TANGKHUL_SECONDARY_MODEL") {
            self.secondary.model = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, message: &str| {
            Err(Error::configuration_with_context(
                message,
                ErrorContext::new()
                    .with_field_path(field)
                    .with_source("config_validator"),
            ))
        };

        if self.request_timeout.is_zero() {
            return invalid("request_timeout_secs", "Request timeout must be positive");
        }
        if self.retry.max_attempts == 0 {
            return invalid("retry.max_attempts", "At least one attempt is required");
        }
        if self.retry.max_attempts > MAX_RETRY_ATTEMPTS {
            return invalid(
                "retry.max_attempts",
                &format!("At most {} attempts are allowed", MAX_RETRY_ATTEMPTS),
            );
        }
        if self.retry.max_delay_ms > MAX_RETRY_DELAY_MS {
            return invalid(
                "retry.max_delay_ms",
                &format!("Maximum delay is capped at {}ms", MAX_RETRY_DELAY_MS),
            );
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return invalid("retry.min_delay_ms", "Minimum delay exceeds maximum delay");
        }
        if self.history.max_turns == 0 {
            return invalid("history.max_turns", "History window must be positive");
        }
        if self.history.max_conversations == 0 {
            return invalid("history.max_conversations", "Store capacity must be positive");
        }
        if self.language.trim().is_empty() {
            return invalid("language", "Target language name is empty");
        }
        for (field, settings) in [("primary", &self.primary), ("secondary", &self.secondary)] {
            if settings.base_url.trim().is_empty() {
                return invalid(&format!("{}.base_url", field), "Provider base URL is empty");
            }
            if settings.model.trim().is_empty() {
                return invalid(&format!("{}.model", field), "Provider model is empty");
            }
            if settings.max_tokens == 0 {
                return invalid(&format!("{}.max_tokens", field), "max_tokens must be positive");
            }
        }
        Ok(())
    }

    pub fn provider(&self, kind: ProviderKind) -> &ProviderSettings {
        match kind {
            ProviderKind::Primary => &self.primary,
            ProviderKind::Secondary => &self.secondary,
        }
    }
}
