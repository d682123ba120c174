use crate::types::ProviderKind;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "messages[2].role", "primary.base_url")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "request_decoder", "config_loader")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Crate-wide error type.
///
/// Provider failures are wrapped rather than flattened so the orchestrator can
/// keep the per-provider detail for logging.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No user message found in request")]
    NoMessageFound,

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Conversation store error: {message}{}", format_context(.context))]
    Store {
        message: String,
        context: ErrorContext,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_with_context(msg, ErrorContext::new())
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn store_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Store {
            message: msg.into(),
            context,
        }
    }

    /// Whether this error was caused by the inbound request rather than by the proxy.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NoMessageFound | Error::Validation { .. } | Error::Serialization(_)
        )
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Configuration { context, .. }
            | Error::Store { context, .. } => Some(context),
            _ => None,
        }
    }
}

/// Failure of a single provider call.
///
/// Every variant is absorbed by the fallback orchestrator; none of them reach
/// the HTTP caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} provider has no API key configured")]
    MissingCredential { provider: ProviderKind },

    #[error("{provider} provider returned HTTP {status}: {body}")]
    Http {
        provider: ProviderKind,
        status: u16,
        body: String,
        retry_after_ms: Option<u32>,
    },

    #[error("{provider} provider returned a malformed response: {reason}")]
    MalformedResponse {
        provider: ProviderKind,
        reason: String,
    },

    #[error("{provider} provider did not answer within {timeout_ms} ms")]
    Timeout {
        provider: ProviderKind,
        timeout_ms: u64,
    },

    #[error("{provider} provider transport error: {source}")]
    Transport {
        provider: ProviderKind,
        #[source]
        source: reqwest::Error,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderKind {
        match self {
            ProviderError::MissingCredential { provider }
            | ProviderError::Http { provider, .. }
            | ProviderError::MalformedResponse { provider, .. }
            | ProviderError::Timeout { provider, .. }
            | ProviderError::Transport { provider, .. } => *provider,
        }
    }

    /// Stable snake_case class used in log fields.
    pub fn class(&self) -> &'static str {
        match self {
            ProviderError::MissingCredential { .. } => "missing_credential",
            ProviderError::Http { status, .. } => {
                crate::client::error_classification::class_for_status(*status)
            }
            ProviderError::MalformedResponse { .. } => "malformed_response",
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::Transport { .. } => "transport",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Http { status: 429, .. })
    }

    pub fn retry_after_ms(&self) -> Option<u32> {
        match self {
            ProviderError::Http { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }
}
