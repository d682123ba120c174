use crate::drivers::ProviderDriver;
use crate::error::ProviderError;
use crate::transport::HttpTransport;
use crate::types::{ChatTurn, ProviderKind};
use async_trait::async_trait;
use std::sync::Arc;

/// Per-call overrides of the configured model parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SendOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

/// A chat-completion backend as seen by the orchestrator.
///
/// Implementations make a single attempt per call and never retry.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether a credential is available. Does no I/O.
    fn is_configured(&self) -> bool;

    async fn send(
        &self,
        history: &[ChatTurn],
        options: &SendOptions,
    ) -> Result<String, ProviderError>;
}

/// HTTP client for one configured backend.
pub struct ProviderClient {
    pub(crate) kind: ProviderKind,
    pub(crate) driver: Box<dyn ProviderDriver>,
    pub(crate) transport: Arc<HttpTransport>,
    pub(crate) url: String,
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f64,
    pub(crate) api_key: Option<String>,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("kind", &self.kind)
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl ProviderClient {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatProvider for ProviderClient {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    async fn send(
        &self,
        history: &[ChatTurn],
        options: &SendOptions,
    ) -> Result<String, ProviderError> {
        self.execute_once(history, options).await
    }
}
