use crate::client::core::ProviderClient;
use crate::config::ProviderSettings;
use crate::drivers::create_driver;
use crate::error::ErrorContext;
use crate::transport::HttpTransport;
use crate::types::ProviderKind;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Builder for one provider client.
///
/// The API key is resolved at build time: an explicit [`api_key`](Self::api_key)
/// wins, then the settings' inline key, then the environment variable the
/// settings name. A missing key is not a build error; the client reports
/// `MissingCredential` on first use instead.
pub struct ProviderClientBuilder {
    kind: ProviderKind,
    settings: ProviderSettings,
    timeout: Duration,
    transport: Option<Arc<HttpTransport>>,
    api_key: Option<String>,
    /// Override base URL (primarily for testing with mock servers)
    base_url_override: Option<String>,
}

impl ProviderClientBuilder {
    pub fn new(kind: ProviderKind, settings: ProviderSettings) -> Self {
        Self {
            kind,
            settings,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            api_key: None,
            base_url_override: None,
        }
    }

    /// Per-request timeout. Ignored when a shared transport is supplied.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reuse an existing transport (connection pool) across clients.
    pub fn transport(mut self, transport: Arc<HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    pub fn build(self) -> Result<ProviderClient> {
        let base_url = self
            .base_url_override
            .as_deref()
            .unwrap_or(&self.settings.base_url)
            .trim();
        if base_url.is_empty() {
            return Err(Error::configuration_with_context(
                "Provider base URL is empty",
                ErrorContext::new()
                    .with_field_path(format!("{}.base_url", self.kind))
                    .with_source("provider_client_builder"),
            ));
        }
        let url = join_url(base_url, &self.settings.chat_path);

        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(self.timeout)?),
        };

        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.settings.resolve_api_key());

        Ok(ProviderClient {
            kind: self.kind,
            driver: create_driver(self.settings.api_style, self.kind),
            transport,
            url,
            model: self.settings.model,
            max_tokens: self.settings.max_tokens,
            temperature: self.settings.temperature,
            api_key,
        })
    }
}

fn join_url(base: &str, path: &str) -> String {
    let path = path.trim();
    if path.is_empty() {
        return base.trim_end_matches('/').to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
