//! 代理服务：把解析、分类、校验、回退、清理和存储串成一条流水线。
//!
//! The request pipeline behind the HTTP route.
//!
//! ```text
//! ProxyRequest ─► classify ─► (ack / clarification short-circuit)
//!                    │
//!                    ▼
//!            assemble history ─► trim ─► validate ─► orchestrate ─► sanitize ─► persist
//! ```

use crate::client::{ChatProvider, ProviderClientBuilder, RetryPolicy};
use crate::config::ProxyConfig;
use crate::error::Error;
use crate::extract::{latest_user_content, ProxyRequest};
use crate::fallback::FallbackOrchestrator;
use crate::heuristics::classify;
use crate::prompts::PromptBook;
use crate::sanitize::{sanitize, SanitizeOptions};
use crate::sequence::{validate_sequence, Placeholders};
use crate::store::{ConversationLocks, ConversationStore, MemoryConversationStore};
use crate::transport::HttpTransport;
use crate::types::{ChatTurn, ConversationHistory, ProviderKind, ProviderTag};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Body of a 200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyReply {
    pub response: String,
    pub provider: ProviderTag,
    pub used_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// Error classes of the provider attempts that failed, in call order.
    #[serde(skip)]
    pub failures: Vec<&'static str>,
}

impl ProxyReply {
    /// Canned reply chosen before any provider was tried.
    fn local(response: String, conversation_id: Option<String>) -> Self {
        Self {
            response,
            provider: ProviderTag::Local,
            used_fallback: false,
            conversation_id,
            failures: Vec::new(),
        }
    }

    /// Generic reply standing in for an answer the pipeline could not produce.
    fn fallback(response: String, conversation_id: Option<String>) -> Self {
        Self {
            used_fallback: true,
            ..Self::local(response, conversation_id)
        }
    }
}

/// Tunables the service needs beyond its collaborators.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub language: String,
    pub default_provider: ProviderKind,
    pub max_history_turns: usize,
    pub sanitize: SanitizeOptions,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        let config = ProxyConfig::default();
        Self::from(&config)
    }
}

impl From<&ProxyConfig> for ServiceSettings {
    fn from(config: &ProxyConfig) -> Self {
        Self {
            language: config.language.clone(),
            default_provider: config.default_provider,
            max_history_turns: config.history.max_turns,
            sanitize: config.sanitize,
        }
    }
}

pub struct ProxyService {
    orchestrator: FallbackOrchestrator,
    store: Arc<dyn ConversationStore>,
    locks: ConversationLocks,
    prompts: PromptBook,
    placeholders: Placeholders,
    settings: ServiceSettings,
}

impl ProxyService {
    pub fn new(
        orchestrator: FallbackOrchestrator,
        store: Arc<dyn ConversationStore>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            orchestrator,
            store,
            locks: ConversationLocks::new(),
            prompts: PromptBook::new(settings.language.clone()),
            placeholders: Placeholders::for_language(&settings.language),
            settings,
        }
    }

    /// Wire real HTTP providers and the in-memory store from configuration.
    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
        let build = |kind: ProviderKind| -> Result<Arc<dyn ChatProvider>> {
            let client = ProviderClientBuilder::new(kind, config.provider(kind).clone())
                .transport(transport.clone())
                .build()?;
            info!(
                provider = %kind,
                url = client.url(),
                model = client.model(),
                configured = client.is_configured(),
                "provider client ready"
            );
            Ok(Arc::new(client))
        };

        let orchestrator = FallbackOrchestrator::new(
            build(ProviderKind::Primary)?,
            build(ProviderKind::Secondary)?,
            PromptBook::new(config.language.clone()),
        )
        .with_retry(config.retry);
        let store = Arc::new(MemoryConversationStore::new(
            config.history.max_conversations,
            config.history.max_stored_turns,
        ));
        Ok(Self::new(orchestrator, store, ServiceSettings::from(config)))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_retry(retry);
        self
    }

    pub fn prompts(&self) -> &PromptBook {
        &self.prompts
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Credential presence for (primary, secondary). No I/O.
    pub fn providers_configured(&self) -> (bool, bool) {
        (
            self.orchestrator.provider(ProviderKind::Primary).is_configured(),
            self.orchestrator.provider(ProviderKind::Secondary).is_configured(),
        )
    }

    /// Answer one decoded request. Internal failures become a generic local reply.
    pub async fn handle(&self, request: ProxyRequest) -> ProxyReply {
        let conversation_id = match &request {
            ProxyRequest::Single {
                conversation_id, ..
            } => Some(
                conversation_id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            ),
            ProxyRequest::History {
                conversation_id, ..
            } => conversation_id.clone(),
        };

        let _guard = match &conversation_id {
            Some(id) => Some(self.locks.acquire(id).await),
            None => None,
        };

        match self.answer(&request, conversation_id.as_deref()).await {
            Ok(reply) => reply,
            Err(err) => {
                error!(
                    error = %err,
                    conversation_id = conversation_id.as_deref().unwrap_or(""),
                    "request failed, answering with generic reply"
                );
                ProxyReply::fallback(self.prompts.generic(), conversation_id)
            }
        }
    }

    async fn answer(&self, request: &ProxyRequest, conversation_id: Option<&str>) -> Result<ProxyReply> {
        let latest = match request.latest_user_message() {
            Ok(text) => text.to_string(),
            Err(Error::NoMessageFound) => {
                return Ok(ProxyReply::local(
                    self.prompts.opening(),
                    conversation_id.map(str::to_string),
                ));
            }
            Err(err) => return Err(err),
        };

        let mut history = self.assemble_history(request, conversation_id, &latest).await?;
        let flags = classify(&latest);

        let mut failures = Vec::new();
        let (response, provider, used_fallback) = if flags.is_acknowledgement {
            debug!("acknowledgement short-circuit");
            (self.prompts.acknowledgement(), ProviderTag::Local, false)
        } else if flags.is_likely_incomplete {
            debug!("incomplete message short-circuit");
            (self.prompts.clarification(&latest, &history), ProviderTag::Local, false)
        } else {
            self.trim_history(&mut history);
            if !history.iter().any(ChatTurn::is_system) {
                history.insert(0, self.prompts.system_turn());
            }
            let validated = validate_sequence(&history, &self.placeholders);
            let preferred = request.provider().unwrap_or(self.settings.default_provider);
            let outcome = self.orchestrator.resolve(&validated, preferred).await;
            failures = outcome.failures.iter().map(|e| e.class()).collect();

            let result = outcome.result;
            let text = match result.provider {
                ProviderTag::Local => result.text,
                _ => sanitize(&result.text, &self.settings.sanitize),
            };
            (text, result.provider, result.used_fallback)
        };

        if let Some(id) = conversation_id {
            self.store
                .append(id, &[ChatTurn::user(latest), ChatTurn::assistant(response.clone())])
                .await?;
        }

        info!(
            provider = %provider,
            used_fallback,
            failures = failures.len(),
            failure_classes = ?failures,
            conversation_id = conversation_id.unwrap_or(""),
            "request answered"
        );

        Ok(ProxyReply {
            response,
            provider,
            used_fallback,
            conversation_id: conversation_id.map(str::to_string),
            failures,
        })
    }

    async fn assemble_history(
        &self,
        request: &ProxyRequest,
        conversation_id: Option<&str>,
        latest: &str,
    ) -> Result<ConversationHistory> {
        match request {
            ProxyRequest::History { turns, .. } => {
                let mut history = turns.clone();
                // utterance came from the flat `message` field
                if latest_user_content(&history).is_none() {
                    history.push(ChatTurn::user(latest));
                }
                Ok(history)
            }
            ProxyRequest::Single { .. } => {
                let mut history = match conversation_id {
                    Some(id) => self.store.load(id).await?,
                    None => Vec::new(),
                };
                history.push(ChatTurn::user(latest));
                Ok(history)
            }
        }
    }

    /// Keep every system turn and the newest `max_history_turns` others.
    fn trim_history(&self, history: &mut ConversationHistory) {
        let others = history.iter().filter(|t| !t.is_system()).count();
        let mut skip = others.saturating_sub(self.settings.max_history_turns);
        if skip == 0 {
            return;
        }
        history.retain(|turn| {
            if turn.is_system() || skip == 0 {
                true
            } else {
                skip -= 1;
                false
            }
        });
    }
}
