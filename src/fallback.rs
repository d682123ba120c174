//! Fallback orchestration
//!
//! Preferred provider, then the alternate, then a locally synthesised reply.
//! Provider failures never escape: they are logged and handed back to the
//! caller in [`FallbackOutcome::failures`].

use crate::client::{ChatProvider, Decision, RetryPolicy, SendOptions};
use crate::error::ProviderError;
use crate::extract::latest_user_content;
use crate::heuristics::classify;
use crate::prompts::PromptBook;
use crate::types::{ChatTurn, ProviderKind, ProviderResult};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one orchestration, with every failure seen on the way.
#[derive(Debug)]
pub struct FallbackOutcome {
    pub result: ProviderResult,
    pub failures: Vec<ProviderError>,
}

impl FallbackOutcome {
    pub fn degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

pub struct FallbackOrchestrator {
    primary: Arc<dyn ChatProvider>,
    secondary: Arc<dyn ChatProvider>,
    retry: RetryPolicy,
    prompts: PromptBook,
}

impl FallbackOrchestrator {
    pub fn new(
        primary: Arc<dyn ChatProvider>,
        secondary: Arc<dyn ChatProvider>,
        prompts: PromptBook,
    ) -> Self {
        Self {
            primary,
            secondary,
            retry: RetryPolicy::none(),
            prompts,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self, kind: ProviderKind) -> &Arc<dyn ChatProvider> {
        match kind {
            ProviderKind::Primary => &self.primary,
            ProviderKind::Secondary => &self.secondary,
        }
    }

    /// Produce a reply for an already validated history. Never fails.
    pub async fn resolve(&self, history: &[ChatTurn], preferred: ProviderKind) -> FallbackOutcome {
        let mut failures = Vec::new();

        for (position, kind) in [preferred, preferred.alternate()].into_iter().enumerate() {
            if let Some(text) = self.call_with_retry(kind, history, &mut failures).await {
                let used_fallback = position > 0;
                if used_fallback {
                    info!(
                        provider = %kind,
                        failures = failures.len(),
                        "answered by alternate provider"
                    );
                }
                return FallbackOutcome {
                    result: ProviderResult {
                        text,
                        provider: kind.into(),
                        used_fallback,
                    },
                    failures,
                };
            }
        }

        let latest = latest_user_content(history).unwrap_or_default();
        let flags = classify(latest);
        warn!(
            failures = failures.len(),
            markers = flags.contains_target_language_markers,
            incomplete = flags.is_likely_incomplete,
            greeting = flags.is_greeting,
            "all providers failed, answering locally"
        );
        FallbackOutcome {
            result: ProviderResult::local(self.prompts.local_reply(&flags, latest, history), true),
            failures,
        }
    }

    async fn call_with_retry(
        &self,
        kind: ProviderKind,
        history: &[ChatTurn],
        failures: &mut Vec<ProviderError>,
    ) -> Option<String> {
        let provider = self.provider(kind);
        let mut attempt = 0u32;
        loop {
            // token and temperature limits come from each client's settings
            match provider.send(history, &SendOptions::default()).await {
                Ok(text) => return Some(text),
                Err(err) => {
                    warn!(
                        provider = %kind,
                        error_class = err.class(),
                        attempt,
                        error = %err,
                        "provider call failed"
                    );
                    let decision = self.retry.decide(&err, attempt);
                    failures.push(err);
                    match decision {
                        Decision::Retry { delay } => {
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        Decision::Fallback => return None,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderTag;
    use async_trait::async_trait;

    struct Fixed(ProviderKind, Option<&'static str>);

    #[async_trait]
    impl ChatProvider for Fixed {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, _: &[ChatTurn], _: &SendOptions) -> Result<String, ProviderError> {
            match self.1 {
                Some(text) => Ok(text.to_string()),
                None => Err(ProviderError::MissingCredential { provider: self.0 }),
            }
        }
    }

    fn orchestrator(primary: Option<&'static str>, secondary: Option<&'static str>) -> FallbackOrchestrator {
        FallbackOrchestrator::new(
            Arc::new(Fixed(ProviderKind::Primary, primary)),
            Arc::new(Fixed(ProviderKind::Secondary, secondary)),
            PromptBook::default(),
        )
    }

    #[tokio::test]
    async fn preferred_success_is_not_a_fallback() {
        let outcome = orchestrator(Some("a"), Some("b"))
            .resolve(&[ChatTurn::user("hi")], ProviderKind::Secondary)
            .await;
        assert_eq!(outcome.result.text, "b");
        assert_eq!(outcome.result.provider, ProviderTag::Secondary);
        assert!(!outcome.result.used_fallback);
        assert!(!outcome.degraded());
    }

    #[tokio::test]
    async fn local_reply_when_everything_fails() {
        let outcome = orchestrator(None, None)
            .resolve(&[ChatTurn::user("Hello!")], ProviderKind::Primary)
            .await;
        assert_eq!(outcome.result.provider, ProviderTag::Local);
        assert!(outcome.result.used_fallback);
        assert!(!outcome.result.text.is_empty());
        assert_eq!(outcome.failures.len(), 2);
    }
}
