//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use mockito::{Mock, Server, ServerGuard};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tangkhul_proxy::{
    ChatProvider, ChatTurn, FallbackOrchestrator, MemoryConversationStore, PromptBook,
    ProviderClient, ProviderClientBuilder, ProviderError, ProviderKind, ProviderSettings,
    ProxyService, SendOptions, ServiceSettings,
};

pub const TEST_KEY: &str = "test-key";

/// Test fixture that manages a mock provider endpoint
pub struct MockServerFixture {
    pub server: ServerGuard,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self { server, base_url }
    }

    /// Client pointed at the mock server, with a test key.
    pub fn client(&self, kind: ProviderKind, settings: ProviderSettings) -> ProviderClient {
        ProviderClientBuilder::new(kind, settings)
            .base_url_override(&self.base_url)
            .api_key(TEST_KEY)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    pub async fn mock_completion(&mut self, content: &str) -> Mock {
        self.mock_json_response(200, &completion_body(content)).await
    }

    pub async fn mock_json_response(&mut self, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", "/chat/completions")
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }
}

pub fn completion_body(content: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 6, "total_tokens": 18}
    })
    .to_string()
}

/// One scripted answer of a [`ScriptedProvider`].
#[derive(Debug, Clone)]
pub enum Step {
    Reply(&'static str),
    Status(u16),
    Missing,
    /// Panic inside the provider call.
    Panic,
}

/// Provider that replays a script and records what it was sent.
///
/// Once the script runs out the last step repeats.
pub struct ScriptedProvider {
    kind: ProviderKind,
    script: Mutex<VecDeque<Step>>,
    last: Mutex<Step>,
    calls: Mutex<Vec<Vec<ChatTurn>>>,
}

impl ScriptedProvider {
    pub fn new(kind: ProviderKind, steps: Vec<Step>) -> Arc<Self> {
        let last = steps.last().cloned().unwrap_or(Step::Missing);
        Arc::new(Self {
            kind,
            script: Mutex::new(steps.into()),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<ChatTurn>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, history: &[ChatTurn], _: &SendOptions) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(history.to_vec());
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.lock().unwrap().clone());
        match step {
            Step::Reply(text) => Ok(text.to_string()),
            Step::Status(status) => Err(ProviderError::Http {
                provider: self.kind,
                status,
                body: "{\"error\":\"scripted\"}".to_string(),
                retry_after_ms: None,
            }),
            Step::Missing => Err(ProviderError::MissingCredential { provider: self.kind }),
            Step::Panic => panic!("scripted provider panic"),
        }
    }
}

/// Service over two scripted providers and a fresh memory store.
pub fn scripted_service(
    primary: Arc<ScriptedProvider>,
    secondary: Arc<ScriptedProvider>,
) -> ProxyService {
    let orchestrator = FallbackOrchestrator::new(primary, secondary, PromptBook::default());
    let store = Arc::new(MemoryConversationStore::new(64, 100));
    ProxyService::new(orchestrator, store, ServiceSettings::default())
}
