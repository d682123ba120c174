//! Perplexity chat completions driver.
//!
//! The body is OpenAI-shaped, with two differences that matter here:
//! - At most one system message is accepted, and only at the start.
//! - Search-grounded models attach citations we never show to trainers, so
//!   they are switched off.

use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{ChatTurn, ProviderKind};

use super::{
    chat_completions_body, parse_chat_completion, ApiStyle, DriverRequest, DriverResponse,
    ProviderDriver, RequestParams,
};

#[derive(Debug)]
pub struct PerplexityDriver {
    kind: ProviderKind,
}

impl PerplexityDriver {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }

    /// Fold every system turn into one leading system turn.
    fn merge_system_turns(history: &[ChatTurn]) -> Vec<ChatTurn> {
        let system: Vec<&str> = history
            .iter()
            .filter(|t| t.is_system())
            .map(|t| t.content.as_str())
            .collect();

        let mut out = Vec::with_capacity(history.len());
        if !system.is_empty() {
            out.push(ChatTurn::system(system.join("\n\n")));
        }
        out.extend(history.iter().filter(|t| !t.is_system()).cloned());
        out
    }
}

impl ProviderDriver for PerplexityDriver {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn api_style(&self) -> ApiStyle {
        ApiStyle::Perplexity
    }

    fn build_request(&self, history: &[ChatTurn], params: &RequestParams<'_>) -> DriverRequest {
        let merged = Self::merge_system_turns(history);
        let mut body = chat_completions_body(&merged, params);
        body["return_citations"] = Value::Bool(false);
        DriverRequest {
            headers: vec![("accept", "application/json".to_string())],
            body,
        }
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError> {
        parse_chat_completion(self.kind, body)
    }
}
