//! Provider 驱动抽象层：每个后端的请求/响应格式转换
//!
//! Provider driver abstraction. A driver turns a validated history plus model
//! parameters into a provider-specific JSON body and extracts the completion
//! text from the provider's reply. Drivers never do I/O; the client owns the
//! transport.

pub mod perplexity;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::types::{ChatTurn, ProviderKind};

pub use perplexity::PerplexityDriver;

/// Wire dialect spoken by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// OpenAI chat completions.
    OpenAi,
    /// Perplexity chat completions (OpenAI-like, stricter about history shape).
    Perplexity,
}

/// Model parameters for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestParams<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f64,
}

/// Provider-specific request body plus any extra headers.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    pub headers: Vec<(&'static str, String)>,
    pub body: Value,
}

/// Completion text and accounting extracted from a reply.
#[derive(Debug, Clone)]
pub struct DriverResponse {
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<UsageInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Request/response adaptation for one backend dialect.
pub trait ProviderDriver: Send + Sync + std::fmt::Debug {
    /// Which configured backend this driver serves.
    fn kind(&self) -> ProviderKind;

    fn api_style(&self) -> ApiStyle;

    fn build_request(&self, history: &[ChatTurn], params: &RequestParams<'_>) -> DriverRequest;

    /// Extract the completion. Missing or blank content is a malformed response.
    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError>;
}

/// OpenAI chat completions driver.
#[derive(Debug)]
pub struct OpenAiDriver {
    kind: ProviderKind,
}

impl OpenAiDriver {
    pub fn new(kind: ProviderKind) -> Self {
        Self { kind }
    }
}

impl ProviderDriver for OpenAiDriver {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn api_style(&self) -> ApiStyle {
        ApiStyle::OpenAi
    }

    fn build_request(&self, history: &[ChatTurn], params: &RequestParams<'_>) -> DriverRequest {
        DriverRequest {
            headers: Vec::new(),
            body: chat_completions_body(history, params),
        }
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, ProviderError> {
        parse_chat_completion(self.kind, body)
    }
}

/// Factory: pick the driver for a configured API style.
pub fn create_driver(api_style: ApiStyle, kind: ProviderKind) -> Box<dyn ProviderDriver> {
    match api_style {
        ApiStyle::OpenAi => Box::new(OpenAiDriver::new(kind)),
        ApiStyle::Perplexity => Box::new(PerplexityDriver::new(kind)),
    }
}

/// `{model, messages, max_tokens, temperature}` body shared by both dialects.
pub(crate) fn chat_completions_body(history: &[ChatTurn], params: &RequestParams<'_>) -> Value {
    let messages: Vec<Value> = history
        .iter()
        .map(|t| serde_json::json!({ "role": t.role.as_str(), "content": t.content }))
        .collect();

    serde_json::json!({
        "model": params.model,
        "messages": messages,
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
        "stream": false,
    })
}

/// Read `choices[0].message.content` from a chat completion.
pub(crate) fn parse_chat_completion(
    kind: ProviderKind,
    body: &Value,
) -> Result<DriverResponse, ProviderError> {
    let content = body
        .pointer("/choices/0/message/content")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ProviderError::MalformedResponse {
            provider: kind,
            reason: "missing or empty choices[0].message.content".to_string(),
        })?;

    let finish_reason = body
        .pointer("/choices/0/finish_reason")
        .and_then(|v| v.as_str())
        .map(String::from);
    let usage = body.get("usage").map(|u| UsageInfo {
        prompt_tokens: u["prompt_tokens"].as_u64().unwrap_or(0),
        completion_tokens: u["completion_tokens"].as_u64().unwrap_or(0),
        total_tokens: u["total_tokens"].as_u64().unwrap_or(0),
    });

    Ok(DriverResponse {
        content: content.to_string(),
        finish_reason,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RequestParams<'static> {
        RequestParams {
            model: "gpt-3.5-turbo",
            max_tokens: 500,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_openai_driver_build_request() {
        let driver = OpenAiDriver::new(ProviderKind::Primary);
        let history = vec![ChatTurn::system("rules"), ChatTurn::user("Hello")];
        let req = driver.build_request(&history, &params());
        assert_eq!(req.body["model"], "gpt-3.5-turbo");
        assert_eq!(req.body["max_tokens"], 500);
        assert_eq!(req.body["temperature"], 0.7);
        assert_eq!(req.body["messages"][0]["role"], "system");
        assert_eq!(req.body["messages"][1]["content"], "Hello");
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_openai_driver_parse_response() {
        let driver = OpenAiDriver::new(ProviderKind::Primary);
        let body = serde_json::json!({
            "choices": [{"message": {"content": "Hi there!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let resp = driver.parse_response(&body).unwrap();
        assert_eq!(resp.content, "Hi there!");
        assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(resp.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn empty_or_missing_content_is_malformed() {
        let driver = OpenAiDriver::new(ProviderKind::Primary);
        for body in [
            serde_json::json!({"choices": []}),
            serde_json::json!({"choices": [{"message": {"content": "  "}}]}),
            serde_json::json!({"error": {"message": "nope"}}),
        ] {
            let err = driver.parse_response(&body).unwrap_err();
            assert!(matches!(err, ProviderError::MalformedResponse { .. }), "{body}");
        }
    }

    #[test]
    fn factory_respects_style() {
        let d = create_driver(ApiStyle::Perplexity, ProviderKind::Secondary);
        assert_eq!(d.api_style(), ApiStyle::Perplexity);
        assert_eq!(d.kind(), ProviderKind::Secondary);
    }
}
