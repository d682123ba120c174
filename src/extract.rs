//! 请求解析：将入站 JSON 一次性解码为带标签的请求类型。
//!
//! Inbound request decoding and latest-user-message extraction.
//!
//! Two body shapes are accepted:
//!
//! ```json
//! { "message": "hi", "conversationId": "abc" }
//! { "messages": [{"role": "user", "content": "hi"}], "apiProvider": "secondary" }
//! ```
//!
//! The body is decoded once into [`ProxyRequestBody`] and then into the tagged
//! [`ProxyRequest`]; nothing downstream probes raw JSON fields.

use crate::error::ErrorContext;
use crate::types::{ChatTurn, ConversationHistory, MessageRole, ProviderKind};
use crate::{Error, Result};
use serde::Deserialize;

/// Wire shape of the proxy request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequestBody {
    #[serde(default)]
    pub messages: Option<Vec<ChatTurn>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub api_provider: Option<ProviderKind>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

/// Decoded request, one variant per accepted shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRequest {
    /// The client sent the whole conversation.
    History {
        turns: ConversationHistory,
        /// Content of the last user turn, if there is one.
        latest: Option<String>,
        provider: Option<ProviderKind>,
        conversation_id: Option<String>,
    },
    /// The client sent one utterance; history lives server-side.
    Single {
        text: String,
        provider: Option<ProviderKind>,
        conversation_id: Option<String>,
    },
}

impl ProxyRequest {
    /// Decode raw bytes. Invalid JSON and ill-typed fields are validation errors.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let parsed: ProxyRequestBody = serde_json::from_slice(body).map_err(|e| {
            Error::validation_with_context(
                format!("Invalid request body: {}", e),
                ErrorContext::new().with_source("request_decoder"),
            )
        })?;
        Self::try_from(parsed)
    }

    /// The latest user utterance, or `NoMessageFound`.
    pub fn latest_user_message(&self) -> Result<&str> {
        match self {
            ProxyRequest::History { latest, .. } => latest.as_deref().ok_or(Error::NoMessageFound),
            ProxyRequest::Single { text, .. } => Ok(text),
        }
    }

    pub fn provider(&self) -> Option<ProviderKind> {
        match self {
            ProxyRequest::History { provider, .. } | ProxyRequest::Single { provider, .. } => {
                *provider
            }
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            ProxyRequest::History {
                conversation_id, ..
            }
            | ProxyRequest::Single {
                conversation_id, ..
            } => conversation_id.as_deref(),
        }
    }
}

impl TryFrom<ProxyRequestBody> for ProxyRequest {
    type Error = Error;

    fn try_from(body: ProxyRequestBody) -> Result<Self> {
        let conversation_id = body
            .conversation_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        if let Some(messages) = body.messages {
            let turns = normalize_turns(messages);
            let latest = latest_user_content(&turns).map(str::to_string);
            // A `messages` array without user content still lets a flat
            // `message` field supply the utterance.
            let latest = latest.or_else(|| non_empty(body.message.as_deref()));
            return Ok(ProxyRequest::History {
                turns,
                latest,
                provider: body.api_provider,
                conversation_id,
            });
        }

        match non_empty(body.message.as_deref()) {
            Some(text) => Ok(ProxyRequest::Single {
                text,
                provider: body.api_provider,
                conversation_id,
            }),
            None => Err(Error::NoMessageFound),
        }
    }
}

/// Extract the latest user utterance from a JSON value of either shape.
pub fn extract_user_message(body: &serde_json::Value) -> Result<String> {
    let parsed: ProxyRequestBody = serde_json::from_value(body.clone())?;
    let request = ProxyRequest::try_from(parsed)?;
    request.latest_user_message().map(str::to_string)
}

/// Drop turns whose content is blank; trim the rest.
pub fn normalize_turns(turns: Vec<ChatTurn>) -> ConversationHistory {
    turns
        .into_iter()
        .filter_map(|t| {
            let content = t.content.trim();
            if content.is_empty() {
                None
            } else {
                Some(ChatTurn::new(t.role, content))
            }
        })
        .collect()
}

/// Content of the last user turn.
pub fn latest_user_content(turns: &[ChatTurn]) -> Option<&str> {
    turns
        .iter()
        .rev()
        .find(|t| t.role == MessageRole::User)
        .map(|t| t.content.as_str())
}

fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
