//! 请求执行逻辑：单次请求，不含重试或回退。
//!
//! Request execution logic (single attempt).

use crate::drivers::RequestParams;
use crate::error::ProviderError;
use crate::types::ChatTurn;
use tracing::{debug, info};

use super::core::{ProviderClient, SendOptions};

/// Upstream error bodies are kept for logs, but not unboundedly.
const MAX_ERROR_BODY_CHARS: usize = 2_000;

impl ProviderClient {
    pub(crate) async fn execute_once(
        &self,
        history: &[ChatTurn],
        options: &SendOptions,
    ) -> Result<String, ProviderError> {
        // Checked before any I/O so a missing key never costs a round trip.
        let api_key = self
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ProviderError::MissingCredential {
                provider: self.kind,
            })?;

        let params = RequestParams {
            model: &self.model,
            max_tokens: options.max_tokens.unwrap_or(self.max_tokens),
            temperature: options.temperature.unwrap_or(self.temperature),
        };
        let request = self.driver.build_request(history, &params);
        let headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();

        debug!(
            provider = %self.kind,
            model = self.model.as_str(),
            turns = history.len(),
            "sending provider request"
        );

        let start = std::time::Instant::now();
        let reply = self
            .transport
            .post_json(&self.url, api_key, &headers, &request.body)
            .await
            .map_err(|e| self.transport_error(e))?;

        if !reply.is_success() {
            let error = ProviderError::Http {
                provider: self.kind,
                status: reply.status,
                body: truncate_chars(&reply.body, MAX_ERROR_BODY_CHARS),
                retry_after_ms: reply.retry_after_ms,
            };
            info!(
                provider = %self.kind,
                http_status = reply.status,
                error_class = error.class(),
                request_id = reply.request_id.as_deref().unwrap_or(""),
                duration_ms = start.elapsed().as_millis(),
                "provider request failed"
            );
            return Err(error);
        }

        let json: serde_json::Value =
            serde_json::from_str(&reply.body).map_err(|e| ProviderError::MalformedResponse {
                provider: self.kind,
                reason: format!("response body is not JSON: {}", e),
            })?;
        let parsed = self.driver.parse_response(&json)?;

        info!(
            provider = %self.kind,
            model = self.model.as_str(),
            http_status = reply.status,
            finish_reason = parsed.finish_reason.as_deref().unwrap_or(""),
            total_tokens = parsed.usage.as_ref().map(|u| u.total_tokens).unwrap_or(0),
            duration_ms = start.elapsed().as_millis(),
            "provider request completed"
        );

        Ok(parsed.content)
    }

    fn transport_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout {
                provider: self.kind,
                timeout_ms: self.transport.timeout().as_millis() as u64,
            }
        } else {
            ProviderError::Transport {
                provider: self.kind,
                source: e,
            }
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
