use crate::error::ErrorContext;
use crate::{Error, Result};
use reqwest::header::HeaderMap;
use reqwest::Proxy;
use std::env;
use std::time::Duration;

/// Raw outcome of one POST: status, selected headers and body text.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub retry_after_ms: Option<u32>,
    pub request_id: Option<String>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client for provider calls. Every request is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(
                env::var("TANGKHUL_HTTP_POOL_MAX_IDLE_PER_HOST")
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .unwrap_or(8),
            )
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Ok(proxy_url) = env::var("TANGKHUL_HTTP_PROXY") {
            if let Ok(proxy) = Proxy::all(&proxy_url) {
                builder = builder.proxy(proxy);
            }
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("Failed to build HTTP client: {}", e),
                ErrorContext::new().with_source("http_transport"),
            )
        })?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST a JSON body with bearer auth and collect the reply.
    ///
    /// Non-2xx statuses are returned as data; only transport failures are errors.
    pub async fn post_json(
        &self,
        url: &str,
        api_key: &str,
        headers: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> std::result::Result<HttpReply, reqwest::Error> {
        let mut req = self.client.post(url).bearer_auth(api_key).json(body);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let retry_after_ms = retry_after_ms(resp.headers());
        let request_id = header_first(
            resp.headers(),
            &["x-request-id", "request-id", "cf-ray"],
        );
        let body = resp.text().await?;

        Ok(HttpReply {
            status,
            retry_after_ms,
            request_id,
            body,
        })
    }
}

fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(*name) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Only the `Retry-After: <seconds>` form is understood.
fn retry_after_ms(headers: &HeaderMap) -> Option<u32> {
    let raw = header_first(headers, &["retry-after"])?;
    let secs: u32 = raw.parse().ok()?;
    Some(secs.saturating_mul(1000))
}
