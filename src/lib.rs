//! # tangkhul-proxy
//!
//! 面向少数民族语言数据采集的对话 AI 代理：多厂商回退、消息序列校验与响应清理。
//!
//! Chat AI proxy for collecting vocabulary and phrases in a low-resource
//! language (Tangkhul by default) from volunteer trainers.
//!
//! ## Overview
//!
//! A trainer's message goes through a fixed pipeline: the body is decoded into
//! a typed request, the latest utterance is classified, canned replies answer
//! acknowledgements and cut-off messages locally, everything else is sent to a
//! chat-completion provider with a validated history. The proxy always answers:
//! when both providers fail it synthesises an elicitation prompt itself.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tangkhul_proxy::{serve, ProxyConfig, ProxyService};
//!
//! #[tokio::main]
//! async fn main() -> tangkhul_proxy::Result<()> {
//!     let config = ProxyConfig::load(None)?;
//!     let service = Arc::new(ProxyService::from_config(&config)?);
//!     serve("127.0.0.1:8888".parse().unwrap(), service).await
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`extract`] | Request decoding and latest-user-message extraction |
//! | [`heuristics`] | Acknowledgement, greeting, marker and truncation checks |
//! | [`sequence`] | Role-alternation repair |
//! | [`client`] | Provider clients and retry policy |
//! | [`drivers`] | Per-provider request/response formats |
//! | [`fallback`] | Preferred → alternate → local orchestration |
//! | [`sanitize`] | Thinking-section removal and paragraph spacing |
//! | [`prompts`] | Canned prompts for the target language |
//! | [`store`] | Conversation history storage |
//! | [`service`] | The request pipeline |
//! | [`server`] | axum routes |
//! | [`config`] | YAML + environment configuration |

pub mod client;
pub mod config;
pub mod drivers;
pub mod extract;
pub mod fallback;
pub mod heuristics;
pub mod prompts;
pub mod sanitize;
pub mod sequence;
pub mod server;
pub mod service;
pub mod store;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{ChatProvider, ProviderClient, ProviderClientBuilder, RetryPolicy, SendOptions};
pub use config::{ProviderSettings, ProxyConfig};
pub use extract::ProxyRequest;
pub use fallback::{FallbackOrchestrator, FallbackOutcome};
pub use prompts::PromptBook;
pub use server::{router, serve};
pub use service::{ProxyReply, ProxyService, ServiceSettings};
pub use store::{ConversationStore, MemoryConversationStore};
pub use types::{ChatTurn, ConversationHistory, MessageRole, ProviderKind, ProviderResult, ProviderTag};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ProviderError};
