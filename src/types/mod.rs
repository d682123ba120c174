//! 类型模块：对话轮次、角色与提供方标识。
//!
//! # Types Module
//!
//! Core data types shared by every stage of the proxy pipeline.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ChatTurn`] | One role-tagged message in a conversation |
//! | [`MessageRole`] | Closed set of roles (system, user, assistant) |
//! | [`ConversationHistory`] | Ordered turns, oldest first |
//! | [`ProviderKind`] | Which remote backend (primary / secondary) |
//! | [`ProviderTag`] | Who produced a reply (primary / secondary / local) |
//! | [`ProviderResult`] | Text plus provenance returned by the orchestrator |

pub mod message;
pub mod provider;

pub use message::{ChatTurn, ConversationHistory, MessageRole};
pub use provider::{ProviderKind, ProviderResult, ProviderTag};
