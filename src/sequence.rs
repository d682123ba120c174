//! 消息序列校验：保证 system 之后 user/assistant 严格交替。
//!
//! Role-alternation repair for conversation histories.
//!
//! Chat completion APIs reject (or silently mangle) histories where two user
//! or two assistant turns are adjacent, where the first non-system turn is not
//! a user turn, or where the history ends on an assistant turn. The validator
//! inserts short synthetic turns to restore the pattern and is applied to
//! every history before any provider sees it.

use crate::types::{ChatTurn, ConversationHistory, MessageRole};

/// Filler content used for synthesised turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholders {
    /// Inserted when the first non-system turn is not from the user.
    pub leading_user: String,
    /// Inserted between two adjacent user turns.
    pub assistant_gap: String,
    /// Inserted between two adjacent assistant turns.
    pub user_gap: String,
    /// Appended when the history ends on an assistant turn.
    pub trailing_user: String,
}

impl Placeholders {
    pub fn for_language(language: &str) -> Self {
        Self {
            leading_user: "Hi".to_string(),
            assistant_gap: format!("How would you say 'hello' in {}?", language),
            user_gap: format!("Let me share a {} phrase.", language),
            trailing_user: format!("I'd like to share a {} word.", language),
        }
    }
}

impl Default for Placeholders {
    fn default() -> Self {
        Self::for_language(crate::prompts::DEFAULT_LANGUAGE)
    }
}

/// Return a copy of `history` satisfying the alternation invariant.
///
/// All system turns are merged, in order, into a single leading system turn.
/// A history without any non-system turn is returned unchanged.
pub fn validate_sequence(history: &[ChatTurn], placeholders: &Placeholders) -> ConversationHistory {
    if history.iter().all(ChatTurn::is_system) {
        return history.to_vec();
    }

    let mut out = Vec::with_capacity(history.len() + 2);

    let system: Vec<&str> = history
        .iter()
        .filter(|t| t.is_system())
        .map(|t| t.content.as_str())
        .collect();
    if !system.is_empty() {
        out.push(ChatTurn::system(system.join("\n\n")));
    }

    let mut prev: Option<MessageRole> = None;
    for turn in history.iter().filter(|t| !t.is_system()) {
        match (prev, turn.role) {
            (None, MessageRole::Assistant) => {
                out.push(ChatTurn::user(placeholders.leading_user.as_str()))
            }
            (Some(MessageRole::User), MessageRole::User) => {
                out.push(ChatTurn::assistant(placeholders.assistant_gap.as_str()))
            }
            (Some(MessageRole::Assistant), MessageRole::Assistant) => {
                out.push(ChatTurn::user(placeholders.user_gap.as_str()))
            }
            _ => {}
        }
        out.push(turn.clone());
        prev = Some(turn.role);
    }

    if prev == Some(MessageRole::Assistant) {
        out.push(ChatTurn::user(placeholders.trailing_user.as_str()));
    }

    out
}

/// Check the alternation invariant without modifying anything.
pub fn is_valid_sequence(history: &[ChatTurn]) -> bool {
    let leading_system = history.iter().take_while(|t| t.is_system()).count();
    if leading_system > 1 {
        return false;
    }
    let rest = &history[leading_system..];
    if rest.is_empty() {
        return true;
    }
    if rest.iter().any(ChatTurn::is_system) {
        return false;
    }
    if rest[0].role != MessageRole::User {
        return false;
    }
    if rest.last().map(|t| t.role) == Some(MessageRole::Assistant) {
        return false;
    }
    rest.windows(2).all(|w| w[0].role != w[1].role)
}
