//! Response clean-up: thinking sections and paragraph spacing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const THINK_OPEN: &str = "<think>";
pub const THINK_CLOSE: &str = "</think>";

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([.!?])[ \t]+(\p{Lu})").expect("sentence break pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizeOptions {
    /// Insert a blank line between sentences.
    pub normalize_paragraphs: bool,
}

impl Default for SanitizeOptions {
    fn default() -> Self {
        Self {
            normalize_paragraphs: true,
        }
    }
}

/// Strip thinking sections and optionally re-space paragraphs.
///
/// Never returns an empty string for non-empty input: if nothing survives the
/// stripping, the original text is returned as-is.
pub fn sanitize(raw: &str, options: &SanitizeOptions) -> String {
    let stripped = strip_thinking(raw);
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        return raw.to_string();
    }
    if options.normalize_paragraphs {
        normalize_paragraphs(trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Remove `<think>…</think>` blocks.
///
/// An opening marker with no closing marker truncates the text at the marker.
/// A closing marker with no opener drops everything before it, for providers
/// that start inside the reasoning section without emitting the opener.
/// Closing markers left over after that are removed.
pub fn strip_thinking(text: &str) -> String {
    let mut rest = text;

    if let Some(close) = rest.find(THINK_CLOSE) {
        let opened_before = rest[..close].contains(THINK_OPEN);
        if !opened_before {
            rest = &rest[close + THINK_CLOSE.len()..];
        }
    }

    let mut out = String::with_capacity(rest.len());
    loop {
        let Some(open) = rest.find(THINK_OPEN) else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..open]);
        let after_open = &rest[open + THINK_OPEN.len()..];
        match after_open.find(THINK_CLOSE) {
            Some(close) => rest = &after_open[close + THINK_CLOSE.len()..],
            None => break,
        }
    }
    if out.contains(THINK_CLOSE) {
        out = out.replace(THINK_CLOSE, "");
    }
    out
}

/// Put a blank line after sentence-ending punctuation followed by a capital.
pub fn normalize_paragraphs(text: &str) -> String {
    SENTENCE_BREAK.replace_all(text, "$1\n\n$2").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: SanitizeOptions = SanitizeOptions {
        normalize_paragraphs: false,
    };

    #[test]
    fn strips_closed_block() {
        assert_eq!(
            sanitize("<think>scratch</think>Hello there", &PLAIN),
            "Hello there"
        );
    }

    #[test]
    fn unterminated_block_falls_back_to_original() {
        assert_eq!(
            sanitize("<think>unterminated", &PLAIN),
            "<think>unterminated"
        );
    }

    #[test]
    fn unterminated_block_after_text_truncates() {
        assert_eq!(
            sanitize("What is 'rain'?<think>maybe ask about", &PLAIN),
            "What is 'rain'?"
        );
    }

    #[test]
    fn multiple_blocks_are_removed() {
        assert_eq!(
            strip_thinking("a<think>x</think>b<think>y</think>c"),
            "abc"
        );
    }

    #[test]
    fn orphan_close_drops_leading_reasoning() {
        assert_eq!(
            sanitize("reasoning here</think>\nHow do you say 'tree'?", &PLAIN),
            "How do you say 'tree'?"
        );
    }

    #[test]
    fn stray_close_markers_never_leak() {
        assert_eq!(sanitize("<think>a</think>Hi</think>x", &PLAIN), "Hix");
        assert_eq!(
            sanitize("plan</think>What is 'fire'?</think>", &PLAIN),
            "What is 'fire'?"
        );
    }

    #[test]
    fn paragraphs_are_spaced() {
        assert_eq!(
            sanitize("Thank you. What is 'sun' in Tangkhul?", &SanitizeOptions::default()),
            "Thank you.\n\nWhat is 'sun' in Tangkhul?"
        );
        assert_eq!(normalize_paragraphs("e.g. this stays"), "e.g. this stays");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize("", &PLAIN), "");
    }
}
