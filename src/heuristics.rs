//! 启发式分类：确认语、问候语、目标语言标记与不完整句子检测。
//!
//! Heuristic classification of a trainer's message.
//!
//! These rules are best-effort string checks used to pick between canned and
//! model-generated replies. They are not a grammar model and will misfire on
//! some inputs; callers must treat the flags as hints only.

/// Flags derived from one user message. Recomputed per message, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationFlags {
    pub is_acknowledgement: bool,
    pub is_likely_incomplete: bool,
    pub is_greeting: bool,
    pub contains_target_language_markers: bool,
}

const ACKNOWLEDGEMENTS: &[&str] = &["okay", "ok", "k", "kk", "alright", "alrighty", "sure"];

const GREETINGS: &[&str] = &["hi", "hello", "hey", "greetings"];

/// Words after which a sentence is expected to continue. Only words that
/// cannot close a sentence belong here: "thank you" and "I love it" are done.
const CONTINUATION_WORDS: &[&str] = &[
    // subject pronouns and articles
    "we", "i", "they", "he", "she", "the", "a", "an",
    // fillers
    "like", "so", "just", "very", "really", "basically", "actually",
    // conjunctions and prepositions
    "and", "or", "but", "with", "for", "to", "by", "on", "in", "at", "from",
];

/// Messages seen cut off often enough to be listed verbatim.
const KNOWN_TRUNCATED: &[&str] = &["we use", "we use.", "we used", "we used."];

const WORD_PUNCTUATION: &[char] = &['.', ',', '?', '!', ';', ':', '\'', '"', '(', ')'];

/// Combining low line (U+0332), written under a vowel in Tangkhul orthography.
const COMBINING_LOW_LINE: char = '\u{0332}';

/// Lower-case, trim and collapse internal whitespace.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Classify a raw user message.
pub fn classify(text: &str) -> ClassificationFlags {
    let normalized = normalize(text);
    ClassificationFlags {
        is_acknowledgement: is_acknowledgement(&normalized),
        is_likely_incomplete: is_likely_incomplete(&normalized),
        is_greeting: is_greeting(&normalized),
        contains_target_language_markers: contains_target_language_markers(text),
    }
}

/// Exact match against the acknowledgement set, ignoring trailing `.` and `!`.
pub fn is_acknowledgement(normalized: &str) -> bool {
    let bare = normalized.trim_end_matches(&['.', '!'][..]);
    ACKNOWLEDGEMENTS.contains(&bare)
}

/// Exact match, or the first word (punctuation stripped) is a greeting.
pub fn is_greeting(normalized: &str) -> bool {
    if GREETINGS.contains(&normalized) {
        return true;
    }
    normalized
        .split_whitespace()
        .next()
        .map(strip_word_punctuation)
        .is_some_and(|first| GREETINGS.contains(&first))
}

/// Macron-a or underlined-a in either case.
pub fn contains_target_language_markers(text: &str) -> bool {
    if text.contains(&['ā', 'Ā'][..]) {
        return true;
    }
    let mut prev: Option<char> = None;
    for c in text.chars() {
        if c == COMBINING_LOW_LINE && matches!(prev, Some('a') | Some('A')) {
            return true;
        }
        prev = Some(c);
    }
    false
}

pub fn is_likely_incomplete(normalized: &str) -> bool {
    if KNOWN_TRUNCATED.contains(&normalized) {
        return true;
    }

    let words: Vec<&str> = normalized.split_whitespace().collect();
    let Some(last) = words.last() else {
        return false;
    };
    let word_count = words.len();
    let ends_with_continuation = CONTINUATION_WORDS.contains(&strip_word_punctuation(last));
    if !ends_with_continuation {
        return false;
    }

    let has_terminal_punctuation = normalized.ends_with(&['.', '?', '!'][..]);
    word_count <= 3 || (!has_terminal_punctuation && word_count > 1)
}

fn strip_word_punctuation(word: &str) -> &str {
    word.trim_matches(WORD_PUNCTUATION)
}
