//! Canned text used when no model reply is wanted or available.
//!
//! Every template is written against the target language name so the same
//! book serves any minority language the trainers collect.

use crate::heuristics::{self, ClassificationFlags};
use crate::types::{ChatTurn, MessageRole};
use rand::seq::SliceRandom;

pub const DEFAULT_LANGUAGE: &str = "Tangkhul";

const LANG: &str = "{lang}";

const GREETING_PROMPTS: &[&str] = &[
    "Nice to meet you! How would you say 'hello' in {lang}?",
    "Hello there! What's the {lang} word for 'greeting'?",
    "Hi! I'd love to know how to say 'good morning' in {lang}.",
    "Hello! How do people greet each other in {lang}?",
    "Hi there! Could you teach me how to say 'welcome' in {lang}?",
];

const GENERAL_PROMPTS: &[&str] = &[
    "What do you call 'water' in {lang}?",
    "How would you say 'food' in {lang} language?",
    "What's the {lang} word for 'friend'?",
    "How do you say 'thank you' in {lang}?",
    "What do you call 'home' or 'house' in {lang}?",
    "How would you translate 'village' to {lang}?",
    "What's the {lang} term for 'family'?",
    "How do you say 'tree' in {lang}?",
    "What do people call the 'sun' in {lang}?",
    "How would you say 'beautiful' in {lang}?",
    "What's the {lang} word for 'love'?",
    "How do you say 'goodbye' in {lang}?",
];

const GLOSS_PROMPTS: &[&str] = &[
    "Thank you for sharing that! What does it mean in English?",
    "That looks like {lang}! Could you tell me what it means in English?",
    "Lovely, thank you. How would you translate that into English?",
];

const GREETING_CLARIFICATIONS: &[&str] = &[
    "Could you please share the complete greeting in {lang} language?",
    "I'd love to hear how people greet each other in {lang}. Could you share the complete phrase?",
    "What greeting words or phrases do people use in {lang}? Could you share the full expression?",
];

const WE_USE_CLARIFICATIONS: &[&str] = &[
    "What exactly do you use in {lang}? Could you complete your thought?",
    "What phrase or word do you use? I'd love to learn the complete {lang} expression.",
    "Could you share the complete expression that you use in {lang}?",
];

const GENERIC_CLARIFICATIONS: &[&str] = &[
    "Could you please complete your thought? I'm interested in learning the full phrase.",
    "I think your message might be incomplete. Could you share the complete thought or phrase?",
    "I'd like to hear more about what you were going to say. Could you share the complete phrase or thought?",
];

const ACKNOWLEDGEMENT_PROMPT: &str =
    "Great! Could you share a {lang} word or phrase you use every day, and tell me what it means in English?";

const OPENING_PROMPT: &str =
    "Welcome to the {lang} AI Trainer. How would you say 'hello' in {lang}?";

const GENERIC_FALLBACK: &str =
    "Thank you for sharing that. Could you tell me how you would express this in {lang}?";

const SYSTEM_PROMPT: &str = "You are a conversational AI assistant designed to collect {lang} language examples. Your purpose is to collect specific {lang} words and phrases by asking targeted translation questions.

IMPORTANT INSTRUCTIONS:
1. Focus on asking for specific translations: \"How do you say X in {lang}?\"
2. Ask about everyday objects, actions, greetings, or common phrases
3. Maintain a casual, friendly tone
4. Keep responses short (1-3 sentences)
5. If the user shares a {lang} word/phrase, ask what it means in English
6. If the user shares a meaning in English, thank them and ask for another specific translation
7. Move through different topics: greetings, food, family, nature, emotions, etc.
8. Ask one specific translation question at a time
9. Be alert for incomplete messages or sentences and ask for clarification
10. If a user message seems cut off, ask them to complete their thought rather than interpreting literally

Your goal is to collect precise vocabulary and phrases in {lang} through directed translation questions, while handling communication challenges gracefully.";

/// Prompt templates bound to one target language.
#[derive(Debug, Clone)]
pub struct PromptBook {
    language: String,
}

impl Default for PromptBook {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl PromptBook {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    fn render(&self, template: &str) -> String {
        template.replace(LANG, &self.language)
    }

    fn pick(&self, templates: &[&str]) -> String {
        let template = templates
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(GENERIC_FALLBACK);
        self.render(template)
    }

    pub fn system_turn(&self) -> ChatTurn {
        ChatTurn::system(self.render(SYSTEM_PROMPT))
    }

    /// Reply to "okay"-style messages. Fixed so clients can rely on it.
    pub fn acknowledgement(&self) -> String {
        self.render(ACKNOWLEDGEMENT_PROMPT)
    }

    /// Reply when a conversation has no user turn yet.
    pub fn opening(&self) -> String {
        self.render(OPENING_PROMPT)
    }

    /// Reply when the proxy itself failed unexpectedly.
    pub fn generic(&self) -> String {
        self.render(GENERIC_FALLBACK)
    }

    pub fn greeting_elicitation(&self) -> String {
        self.pick(GREETING_PROMPTS)
    }

    pub fn general_elicitation(&self) -> String {
        self.pick(GENERAL_PROMPTS)
    }

    pub fn english_gloss(&self) -> String {
        self.pick(GLOSS_PROMPTS)
    }

    /// Ask the trainer to finish a message that looks cut off.
    ///
    /// If the assistant was last asking about greetings the clarification
    /// stays on that topic.
    pub fn clarification(&self, user_message: &str, history: &[ChatTurn]) -> String {
        let last_assistant = history
            .iter()
            .rev()
            .find(|t| t.role == MessageRole::Assistant)
            .map(|t| t.content.to_lowercase())
            .unwrap_or_default();

        if last_assistant.contains("greet") || last_assistant.contains("hello") {
            return self.pick(GREETING_CLARIFICATIONS);
        }
        if heuristics::normalize(user_message).starts_with("we use") {
            return self.pick(WE_USE_CLARIFICATIONS);
        }
        self.pick(GENERIC_CLARIFICATIONS)
    }

    /// Local reply used when every remote provider failed.
    pub fn local_reply(
        &self,
        flags: &ClassificationFlags,
        user_message: &str,
        history: &[ChatTurn],
    ) -> String {
        if flags.contains_target_language_markers {
            self.english_gloss()
        } else if flags.is_likely_incomplete {
            self.clarification(user_message, history)
        } else if flags.is_greeting {
            self.greeting_elicitation()
        } else {
            self.general_elicitation()
        }
    }
}
