//! Provider identity and the orchestrator's result record.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote chat-completion backend.
///
/// Serialized as `primary` or `secondary`. Decoding goes through
/// [`ProviderKind::parse`], so it ignores case and accepts the names the
/// trainer front-end historically sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Primary,
    Secondary,
}

const PROVIDER_NAMES: &[&str] = &["primary", "secondary", "chatgpt", "openai", "perplexity"];

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Secondary => "secondary",
        }
    }

    /// The other backend.
    pub fn alternate(&self) -> Self {
        match self {
            ProviderKind::Primary => ProviderKind::Secondary,
            ProviderKind::Secondary => ProviderKind::Primary,
        }
    }

    /// Parse a provider name, accepting the same aliases as the JSON decoder.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "primary" | "chatgpt" | "openai" => Some(ProviderKind::Primary),
            "secondary" | "perplexity" => Some(ProviderKind::Secondary),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ProviderKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        ProviderKind::parse(&name).ok_or_else(|| de::Error::unknown_variant(&name, PROVIDER_NAMES))
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderTag {
    Primary,
    Secondary,
    Local,
}

impl From<ProviderKind> for ProviderTag {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Primary => ProviderTag::Primary,
            ProviderKind::Secondary => ProviderTag::Secondary,
        }
    }
}

impl fmt::Display for ProviderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProviderTag::Primary => "primary",
            ProviderTag::Secondary => "secondary",
            ProviderTag::Local => "local",
        })
    }
}

/// Reply text plus provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderResult {
    pub text: String,
    pub provider: ProviderTag,
    /// True when the text did not come from the preferred provider.
    pub used_fallback: bool,
}

impl ProviderResult {
    pub fn local(text: impl Into<String>, used_fallback: bool) -> Self {
        Self {
            text: text.into(),
            provider: ProviderTag::Local,
            used_fallback,
        }
    }
}
