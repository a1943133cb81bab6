//! Read-only invocation configuration
//!
//! Built once at startup and passed by reference to the selector and the
//! clients. Nothing here is mutated during a call.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::providers::types::ProviderId;

pub const DEFAULT_MAX_TOKENS: u32 = 32_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
/// Must accept [`DEFAULT_MAX_TOKENS`] completion tokens (gpt-4.1 allows 32768)
pub const DEFAULT_GENERIC_CHAT_MODEL: &str = "gpt-4.1";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

pub const ENV_PROVIDER: &str = "PARLEY_PROVIDER";
pub const ENV_GENERIC_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_GENERIC_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const ENV_MODEL: &str = "PARLEY_MODEL";
pub const ENV_MAX_TOKENS: &str = "PARLEY_MAX_TOKENS";
pub const ENV_TEMPERATURE: &str = "PARLEY_TEMPERATURE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvokerConfig {
    /// Provider pinned by configuration, consulted after an explicit override
    #[serde(default)]
    pub provider: Option<ProviderId>,
    #[serde(default)]
    pub generic_chat: GenericChatConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub default_max_tokens: Option<u32>,
    #[serde(default)]
    pub default_temperature: Option<f32>,
}

#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericChatConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl std::fmt::Debug for GenericChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericChatConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .finish()
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_base_url(),
        }
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn default_anthropic_base_url() -> String {
    DEFAULT_ANTHROPIC_BASE_URL.to_string()
}

impl InvokerConfig {
    /// Load from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Blank values count as unset;
    /// values that fail to parse are ignored with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).and_then(non_blank);

        let provider = get(ENV_PROVIDER).and_then(|raw| match raw.parse::<ProviderId>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Ignoring {}: {}", ENV_PROVIDER, e);
                None
            }
        });

        Self {
            provider,
            generic_chat: GenericChatConfig {
                base_url: get(ENV_GENERIC_BASE_URL),
                api_key: get(ENV_GENERIC_API_KEY),
            },
            anthropic: AnthropicConfig {
                api_key: get(ENV_ANTHROPIC_API_KEY),
                base_url: get(ENV_ANTHROPIC_BASE_URL).unwrap_or_else(default_anthropic_base_url),
            },
            default_model: get(ENV_MODEL),
            default_max_tokens: get(ENV_MAX_TOKENS)
                .and_then(|raw| parse_or_warn(ENV_MAX_TOKENS, &raw)),
            default_temperature: get(ENV_TEMPERATURE)
                .and_then(|raw| parse_or_warn::<f32>(ENV_TEMPERATURE, &raw))
                .and_then(|t| finite_temperature(ENV_TEMPERATURE, t)),
        }
    }

    /// Whether a GenericChat base endpoint is configured
    pub fn has_generic_chat_endpoint(&self) -> bool {
        self.generic_chat.base_url.as_deref().is_some_and(is_set)
    }

    /// Whether an Anthropic credential is configured
    pub fn has_anthropic_credential(&self) -> bool {
        self.anthropic.api_key.as_deref().is_some_and(is_set)
    }

    /// Model for `provider` when the caller does not name one
    pub fn model_for(&self, provider: ProviderId) -> String {
        self.default_model
            .as_deref()
            .filter(|m| is_set(m))
            .map(str::to_string)
            .unwrap_or_else(|| match provider {
                ProviderId::GenericChat => DEFAULT_GENERIC_CHAT_MODEL.to_string(),
                ProviderId::Anthropic => DEFAULT_ANTHROPIC_MODEL.to_string(),
            })
    }

    pub fn max_tokens(&self) -> u32 {
        self.default_max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature(&self) -> f32 {
        self.default_temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }
}

pub(crate) fn is_set(s: &str) -> bool {
    !s.trim().is_empty()
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_or_warn<T: std::str::FromStr>(name: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring {}: '{}' is not a valid value", name, raw);
            None
        }
    }
}

/// Drop NaN and infinite temperatures, which serialize as JSON `null`
pub fn finite_temperature(name: &str, value: f32) -> Option<f32> {
    if value.is_finite() {
        Some(value)
    } else {
        warn!("Ignoring {}: '{}' is not a valid value", name, value);
        None
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}
