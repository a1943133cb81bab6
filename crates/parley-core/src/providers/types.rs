//! Provider-agnostic types for prompt invocation

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;

/// Upstream provider families this layer can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    Anthropic,
    #[serde(alias = "generic", alias = "openai", alias = "openai_compat")]
    GenericChat,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::GenericChat => "generic_chat",
        }
    }

    /// Human-readable label used in error messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anthropic => "Anthropic",
            Self::GenericChat => "the chat-completions endpoint",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderId {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "generic" | "generic_chat" | "generic-chat" | "openai" | "openai_compat" => {
                Ok(Self::GenericChat)
            }
            _ => Err(ProviderError::Unsupported(s.trim().to_string())),
        }
    }
}

/// Neutral message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a role spelling from any supported provider. Unknown spellings
    /// return `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "system" => Some(Self::System),
            "user" | "human" => Some(Self::User),
            "assistant" | "ai" | "model" => Some(Self::Assistant),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One conversational turn in neutral form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Prompt shapes accepted from callers.
///
/// Typed callers build a variant directly. Untyped JSON goes through
/// [`PromptInput::detect`], which never fails.
#[derive(Debug, Clone, PartialEq)]
pub enum PromptInput {
    /// A single user turn
    Text(String),
    /// Messages already in neutral form
    Messages(Vec<Message>),
    /// Bare strings alternating user/assistant, starting with user
    Alternating(Vec<String>),
    /// Optional system prompt plus neutral turns
    Structured {
        system: Option<String>,
        turns: Vec<Message>,
    },
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for PromptInput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<Message>> for PromptInput {
    fn from(messages: Vec<Message>) -> Self {
        Self::Messages(messages)
    }
}

impl From<Vec<String>> for PromptInput {
    fn from(turns: Vec<String>) -> Self {
        Self::Alternating(turns)
    }
}

impl From<Value> for PromptInput {
    fn from(value: Value) -> Self {
        Self::detect(value)
    }
}

/// Per-call overrides. Unset fields fall back to configuration, then to
/// hardcoded defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl InvocationOptions {
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

// ── Native message shapes ──

/// Role spelling of the chat-completions schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenericChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericChatMessage {
    pub role: GenericChatRole,
    pub content: String,
}

/// Role of an Anthropic turn. The human side goes over the wire as `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnthropicRole {
    #[serde(rename = "user")]
    Human,
    #[serde(rename = "assistant")]
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnthropicTurn {
    pub role: AnthropicRole,
    pub content: String,
}

/// A prompt already shaped for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeMessages {
    GenericChat(Vec<GenericChatMessage>),
    Anthropic {
        system: Option<String>,
        turns: Vec<AnthropicTurn>,
    },
}

impl NativeMessages {
    pub fn provider(&self) -> ProviderId {
        match self {
            Self::GenericChat(_) => ProviderId::GenericChat,
            Self::Anthropic { .. } => ProviderId::Anthropic,
        }
    }

    /// Number of turns that will be sent, excluding an out-of-band system field
    pub fn len(&self) -> usize {
        match self {
            Self::GenericChat(messages) => messages.len(),
            Self::Anthropic { turns, .. } => turns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fully resolved request handed to a [`ChatProvider`]
#[derive(Debug, Clone, PartialEq)]
pub struct NativeRequest {
    pub messages: NativeMessages,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Trait that both provider clients implement
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn provider_id(&self) -> ProviderId;

    /// Send one request and return the generated text
    async fn invoke(&self, request: &NativeRequest) -> Result<String, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_id_parse() {
        assert_eq!("anthropic".parse::<ProviderId>().unwrap(), ProviderId::Anthropic);
        assert_eq!("OpenAI".parse::<ProviderId>().unwrap(), ProviderId::GenericChat);
        assert_eq!(" generic ".parse::<ProviderId>().unwrap(), ProviderId::GenericChat);
        assert!(matches!(
            "gemini".parse::<ProviderId>(),
            Err(ProviderError::Unsupported(name)) if name == "gemini"
        ));
    }

    #[test]
    fn test_provider_id_display_round_trips() {
        for id in [ProviderId::Anthropic, ProviderId::GenericChat] {
            assert_eq!(id.to_string().parse::<ProviderId>().unwrap(), id);
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Human"), Some(Role::User));
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("SYSTEM"), Some(Role::System));
        assert_eq!(Role::parse("tool"), None);
    }

    #[test]
    fn test_anthropic_role_wire_spelling() {
        let turn = AnthropicTurn {
            role: AnthropicRole::Human,
            content: "hi".to_string(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn test_options_builder() {
        let opts = InvocationOptions::default()
            .with_provider(ProviderId::Anthropic)
            .with_model("claude-haiku")
            .with_max_tokens(100)
            .with_temperature(0.7);
        assert_eq!(opts.provider, Some(ProviderId::Anthropic));
        assert_eq!(opts.model.as_deref(), Some("claude-haiku"));
        assert_eq!(opts.max_tokens, Some(100));
        assert_eq!(opts.temperature, Some(0.7));
    }
}
