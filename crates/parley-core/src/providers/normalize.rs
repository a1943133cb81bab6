//! Prompt shape detection and per-provider message shaping

use serde_json::{Map, Value};
use tracing::debug;

use super::types::{
    AnthropicRole, AnthropicTurn, GenericChatMessage, GenericChatRole, Message, NativeMessages,
    PromptInput, ProviderId, Role,
};

const ROLE_FIELDS: &[&str] = &["role", "speaker", "author"];
const CONTENT_FIELDS: &[&str] = &["content", "text", "message"];
const TURN_FIELDS: &[&str] = &["messages", "turns"];

impl PromptInput {
    /// Classify untyped input by structure. First matching rule wins:
    ///
    /// 1. string: a single user turn
    /// 2. array whose first element carries role and content fields: neutral messages
    /// 3. array of strings: alternating user/assistant turns
    /// 4. object with `system` and/or `messages`/`turns`: structured prompt
    /// 5. anything else: the whole value stringified as one user turn
    pub fn detect(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Array(items) if items.first().is_some_and(is_message_like) => {
                Self::Messages(items.iter().map(message_from_value).collect())
            }
            Value::Array(items) if items.iter().all(Value::is_string) => {
                Self::Alternating(items.into_iter().map(value_to_text).collect())
            }
            Value::Object(ref map) if is_structured(map) => {
                let system = map.get("system").map(content_to_text);
                let turns = TURN_FIELDS
                    .iter()
                    .find_map(|k| map.get(*k))
                    .map(|v| match v {
                        Value::Array(items) => items.iter().map(message_from_value).collect(),
                        other => vec![message_from_value(other)],
                    })
                    .unwrap_or_default();
                Self::Structured { system, turns }
            }
            other => {
                debug!("Unrecognized prompt shape, sending it as a single user turn");
                Self::Text(value_to_text(other))
            }
        }
    }

    /// Flatten into neutral messages, dropping turns with no content
    pub fn to_messages(&self) -> Vec<Message> {
        let messages = match self {
            Self::Text(text) => vec![Message::user(text.clone())],
            Self::Messages(messages) => messages.clone(),
            Self::Alternating(turns) => turns
                .iter()
                .enumerate()
                .map(|(i, text)| {
                    let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
                    Message::new(role, text.clone())
                })
                .collect(),
            Self::Structured { system, turns } => system
                .iter()
                .map(|s| Message::system(s.clone()))
                .chain(turns.iter().cloned())
                .collect(),
        };

        messages
            .into_iter()
            .filter(|m| !m.content.trim().is_empty())
            .collect()
    }
}

/// Shape a prompt for one provider's native schema
pub fn to_provider_shape(input: &PromptInput, target: ProviderId) -> NativeMessages {
    let messages = input.to_messages();
    match target {
        ProviderId::GenericChat => NativeMessages::GenericChat(to_generic_chat(&messages)),
        ProviderId::Anthropic => {
            let (system, turns) = to_anthropic(&messages);
            NativeMessages::Anthropic { system, turns }
        }
    }
}

fn to_generic_chat(messages: &[Message]) -> Vec<GenericChatMessage> {
    messages
        .iter()
        .map(|m| GenericChatMessage {
            role: match m.role {
                Role::System => GenericChatRole::System,
                Role::User => GenericChatRole::User,
                Role::Assistant => GenericChatRole::Assistant,
            },
            content: m.content.clone(),
        })
        .collect()
}

/// System messages move to the out-of-band field, joined by a blank line.
/// Remaining turns keep their relative order.
fn to_anthropic(messages: &[Message]) -> (Option<String>, Vec<AnthropicTurn>) {
    let mut system_parts = Vec::new();
    let mut turns = Vec::new();

    for m in messages {
        match m.role {
            Role::System => system_parts.push(m.content.as_str()),
            Role::User => turns.push(AnthropicTurn {
                role: AnthropicRole::Human,
                content: m.content.clone(),
            }),
            Role::Assistant => turns.push(AnthropicTurn {
                role: AnthropicRole::Assistant,
                content: m.content.clone(),
            }),
        }
    }

    let system = if system_parts.is_empty() {
        None
    } else {
        Some(system_parts.join("\n\n"))
    };
    (system, turns)
}

fn is_message_like(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        ROLE_FIELDS.iter().any(|k| map.contains_key(*k))
            && CONTENT_FIELDS.iter().any(|k| map.contains_key(*k))
    })
}

fn is_structured(map: &Map<String, Value>) -> bool {
    map.contains_key("system") || TURN_FIELDS.iter().any(|k| map.contains_key(*k))
}

fn message_from_value(value: &Value) -> Message {
    let Some(map) = value.as_object() else {
        return Message::user(value_to_text(value.clone()));
    };

    let role = ROLE_FIELDS
        .iter()
        .find_map(|k| map.get(*k))
        .and_then(Value::as_str)
        .and_then(|raw| {
            let parsed = Role::parse(raw);
            if parsed.is_none() {
                debug!("Unknown role '{}', treating it as user", raw);
            }
            parsed
        })
        .unwrap_or(Role::User);

    let content = CONTENT_FIELDS
        .iter()
        .find_map(|k| map.get(*k))
        .map(content_to_text)
        .unwrap_or_default();

    Message::new(role, content)
}

/// Text of a content field: strings as-is, block arrays flattened to their
/// text parts, anything else as JSON.
fn content_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(blocks) if blocks.iter().all(|b| b.is_string() || b.get("text").is_some()) => {
            blocks
                .iter()
                .filter_map(|b| b.as_str().or_else(|| b.get("text").and_then(Value::as_str)))
                .collect::<Vec<_>>()
                .join("\n")
        }
        other => other.to_string(),
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
