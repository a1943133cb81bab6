//! Provider layer
//!
//! Prompts are normalized into a provider's native schema, sent by the
//! matching [`ChatProvider`] client, and failures are classified into
//! [`crate::error::ErrorKind`].

pub mod anthropic;
pub mod classify;
pub mod normalize;
pub mod openai_compat;
pub mod selector;
pub mod types;

pub use anthropic::AnthropicClient;
pub use classify::{CallContext, classify};
pub use normalize::to_provider_shape;
pub use openai_compat::GenericChatClient;
pub use selector::select;
pub use types::{
    ChatProvider, InvocationOptions, Message, NativeMessages, NativeRequest, PromptInput,
    ProviderId, Role,
};
