//! parley-core - provider-agnostic text generation
//!
//! This crate provides:
//! - Prompt normalization from several input shapes into each provider's schema
//! - Provider selection from configuration and per-call overrides
//! - Clients for OpenAI-compatible chat-completions endpoints and Anthropic
//! - Classification of every failure into a closed [`ErrorKind`] taxonomy
//!
//! The entry point is [`UnifiedInvoker::invoke`].

pub mod config;
pub mod error;
pub mod invoker;
pub mod providers;

// Re-export main types for convenience
pub use config::InvokerConfig;
pub use error::{ClassifiedError, ErrorKind, ProviderError, TransportError};
pub use invoker::UnifiedInvoker;
pub use providers::{InvocationOptions, Message, PromptInput, ProviderId, Role};
