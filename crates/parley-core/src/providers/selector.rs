//! Provider selection

use tracing::{debug, warn};

use crate::config::InvokerConfig;

use super::types::ProviderId;

/// Pick the provider for one call. First present wins: explicit override,
/// pinned provider, GenericChat base URL, Anthropic credential. With none of
/// those this falls back to GenericChat and the missing configuration is
/// reported later by the client.
pub fn select(explicit: Option<ProviderId>, config: &InvokerConfig) -> ProviderId {
    if let Some(id) = explicit {
        debug!("Provider {} chosen by explicit override", id);
        return id;
    }
    if let Some(id) = config.provider {
        debug!("Provider {} pinned by configuration", id);
        return id;
    }
    if config.has_generic_chat_endpoint() {
        return ProviderId::GenericChat;
    }
    if config.has_anthropic_credential() {
        return ProviderId::Anthropic;
    }

    warn!("No provider configured; defaulting to {}", ProviderId::GenericChat);
    ProviderId::GenericChat
}
