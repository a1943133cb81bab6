//! Map raw provider failures onto [`ErrorKind`]
//!
//! Matching is heuristic: HTTP status first, then substrings of the error
//! text. Classification is total; anything unrecognized becomes
//! [`ErrorKind::Unknown`] with the original error kept as the cause.

use crate::config::{ENV_ANTHROPIC_API_KEY, ENV_GENERIC_API_KEY, ENV_GENERIC_BASE_URL};
use crate::error::{ClassifiedError, ErrorKind, MissingConfig, ProviderError, TransportError};

use super::types::ProviderId;

const UNAUTHORIZED_PATTERNS: &[&str] = &[
    "unauthorized",
    "invalid api key",
    "invalid x-api-key",
    "invalid_api_key",
    "authentication",
    "permission denied",
    "forbidden",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit",
    "rate_limit",
    "too many requests",
    "quota exceeded",
];

const MODEL_PATTERNS: &[&str] = &[
    "model_not_found",
    "model not found",
    "unknown model",
    "does not exist",
    "not_found_error",
];

const NETWORK_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "dns error",
    "timed out",
    "timeout",
    "unreachable",
    "econnrefused",
];

/// Context about the failed call, used to sharpen classification and messages
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext<'a> {
    pub provider: Option<ProviderId>,
    pub model: Option<&'a str>,
}

impl<'a> CallContext<'a> {
    pub fn new(provider: ProviderId, model: &'a str) -> Self {
        Self {
            provider: Some(provider),
            model: Some(model),
        }
    }
}

/// Classify a raw failure. Never panics.
pub fn classify(error: ProviderError, ctx: CallContext<'_>) -> ClassifiedError {
    let kind = kind_of(&error, ctx);
    let message = describe(kind, &error, ctx);
    ClassifiedError::new(kind, message, error)
}

fn kind_of(error: &ProviderError, ctx: CallContext<'_>) -> ErrorKind {
    match error {
        ProviderError::Config {
            missing: MissingConfig::Credential,
            ..
        } => ErrorKind::Unauthorized,
        ProviderError::Config {
            missing: MissingConfig::BaseUrl,
            ..
        } => ErrorKind::ConfigMissing,
        ProviderError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        ProviderError::Unsupported(_) => ErrorKind::UnsupportedProvider,
        ProviderError::EmptyPrompt => ErrorKind::Unknown,
        ProviderError::Transport(TransportError::Connection(_)) => ErrorKind::NetworkUnreachable,
        ProviderError::Transport(TransportError::Status { status, body }) => match *status {
            401 | 403 => ErrorKind::Unauthorized,
            429 => ErrorKind::RateLimited,
            // A response arrived, so the network was reachable
            _ => kind_from_text(body, ctx)
                .filter(|k| *k != ErrorKind::NetworkUnreachable)
                .unwrap_or(ErrorKind::Unknown),
        },
        ProviderError::Transport(TransportError::Request(text)) => {
            kind_from_text(text, ctx).unwrap_or(ErrorKind::Unknown)
        }
    }
}

fn kind_from_text(text: &str, ctx: CallContext<'_>) -> Option<ErrorKind> {
    let lower = text.to_lowercase();
    let has = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

    if has(RATE_LIMIT_PATTERNS) {
        return Some(ErrorKind::RateLimited);
    }
    if has(UNAUTHORIZED_PATTERNS) {
        return Some(ErrorKind::Unauthorized);
    }
    let names_model = ctx
        .model
        .filter(|m| !m.trim().is_empty())
        .is_some_and(|m| lower.contains(&m.to_lowercase()));
    if names_model || has(MODEL_PATTERNS) {
        return Some(ErrorKind::ModelUnavailable);
    }
    if has(NETWORK_PATTERNS) {
        return Some(ErrorKind::NetworkUnreachable);
    }
    None
}

fn describe(kind: ErrorKind, error: &ProviderError, ctx: CallContext<'_>) -> String {
    if let ProviderError::Config {
        provider: ProviderId::Anthropic,
        missing: MissingConfig::Credential,
    } = error
    {
        return format!(
            "No Anthropic API key configured. Set {}.",
            ENV_ANTHROPIC_API_KEY
        );
    }

    if let ProviderError::EmptyPrompt = error {
        return "Prompt is empty; nothing was sent to the provider.".to_string();
    }

    let model = ctx.model.unwrap_or("the requested model");
    match (kind, ctx.provider) {
        (ErrorKind::ConfigMissing, Some(ProviderId::GenericChat)) => format!(
            "No chat-completions endpoint configured. Set {} (e.g. http://localhost:11434/v1).",
            ENV_GENERIC_BASE_URL
        ),
        (ErrorKind::ConfigMissing, _) => "Required provider configuration is missing.".to_string(),
        (ErrorKind::Unauthorized, Some(ProviderId::Anthropic)) => format!(
            "Anthropic rejected the request as unauthorized. Check {}.",
            ENV_ANTHROPIC_API_KEY
        ),
        (ErrorKind::Unauthorized, Some(ProviderId::GenericChat)) => format!(
            "The chat-completions endpoint rejected the request as unauthorized. Check {}.",
            ENV_GENERIC_API_KEY
        ),
        (ErrorKind::Unauthorized, None) => {
            "The provider rejected the request as unauthorized.".to_string()
        }
        (ErrorKind::RateLimited, Some(p)) => {
            format!("Rate limited by {}. Try again later.", p.label())
        }
        (ErrorKind::RateLimited, None) => {
            "Rate limited by the provider. Try again later.".to_string()
        }
        (ErrorKind::ModelUnavailable, Some(p)) => {
            format!("Model '{}' is not available from {}.", model, p.label())
        }
        (ErrorKind::ModelUnavailable, None) => format!("Model '{}' is not available.", model),
        (ErrorKind::NetworkUnreachable, Some(p)) => {
            format!("Could not reach {}: {}", p.label(), error)
        }
        (ErrorKind::NetworkUnreachable, None) => {
            format!("Could not reach the provider: {}", error)
        }
        (ErrorKind::MalformedResponse, Some(p)) => {
            format!("Unexpected response from {}: {}", p.label(), error)
        }
        (ErrorKind::MalformedResponse, None) => format!("Unexpected provider response: {}", error),
        (ErrorKind::UnsupportedProvider, _) => error.to_string(),
        (ErrorKind::Unknown, Some(p)) => format!("Call to {} failed: {}", p.label(), error),
        (ErrorKind::Unknown, None) => format!("Provider call failed: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, body: &str) -> ProviderError {
        ProviderError::Transport(TransportError::Status {
            status,
            body: body.to_string(),
        })
    }

    fn anthropic() -> CallContext<'static> {
        CallContext::new(ProviderId::Anthropic, "claude-sonnet-4-5")
    }

    fn generic() -> CallContext<'static> {
        CallContext::new(ProviderId::GenericChat, "llama3")
    }

    #[test]
    fn test_rate_limited_keeps_status() {
        for ctx in [anthropic(), generic()] {
            let err = classify(status(429, "slow down"), ctx);
            assert_eq!(err.kind(), ErrorKind::RateLimited);
            assert_eq!(err.status(), Some(429));
        }
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert_eq!(classify(status(401, ""), anthropic()).kind(), ErrorKind::Unauthorized);
        assert_eq!(classify(status(403, ""), generic()).kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_missing_credential_is_unauthorized() {
        let err = classify(
            ProviderError::Config {
                provider: ProviderId::Anthropic,
                missing: MissingConfig::Credential,
            },
            anthropic(),
        );
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.message().contains(ENV_ANTHROPIC_API_KEY));
    }

    #[test]
    fn test_missing_base_url_is_config_missing() {
        let err = classify(
            ProviderError::Config {
                provider: ProviderId::GenericChat,
                missing: MissingConfig::BaseUrl,
            },
            generic(),
        );
        assert_eq!(err.kind(), ErrorKind::ConfigMissing);
        assert!(err.message().contains(ENV_GENERIC_BASE_URL));
    }

    #[test]
    fn test_model_named_in_body() {
        let err = classify(
            status(400, r#"{"error": "llama3 is not loaded"}"#),
            generic(),
        );
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert!(err.message().contains("llama3"));
    }

    #[test]
    fn test_model_not_found_pattern() {
        let err = classify(
            status(404, r#"{"error": {"code": "model_not_found"}}"#),
            CallContext::default(),
        );
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_rate_limit_text_without_429() {
        let err = classify(status(503, "rate_limit_error: overloaded"), anthropic());
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }

    #[test]
    fn test_connection_is_network_unreachable() {
        let err = classify(
            ProviderError::Transport(TransportError::Connection("connection refused".into())),
            generic(),
        );
        assert_eq!(err.kind(), ErrorKind::NetworkUnreachable);
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_gateway_timeout_body_is_not_network_unreachable() {
        let err = classify(status(504, "upstream request timed out"), generic());
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.status(), Some(504));
    }

    #[test]
    fn test_gateway_body_naming_model_still_classified() {
        let err = classify(status(502, "llama3 timed out while loading"), generic());
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
    }

    #[test]
    fn test_malformed_and_unsupported() {
        let err = classify(ProviderError::MalformedResponse("no choices".into()), generic());
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);

        let err = classify(
            ProviderError::Unsupported("gemini".into()),
            CallContext::default(),
        );
        assert_eq!(err.kind(), ErrorKind::UnsupportedProvider);
    }

    #[test]
    fn test_empty_prompt_message() {
        let err = classify(ProviderError::EmptyPrompt, generic());
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.message().contains("Prompt is empty"));
    }

    #[test]
    fn test_unrecognized_is_unknown_with_cause() {
        let err = classify(status(500, "internal server error"), anthropic());
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert!(err.cause().to_string().contains("internal server error"));
    }

    #[test]
    fn test_empty_model_name_does_not_match_everything() {
        let err = classify(status(500, "boom"), CallContext::new(ProviderId::GenericChat, ""));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
