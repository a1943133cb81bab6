//! Error types for provider calls

use thiserror::Error;

use crate::providers::types::ProviderId;

/// Configuration a client needs but did not get
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingConfig {
    /// GenericChat has no base endpoint
    BaseUrl,
    /// Anthropic has no credential
    Credential,
}

impl std::fmt::Display for MissingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BaseUrl => write!(f, "base URL"),
            Self::Credential => write!(f, "API key"),
        }
    }
}

/// Transport-level failure of a provider call
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote responded outside 2xx
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// No response was received
    #[error("connection failed: {0}")]
    Connection(String),

    /// The request could not be built locally
    #[error("invalid request: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::Request(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Raw failure from normalization, client construction or the network call.
/// Always wrapped in a [`ClassifiedError`] before it reaches callers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is missing its {missing}")]
    Config {
        provider: ProviderId,
        missing: MissingConfig,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("no client available for provider '{0}'")]
    Unsupported(String),

    /// Every turn was blank after normalization, so nothing was sent
    #[error("prompt has no non-empty turns")]
    EmptyPrompt,
}

/// Closed failure taxonomy surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigMissing,
    Unauthorized,
    RateLimited,
    ModelUnavailable,
    NetworkUnreachable,
    MalformedResponse,
    UnsupportedProvider,
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissing => "config_missing",
            Self::Unauthorized => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ModelUnavailable => "model_unavailable",
            Self::NetworkUnreachable => "network_unreachable",
            Self::MalformedResponse => "malformed_response",
            Self::UnsupportedProvider => "unsupported_provider",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type returned by [`crate::UnifiedInvoker::invoke`]
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ClassifiedError {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: ProviderError,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, cause: ProviderError) -> Self {
        Self {
            kind,
            message: message.into(),
            cause,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// The unclassified original failure
    pub fn cause(&self) -> &ProviderError {
        &self.cause
    }

    pub fn into_cause(self) -> ProviderError {
        self.cause
    }

    /// HTTP status of the original failure, if the remote responded
    pub fn status(&self) -> Option<u16> {
        match &self.cause {
            ProviderError::Transport(TransportError::Status { status, .. }) => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_config_error_display() {
        let err = ProviderError::Config {
            provider: ProviderId::Anthropic,
            missing: MissingConfig::Credential,
        };
        assert_eq!(err.to_string(), "anthropic is missing its API key");
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err: ProviderError = TransportError::Status {
            status: 500,
            body: "boom".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "request failed with status 500: boom");
    }

    #[test]
    fn test_classified_error_exposes_cause() {
        let err = ClassifiedError::new(
            ErrorKind::RateLimited,
            "slow down",
            ProviderError::Transport(TransportError::Status {
                status: 429,
                body: "too many".to_string(),
            }),
        );
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.to_string(), "slow down");
        assert_eq!(err.status(), Some(429));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_status_absent_without_response() {
        let err = ClassifiedError::new(
            ErrorKind::NetworkUnreachable,
            "offline",
            ProviderError::Transport(TransportError::Connection("refused".to_string())),
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::ModelUnavailable.to_string(), "model_unavailable");
        assert_eq!(ErrorKind::Unknown.to_string(), "unknown");
    }
}
