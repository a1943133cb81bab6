//! Anthropic Messages API client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::{AnthropicConfig, is_set};
use crate::error::{MissingConfig, ProviderError, TransportError};

use super::types::{AnthropicTurn, ChatProvider, NativeMessages, NativeRequest, ProviderId};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl AnthropicClient {
    /// Fails fast when no credential is configured; there is no
    /// unauthenticated mode.
    pub fn new(client: Client, config: &AnthropicConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| is_set(k))
            .ok_or(ProviderError::Config {
                provider: ProviderId::Anthropic,
                missing: MissingConfig::Credential,
            })?
            .to_string();

        let raw = format!("{}/v1/messages", config.base_url.trim().trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|e| {
            TransportError::Request(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Text of the first content block
    fn extract_text(body: &str) -> Result<String, ProviderError> {
        let resp: AnthropicResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::MalformedResponse(format!("response is not valid JSON: {}", e))
        })?;

        resp.content
            .and_then(|blocks| blocks.into_iter().next())
            .and_then(|block| block.text)
            .ok_or_else(|| ProviderError::MalformedResponse("`content[0].text` is missing".into()))
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn invoke(&self, request: &NativeRequest) -> Result<String, ProviderError> {
        let NativeMessages::Anthropic { system, turns } = &request.messages else {
            return Err(TransportError::Request(format!(
                "{} messages cannot be sent to Anthropic",
                request.messages.provider()
            ))
            .into());
        };

        let body = AnthropicRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: system.as_deref(),
            messages: turns,
        };

        debug!(
            "Anthropic request: model={}, turns={}, system={}",
            request.model,
            turns.len(),
            system.is_some()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(TransportError::from)?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                TransportError::Connection(format!("failed to read response body: {}", e))
            })?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        let content = Self::extract_text(&text)?;
        debug!("Anthropic response: {} chars", content.len());
        Ok(content)
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [AnthropicTurn],
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Option<Vec<AnthropicBlock>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    text: Option<String>,
}
