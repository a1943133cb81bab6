//! GenericChat client for OpenAI-compatible endpoints (OpenAI, Ollama,
//! LM Studio, vLLM, Together, Groq, ...)
//!
//! The credential is optional so unauthenticated local endpoints work.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::{GenericChatConfig, is_set};
use crate::error::{MissingConfig, ProviderError, TransportError};

use super::types::{ChatProvider, GenericChatMessage, NativeMessages, NativeRequest, ProviderId};

pub struct GenericChatClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl std::fmt::Debug for GenericChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericChatClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

impl GenericChatClient {
    /// Fails fast when no base URL is configured
    pub fn new(client: Client, config: &GenericChatConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|u| is_set(u))
            .ok_or(ProviderError::Config {
                provider: ProviderId::GenericChat,
                missing: MissingConfig::BaseUrl,
            })?;

        let raw = format!("{}/chat/completions", base_url.trim().trim_end_matches('/'));
        let endpoint = Url::parse(&raw).map_err(|e| {
            TransportError::Request(format!("invalid base URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone().filter(|k| is_set(k)),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    /// Pull `choices[0].message.content` out of a response body
    fn extract_text(body: &str) -> Result<String, ProviderError> {
        let resp: GenericChatResponse = serde_json::from_str(body).map_err(|e| {
            ProviderError::MalformedResponse(format!("response is not valid JSON: {}", e))
        })?;

        resp.choices
            .ok_or_else(|| ProviderError::MalformedResponse("response has no `choices`".into()))?
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MalformedResponse("`choices` is empty".into()))?
            .message
            .and_then(|m| m.content)
            .ok_or_else(|| {
                ProviderError::MalformedResponse("`choices[0].message.content` is missing".into())
            })
    }
}

#[async_trait]
impl ChatProvider for GenericChatClient {
    fn provider_id(&self) -> ProviderId {
        ProviderId::GenericChat
    }

    async fn invoke(&self, request: &NativeRequest) -> Result<String, ProviderError> {
        let NativeMessages::GenericChat(messages) = &request.messages else {
            return Err(TransportError::Request(format!(
                "{} messages cannot be sent to the generic chat endpoint",
                request.messages.provider()
            ))
            .into());
        };

        let body = GenericChatRequest {
            model: &request.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        debug!(
            "GenericChat request: endpoint={}, model={}, messages={}",
            self.endpoint,
            request.model,
            messages.len()
        );

        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(TransportError::from)?;

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
        debug!("GenericChat response: {} chars", content.len());
        Ok(content)
    }
}

// ── GenericChat wire types ──

#[derive(Debug, Serialize)]
struct GenericChatRequest<'a> {
    model: &'a str,
    messages: &'a [GenericChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenericChatResponse {
    choices: Option<Vec<GenericChatChoice>>,
}

#[derive(Debug, Deserialize)]
struct GenericChatChoice {
    message: Option<GenericChatResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct GenericChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::types::GenericChatRole;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str, api_key: Option<&str>) -> GenericChatConfig {
        GenericChatConfig {
            base_url: Some(base_url.to_string()),
            api_key: api_key.map(str::to_string),
        }
    }

    fn request(content: &str) -> NativeRequest {
        NativeRequest {
            messages: NativeMessages::GenericChat(vec![GenericChatMessage {
                role: GenericChatRole::User,
                content: content.to_string(),
            }]),
            model: "llama3".to_string(),
            max_tokens: 256,
            temperature: 0.25,
        }
    }

    #[test]
    fn test_missing_base_url_fails_fast() {
        let err = GenericChatClient::new(Client::new(), &GenericChatConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Config {
                provider: ProviderId::GenericChat,
                missing: MissingConfig::BaseUrl
            }
        ));
    }

    #[test]
    fn test_invalid_base_url_is_request_error() {
        let err = GenericChatClient::new(Client::new(), &config("not a url", None)).unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Transport(TransportError::Request(_))
        ));
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let client =
            GenericChatClient::new(Client::new(), &config("http://localhost:11434/v1/", None))
                .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn test_debug_hides_key() {
        let client = GenericChatClient::new(
            Client::new(),
            &config("https://api.groq.com/openai/v1", Some("gsk_secret")),
        )
        .unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("api.groq.com"));
    }

    #[test]
    fn test_extract_text_missing_choices() {
        let err = GenericChatClient::extract_text(r#"{"id": "x"}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_text_empty_choices() {
        let err = GenericChatClient::extract_text(r#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[test]
    fn test_extract_text_not_json() {
        let err = GenericChatClient::extract_text("<html>oops</html>").unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invoke_success_with_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "ping"}],
                "max_tokens": 256,
                "temperature": 0.25,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "pong"}}],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = GenericChatClient::new(
            Client::new(),
            &config(&format!("{}/v1", server.uri()), Some("sk-test")),
        )
        .unwrap();
        let text = client.invoke(&request("ping")).await.unwrap();
        assert_eq!(text, "pong");
    }

    #[tokio::test]
    async fn test_invoke_without_key_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "local"}}],
            })))
            .mount(&server)
            .await;

        let client = GenericChatClient::new(Client::new(), &config(&server.uri(), None)).unwrap();
        assert_eq!(client.invoke(&request("hi")).await.unwrap(), "local");

        let received = server.received_requests().await.unwrap();
        assert_eq!(received.len(), 1);
        assert!(!received[0].headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn test_invoke_missing_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "chat"})))
            .mount(&server)
            .await;

        let client = GenericChatClient::new(Client::new(), &config(&server.uri(), None)).unwrap();
        let err = client.invoke(&request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invoke_status_error_keeps_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limit exceeded"))
            .mount(&server)
            .await;

        let client = GenericChatClient::new(Client::new(), &config(&server.uri(), None)).unwrap();
        let err = client.invoke(&request("hi")).await.unwrap_err();
        match err {
            ProviderError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limit exceeded");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invoke_rejects_anthropic_shape() {
        let client =
            GenericChatClient::new(Client::new(), &config("http://localhost:1", None)).unwrap();
        let req = NativeRequest {
            messages: NativeMessages::Anthropic {
                system: None,
                turns: vec![],
            },
            model: "m".into(),
            max_tokens: 1,
            temperature: 0.0,
        };
        let err = client.invoke(&req).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Transport(TransportError::Request(_))
        ));
    }
}
