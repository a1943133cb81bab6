//! Single entry point for prompt invocation
//!
//! Each call selects a provider, shapes the prompt for it, sends it through
//! the matching client and classifies any failure. No retries happen here;
//! callers wanting backoff layer it on top.

use reqwest::{Client, ClientBuilder};
use tracing::{debug, warn};

use crate::config::InvokerConfig;
use crate::error::{ClassifiedError, ProviderError, TransportError};
use crate::providers::anthropic::AnthropicClient;
use crate::providers::classify::{CallContext, classify};
use crate::providers::normalize::to_provider_shape;
use crate::providers::openai_compat::GenericChatClient;
use crate::providers::selector::select;
use crate::providers::types::{
    ChatProvider, InvocationOptions, NativeRequest, PromptInput, ProviderId,
};

/// Invokes the configured provider. Holds only read-only state, so a single
/// instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct UnifiedInvoker {
    config: InvokerConfig,
    /// Build failures are kept and reported by the first `invoke`
    http: Result<Client, String>,
}

impl UnifiedInvoker {
    pub fn new(config: InvokerConfig) -> Self {
        Self::with_client_builder(config, Client::builder())
    }

    pub fn from_env() -> Self {
        Self::new(InvokerConfig::from_env())
    }

    /// Build the HTTP client from `builder` (proxies, custom TLS, timeouts)
    pub fn with_client_builder(config: InvokerConfig, builder: ClientBuilder) -> Self {
        let http = builder.build().map_err(|e| {
            warn!("Failed to build HTTP client: {}", e);
            e.to_string()
        });
        Self { config, http }
    }

    /// Use a preconfigured HTTP client
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = Ok(http);
        self
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Provider this invoker would target for `options`
    pub fn provider_for(&self, options: &InvocationOptions) -> ProviderId {
        select(options.provider, &self.config)
    }

    /// Resolve the provider and build the native request, without sending it
    pub fn prepare(
        &self,
        input: &PromptInput,
        options: &InvocationOptions,
    ) -> (ProviderId, NativeRequest) {
        let provider = self.provider_for(options);
        let messages = to_provider_shape(input, provider);

        let request = NativeRequest {
            messages,
            model: options
                .model
                .clone()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| self.config.model_for(provider)),
            max_tokens: options.max_tokens.unwrap_or_else(|| self.config.max_tokens()),
            temperature: options
                .temperature
                .filter(|t| t.is_finite())
                .unwrap_or_else(|| self.config.temperature()),
        };
        (provider, request)
    }

    /// Construct the client for `provider`. Missing configuration fails here.
    pub fn client_for(
        &self,
        provider: ProviderId,
    ) -> Result<Box<dyn ChatProvider>, ProviderError> {
        let http = self
            .http
            .clone()
            .map_err(TransportError::Request)?;
        let client: Box<dyn ChatProvider> = match provider {
            ProviderId::GenericChat => {
                Box::new(GenericChatClient::new(http, &self.config.generic_chat)?)
            }
            ProviderId::Anthropic => Box::new(AnthropicClient::new(http, &self.config.anthropic)?),
        };
        Ok(client)
    }

    /// Send `input` to one provider and return the generated text
    pub async fn invoke(
        &self,
        input: impl Into<PromptInput>,
        options: &InvocationOptions,
    ) -> Result<String, ClassifiedError> {
        let input = input.into();
        let (provider, request) = self.prepare(&input, options);
        let ctx = CallContext::new(provider, &request.model);

        debug!(
            "Invoking {} with model {} ({} turns)",
            provider,
            request.model,
            request.messages.len()
        );

        let client = self.client_for(provider).map_err(|e| classify(e, ctx))?;
        if request.messages.is_empty() {
            return Err(classify(ProviderError::EmptyPrompt, ctx));
        }
        client.invoke(&request).await.map_err(|e| classify(e, ctx))
    }
}
