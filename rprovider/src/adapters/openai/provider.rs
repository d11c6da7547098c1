//! OpenAI provider implementation over transport and shared models.

use std::sync::Arc;

use crate::{
    ModelProvider, ModelRequest, ModelResponse, NoopOperationHooks, ProviderError,
    ProviderFuture, ProviderId, ProviderOperationHooks, RetryPolicy, SecretString,
    execute_with_retry,
};

use super::transport::OpenAiTransport;
use super::types::{OpenAiMessage, OpenAiRequest, OpenAiTool};

#[derive(Clone)]
pub struct OpenAiProvider {
    api_key: SecretString,
    transport: Arc<dyn OpenAiTransport>,
    fallback_model: String,
    retry_policy: RetryPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
}

impl OpenAiProvider {
    pub fn new(api_key: SecretString, transport: Arc<dyn OpenAiTransport>) -> Self {
        Self {
            api_key,
            transport,
            fallback_model: "o4-mini".to_string(),
            retry_policy: RetryPolicy::default(),
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_fallback_model(mut self, model: impl Into<String>) -> Self {
        self.fallback_model = model.into();
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub(crate) fn build_openai_request(&self, request: ModelRequest) -> OpenAiRequest {
        let model = if request.model.trim().is_empty() {
            self.fallback_model.clone()
        } else {
            request.model
        };

        OpenAiRequest {
            model,
            messages: request
                .messages
                .into_iter()
                .map(OpenAiMessage::from)
                .collect(),
            tools: request.tools.into_iter().map(OpenAiTool::from).collect(),
            temperature: request.options.temperature,
            max_completion_tokens: request.options.max_tokens,
        }
    }
}

impl ModelProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            if self.api_key.is_empty() {
                return Err(ProviderError::authentication("no OpenAI API key configured"));
            }

            let openai_request = self.build_openai_request(request);
            let response = execute_with_retry(
                self.id(),
                "complete",
                &self.retry_policy,
                self.hooks.as_ref(),
                |_| self.transport.complete(openai_request.clone(), &self.api_key),
                tokio::time::sleep,
            )
            .await?;

            Ok(response.into_model_response())
        })
    }
}
