//! Model provider construction from runtime settings.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rprovider::{
    ModelProvider, NoopOperationHooks, ProviderError, ProviderOperationHooks, RetryPolicy,
    SecretString,
};

#[derive(Clone)]
pub struct ProviderBuildConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub timeout: Duration,
    pub retry_policy: RetryPolicy,
    pub hooks: Arc<dyn ProviderOperationHooks>,
}

impl ProviderBuildConfig {
    pub fn new(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
            model: crate::config::DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(90),
            retry_policy: RetryPolicy::default(),
            hooks: Arc::new(NoopOperationHooks),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }
}

pub fn build_provider(config: ProviderBuildConfig) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    let api_key = config.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(ProviderError::authentication(
            "provider API key must not be empty",
        ));
    }

    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    build_openai_provider(SecretString::new(api_key), http, config)
}

#[cfg(feature = "provider-openai")]
fn build_openai_provider(
    api_key: SecretString,
    http: Client,
    config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    use rprovider::adapters::openai::{OpenAiHttpTransport, OpenAiProvider};

    let transport = Arc::new(OpenAiHttpTransport::new(http).with_base_url(config.api_base));
    Ok(Arc::new(
        OpenAiProvider::new(api_key, transport)
            .with_fallback_model(config.model)
            .with_retry_policy(config.retry_policy)
            .with_hooks(config.hooks),
    ))
}

#[cfg(not(feature = "provider-openai"))]
fn build_openai_provider(
    _api_key: SecretString,
    _http: Client,
    _config: ProviderBuildConfig,
) -> Result<Arc<dyn ModelProvider>, ProviderError> {
    Err(ProviderError::invalid_request(
        "provider-openai feature is not enabled on relay",
    ))
}

#[cfg(test)]
mod tests {
    use rprovider::{ProviderErrorKind, ProviderId};

    use super::*;

    #[test]
    fn blank_api_key_is_an_authentication_error() {
        let error = match build_provider(ProviderBuildConfig::new("  ", "https://api.openai.com/v1"))
        {
            Ok(_) => panic!("blank key should be rejected"),
            Err(error) => error,
        };
        assert_eq!(error.kind, ProviderErrorKind::Authentication);
    }

    #[cfg(feature = "provider-openai")]
    #[test]
    fn builds_openai_provider() {
        let provider = build_provider(
            ProviderBuildConfig::new("sk-test", "http://localhost:9/v1").with_model("gpt-4o-mini"),
        )
        .expect("provider should build");
        assert_eq!(provider.id(), ProviderId::OpenAi);
    }
}
