//! OpenAI transport trait and reqwest-based HTTP implementation.

use reqwest::{Client, Response};

use crate::{ProviderError, ProviderFuture, SecretString};

use super::serde_api::{OpenAiApiResponse, build_api_request, extract_error_message};
use super::types::{OpenAiRequest, OpenAiResponse};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub trait OpenAiTransport: Send + Sync + std::fmt::Debug {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: &'a SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct OpenAiHttpTransport {
    client: Client,
    base_url: String,
}

impl OpenAiHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// Points the transport at any OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("chat completion failed with status {status}"));

        ProviderError::from_status(status.as_u16(), message)
    }
}

impl OpenAiTransport for OpenAiHttpTransport {
    fn complete<'a>(
        &'a self,
        request: OpenAiRequest,
        api_key: &'a SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async move {
            let api_request = build_api_request(request)?;
            let url = self.endpoint("chat/completions");
            tracing::debug!(url = %url, model = %api_request.model, "sending chat completion");

            let response = self
                .client
                .post(url)
                .bearer_auth(api_key.expose())
                .json(&api_request)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        ProviderError::timeout(err.to_string())
                    } else {
                        ProviderError::transport(err.to_string())
                    }
                })?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            let parsed: OpenAiApiResponse = response
                .json()
                .await
                .map_err(|err| ProviderError::transport(err.to_string()))?;

            OpenAiResponse::try_from(parsed)
        })
    }
}
