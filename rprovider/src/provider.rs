use crate::{ModelRequest, ModelResponse, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = rcommon::BoxFuture<'a, T>;

/// A chat-completion backend with a function-calling interface.
///
/// One call takes the full ordered conversation plus the available tool
/// descriptors and returns a single response that may contain text, tool-call
/// requests, or both.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>>;
}
