//! OpenAI-compatible chat-completions adapter.

mod provider;
mod serde_api;
mod tests;
mod transport;
mod types;

pub use provider::OpenAiProvider;
pub use transport::{DEFAULT_OPENAI_BASE_URL, OpenAiHttpTransport, OpenAiTransport};
pub use types::{
    OpenAiAssistantMessage, OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiRole, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};
