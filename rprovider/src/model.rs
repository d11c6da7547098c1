//! Provider-agnostic request, response, and message model types.
//!
//! ```rust
//! use rprovider::{Message, ModelRequest, ProviderErrorKind, ToolCall};
//!
//! let ok = ModelRequest::builder("o4-mini")
//!     .message(Message::user("What is 2+2?"))
//!     .build();
//! assert!(ok.is_ok());
//!
//! let orphan = ModelRequest::builder("o4-mini")
//!     .message(Message::user("hi"))
//!     .message(Message::tool("call_9", "result"))
//!     .build()
//!     .expect_err("tool result without a matching call should fail");
//! assert_eq!(orphan.kind, ProviderErrorKind::InvalidRequest);
//!
//! let call = ToolCall::new("call_1", "search_papers", r#"{"topic":"llm agents"}"#);
//! let paired = ModelRequest::builder("o4-mini")
//!     .message(Message::user("find papers"))
//!     .message(Message::assistant_with_tool_calls("", vec![call]))
//!     .message(Message::tool("call_1", "[\"1234.5678\"]"))
//!     .build();
//! assert!(paired.is_ok());
//! ```

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use rcommon::GenerationOptions;

use crate::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenAi,
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One entry of a conversation.
///
/// Assistant messages may carry the tool calls they issued; tool messages name
/// the call they answer through `tool_call_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool arguments, serialized as JSON text.
    pub input_schema: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// JSON-encoded argument object exactly as the model produced it.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputItem {
    Message(Message),
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    ToolUse,
    ContentFilter,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn accumulate(&mut self, other: TokenUsage) {
        self.input_tokens = self.input_tokens.saturating_add(other.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(other.output_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub provider: ProviderId,
    pub model: String,
    pub output: Vec<OutputItem>,
    pub stop_reason: StopReason,
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// Concatenated assistant text across all message items.
    pub fn text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message(message) if message.role == Role::Assistant => {
                    Some(message.content.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Tool-call requests in the order the model issued them.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::ToolCall(call) => Some(call.clone()),
                OutputItem::Message(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: GenerationOptions,
    pub tools: Vec<ToolDefinition>,
}

impl ModelRequest {
    pub fn builder(model: impl Into<String>) -> ModelRequestBuilder {
        ModelRequestBuilder::new(model)
    }

    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: GenerationOptions::default(),
            tools: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::invalid_request("model must not be empty"));
        }

        if self.messages.is_empty() {
            return Err(ProviderError::invalid_request(
                "at least one message is required",
            ));
        }

        if let Some(max_tokens) = self.options.max_tokens
            && max_tokens == 0
        {
            return Err(ProviderError::invalid_request(
                "max_tokens must be greater than zero",
            ));
        }

        if let Some(temperature) = self.options.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(ProviderError::invalid_request(
                "temperature must be in the inclusive range 0.0..=2.0",
            ));
        }

        validate_tool_pairing(&self.messages)
    }
}

// Every tool message must answer a call issued by an earlier assistant message.
fn validate_tool_pairing(messages: &[Message]) -> Result<(), ProviderError> {
    let mut issued = HashSet::new();

    for message in messages {
        match message.role {
            Role::Assistant => {
                issued.extend(message.tool_calls.iter().map(|call| call.id.as_str()));
            }
            Role::Tool => {
                let Some(call_id) = message.tool_call_id.as_deref() else {
                    return Err(ProviderError::invalid_request(
                        "tool message is missing tool_call_id",
                    ));
                };

                if !issued.contains(call_id) {
                    return Err(ProviderError::invalid_request(format!(
                        "tool message '{call_id}' does not answer an earlier assistant tool call"
                    )));
                }
            }
            Role::System | Role::User => {}
        }
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequestBuilder {
    model: String,
    messages: Vec<Message>,
    options: GenerationOptions,
    tools: Vec<ToolDefinition>,
}

impl ModelRequestBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            options: GenerationOptions::default(),
            tools: Vec::new(),
        }
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn messages(mut self, messages: Vec<Message>) -> Self {
        self.messages.extend(messages);
        self
    }

    pub fn options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn build(self) -> Result<ModelRequest, ProviderError> {
        let request = ModelRequest {
            model: self.model,
            messages: self.messages,
            options: self.options,
            tools: self.tools,
        };

        request.validate()?;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn response_helpers_split_text_and_tool_calls_in_order() {
        let response = ModelResponse {
            provider: ProviderId::OpenAi,
            model: "o4-mini".to_string(),
            output: vec![
                OutputItem::Message(Message::assistant("Looking that up.")),
                OutputItem::ToolCall(ToolCall::new("a", "extract_info", "{}")),
                OutputItem::ToolCall(ToolCall::new("b", "extract_info", "{}")),
            ],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        };

        assert_eq!(response.text(), "Looking that up.");
        let ids = response
            .tool_calls()
            .into_iter()
            .map(|call| call.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn validate_rejects_tool_message_without_call_id() {
        let mut orphan = Message::tool("x", "result");
        orphan.tool_call_id = None;

        let error = ModelRequest::new("o4-mini", vec![Message::user("hi"), orphan])
            .validate()
            .expect_err("missing id should fail");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
    }

    #[test]
    fn validate_rejects_zero_max_tokens() {
        let error = ModelRequest::new("o4-mini", vec![Message::user("hi")])
            .with_max_tokens(0)
            .validate()
            .expect_err("zero tokens should fail");
        assert_eq!(error.message, "max_tokens must be greater than zero");
    }

    #[test]
    fn usage_accumulates_across_turns() {
        let mut total = TokenUsage::default();
        total.accumulate(TokenUsage {
            input_tokens: 5,
            output_tokens: 2,
            total_tokens: 7,
        });
        total.accumulate(TokenUsage {
            input_tokens: 6,
            output_tokens: 3,
            total_tokens: 9,
        });

        assert_eq!(total.total_tokens, 16);
        assert_eq!(total.input_tokens, 11);
    }
}
