//! OpenAI HTTP payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProviderError;

use super::types::{
    OpenAiAssistantMessage, OpenAiFinishReason, OpenAiMessage, OpenAiRequest, OpenAiResponse,
    OpenAiRole, OpenAiTool, OpenAiToolCall, OpenAiUsage,
};

pub(crate) fn build_api_request(request: OpenAiRequest) -> Result<OpenAiApiRequest, ProviderError> {
    let messages = request
        .messages
        .into_iter()
        .map(OpenAiApiMessage::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    if messages.is_empty() {
        return Err(ProviderError::invalid_request(
            "OpenAI request requires at least one message",
        ));
    }

    let tools = if request.tools.is_empty() {
        None
    } else {
        Some(
            request
                .tools
                .into_iter()
                .map(OpenAiApiTool::try_from)
                .collect::<Result<Vec<_>, _>>()?,
        )
    };

    Ok(OpenAiApiRequest {
        model: request.model,
        messages,
        tools,
        temperature: request.temperature,
        max_completion_tokens: request.max_completion_tokens,
    })
}

pub(crate) fn parse_finish_reason(value: Option<&str>) -> OpenAiFinishReason {
    match value {
        Some("stop") => OpenAiFinishReason::Stop,
        Some("length") => OpenAiFinishReason::Length,
        Some("tool_calls") | Some("function_call") => OpenAiFinishReason::ToolCalls,
        Some("content_filter") => OpenAiFinishReason::ContentFilter,
        _ => OpenAiFinishReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<OpenAiApiErrorEnvelope>(body).ok()?;
    Some(parsed.error.message)
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiErrorEnvelope {
    pub error: OpenAiApiError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiError {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiRequest {
    pub model: String,
    pub messages: Vec<OpenAiApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiApiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiMessage {
    pub role: &'static str,
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OpenAiApiToolCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl TryFrom<OpenAiMessage> for OpenAiApiMessage {
    type Error = ProviderError;

    fn try_from(value: OpenAiMessage) -> Result<Self, Self::Error> {
        let content = match value.role {
            OpenAiRole::System | OpenAiRole::User if value.content.trim().is_empty() => {
                return Err(ProviderError::invalid_request(
                    "OpenAI message content must not be empty",
                ));
            }
            // An assistant turn that only issued tool calls is sent with null content.
            OpenAiRole::Assistant if value.content.is_empty() && !value.tool_calls.is_empty() => {
                None
            }
            _ => Some(value.content),
        };

        if value.role == OpenAiRole::Tool && value.tool_call_id.is_none() {
            return Err(ProviderError::invalid_request(
                "OpenAI tool message requires tool_call_id",
            ));
        }

        Ok(Self {
            role: value.role.as_str(),
            content,
            tool_calls: value
                .tool_calls
                .into_iter()
                .map(OpenAiApiToolCall::from)
                .collect(),
            tool_call_id: value.tool_call_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiTool {
    pub r#type: &'static str,
    pub function: OpenAiApiFunction,
}

impl TryFrom<OpenAiTool> for OpenAiApiTool {
    type Error = ProviderError;

    fn try_from(value: OpenAiTool) -> Result<Self, Self::Error> {
        let parameters = serde_json::from_str::<Value>(&value.input_schema).map_err(|_| {
            ProviderError::invalid_request(format!(
                "schema for tool '{}' must be valid JSON",
                value.name
            ))
        })?;

        Ok(Self {
            r#type: "function",
            function: OpenAiApiFunction {
                name: value.name,
                description: value.description,
                parameters,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiApiFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenAiApiToolCall {
    pub id: String,
    #[serde(default = "function_type")]
    pub r#type: String,
    pub function: OpenAiApiToolFunction,
}

fn function_type() -> String {
    "function".to_string()
}

impl From<OpenAiToolCall> for OpenAiApiToolCall {
    fn from(value: OpenAiToolCall) -> Self {
        Self {
            id: value.id,
            r#type: function_type(),
            function: OpenAiApiToolFunction {
                name: value.name,
                arguments: value.arguments,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct OpenAiApiToolFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiResponse {
    pub model: String,
    pub choices: Vec<OpenAiApiChoice>,
    pub usage: Option<OpenAiApiUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiChoice {
    pub message: OpenAiApiAssistantMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiApiAssistantMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<OpenAiApiToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiApiUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl TryFrom<OpenAiApiResponse> for OpenAiResponse {
    type Error = ProviderError;

    fn try_from(value: OpenAiApiResponse) -> Result<Self, Self::Error> {
        let choice =
            value.choices.into_iter().next().ok_or_else(|| {
                ProviderError::transport("OpenAI response did not include choices")
            })?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| OpenAiToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect::<Vec<_>>();

        let usage = value.usage.unwrap_or_default();

        Ok(Self {
            model: value.model,
            message: OpenAiAssistantMessage {
                content: choice.message.content.unwrap_or_default(),
                tool_calls,
            },
            finish_reason: parse_finish_reason(choice.finish_reason.as_deref()),
            usage: OpenAiUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            },
        })
    }
}
