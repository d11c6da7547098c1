//! JSON-RPC envelopes, plus the mapping from `rust_mcp_schema` results into
//! registry descriptors.

use std::collections::BTreeMap;

use rust_mcp_schema::{
    CallToolResult, ClientCapabilities, GetPromptResult, Implementation, InitializeRequestParams,
    LATEST_PROTOCOL_VERSION, ListPromptsResult, ListResourceTemplatesResult, ListResourcesResult,
    ListToolsResult, Prompt, ReadResourceContent, ReadResourceResult, Resource, ResourceTemplate,
    Tool,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ContentBlock, PromptArgument, PromptDescriptor, PromptMessage, RenderedPrompt, ResourceBody,
    ResourceContents, ResourceDescriptor, ResourceItem, ResourceUri, ToolDescriptor, ToolOutput,
};

pub const PROTOCOL_VERSION: &str = LATEST_PROTOCOL_VERSION;
pub const JSONRPC_VERSION: &str = "2.0";
pub const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OutgoingNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Reply to a request the server sent us.
#[derive(Debug, Serialize)]
pub(crate) struct OutgoingResponse {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// Any frame read from the server: response, request, or notification.
#[derive(Debug, Deserialize)]
pub(crate) struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    pub fn is_method_not_found(&self) -> bool {
        self.code == METHOD_NOT_FOUND
    }
}

pub(crate) fn format_rpc_error(error: &RpcError) -> String {
    let mut output = format!("MCP error {}: {}", error.code, error.message);
    let details = error.data.as_ref().and_then(|data| {
        data.get("details")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .or_else(|| data.as_str().map(ToString::to_string))
    });
    if let Some(details) = details.filter(|details| !details.is_empty()) {
        output.push('\n');
        output.push_str(&details);
    }
    output
}

pub(crate) fn initialize_params() -> InitializeRequestParams {
    InitializeRequestParams {
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: Some("relay".to_string()),
            description: None,
            icons: Vec::new(),
            website_url: None,
        },
        meta: None,
        protocol_version: PROTOCOL_VERSION.to_string(),
    }
}

/// A list result that may continue on another page.
pub(crate) trait Paginated {
    type Item;

    fn into_page(self) -> (Vec<Self::Item>, Option<String>);
}

impl Paginated for ListToolsResult {
    type Item = Tool;

    fn into_page(self) -> (Vec<Tool>, Option<String>) {
        (self.tools, self.next_cursor)
    }
}

impl Paginated for ListPromptsResult {
    type Item = Prompt;

    fn into_page(self) -> (Vec<Prompt>, Option<String>) {
        (self.prompts, self.next_cursor)
    }
}

impl Paginated for ListResourcesResult {
    type Item = Resource;

    fn into_page(self) -> (Vec<Resource>, Option<String>) {
        (self.resources, self.next_cursor)
    }
}

impl Paginated for ListResourceTemplatesResult {
    type Item = ResourceTemplate;

    fn into_page(self) -> (Vec<ResourceTemplate>, Option<String>) {
        (self.resource_templates, self.next_cursor)
    }
}

pub(crate) fn tool_descriptor(tool: Tool) -> ToolDescriptor {
    let input_schema = serde_json::to_value(&tool.input_schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}));
    ToolDescriptor::new(tool.name, tool.description.unwrap_or_default(), input_schema)
}

pub(crate) fn prompt_descriptor(prompt: Prompt) -> PromptDescriptor {
    PromptDescriptor {
        name: prompt.name,
        description: prompt.description.unwrap_or_default(),
        arguments: prompt
            .arguments
            .into_iter()
            .map(|argument| PromptArgument {
                name: argument.name,
                description: argument.description,
                required: argument.required.unwrap_or(false),
                default: None,
            })
            .collect(),
    }
}

pub(crate) fn resource_descriptor(resource: Resource) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: ResourceUri::literal(resource.uri),
        name: resource.name,
        description: resource.description,
        mime_type: resource.mime_type,
    }
}

pub(crate) fn template_descriptor(template: ResourceTemplate) -> ResourceDescriptor {
    ResourceDescriptor {
        uri: ResourceUri::parse(template.uri_template),
        name: template.name,
        description: template.description,
        mime_type: template.mime_type,
    }
}

fn content_block(block: rust_mcp_schema::ContentBlock) -> ContentBlock {
    use rust_mcp_schema::ContentBlock as Wire;

    match block {
        Wire::TextContent(text) => ContentBlock::Text(text.text),
        Wire::ImageContent(image) => ContentBlock::Image {
            bytes: base64_decoded_len(&image.data),
            mime_type: image.mime_type,
        },
        Wire::AudioContent(audio) => ContentBlock::Audio {
            bytes: base64_decoded_len(&audio.data),
            mime_type: audio.mime_type,
        },
        Wire::ResourceLink(link) => ContentBlock::ResourceLink { uri: link.uri },
        Wire::EmbeddedResource(embedded) => {
            // Text and blob contents share `uri`; only text ones carry `text`.
            let resource = serde_json::to_value(&embedded.resource).unwrap_or(Value::Null);
            ContentBlock::Resource {
                uri: resource["uri"].as_str().unwrap_or_default().to_string(),
                text: resource["text"].as_str().map(ToString::to_string),
            }
        }
    }
}

pub(crate) fn tool_output(result: CallToolResult) -> ToolOutput {
    ToolOutput {
        content: result.content.into_iter().map(content_block).collect(),
        structured: result.structured_content.map(Value::Object),
        is_error: result.is_error.unwrap_or(false),
    }
}

pub(crate) fn rendered_prompt(result: GetPromptResult) -> RenderedPrompt {
    RenderedPrompt {
        description: result.description,
        messages: result
            .messages
            .into_iter()
            .map(|message| PromptMessage {
                role: serde_json::to_value(&message.role)
                    .ok()
                    .and_then(|role| role.as_str().map(ToString::to_string))
                    .unwrap_or_else(|| "user".to_string()),
                text: content_block(message.content).render(),
            })
            .collect(),
    }
}

pub(crate) fn resource_contents(result: ReadResourceResult) -> ResourceContents {
    ResourceContents {
        items: result
            .contents
            .into_iter()
            .map(|item| match item {
                ReadResourceContent::TextResourceContents(text) => ResourceItem {
                    uri: text.uri,
                    mime_type: text.mime_type,
                    body: ResourceBody::Text(text.text),
                },
                ReadResourceContent::BlobResourceContents(blob) => ResourceItem {
                    body: ResourceBody::Blob {
                        bytes: base64_decoded_len(&blob.blob),
                    },
                    uri: blob.uri,
                    mime_type: blob.mime_type,
                },
            })
            .collect(),
    }
}

pub(crate) fn prompt_arguments_value(arguments: BTreeMap<String, String>) -> Value {
    Value::Object(
        arguments
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect(),
    )
}

/// Decoded size of a padded base64 payload.
fn base64_decoded_len(encoded: &str) -> usize {
    let trimmed = encoded.trim_end();
    let padding = trimmed.chars().rev().take_while(|ch| *ch == '=').count();
    (trimmed.len() / 4 * 3).saturating_sub(padding)
}
