//! `Backend` implementation over an initialized MCP session.

use rust_mcp_schema::{
    CallToolResult, GetPromptResult, ListPromptsResult, ListResourceTemplatesResult,
    ListResourcesResult, ListToolsResult, ReadResourceResult,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::process::Child;

use crate::{
    Backend, JsonObject, PromptArguments, PromptDescriptor, RenderedPrompt, ResourceContents,
    ResourceDescriptor, ToolDescriptor, ToolError, ToolFuture, ToolOutput,
};

use super::client::{McpClient, RpcReply};
use super::protocol::{
    Paginated, format_rpc_error, prompt_arguments_value, prompt_descriptor, rendered_prompt,
    resource_contents, resource_descriptor, template_descriptor, tool_descriptor, tool_output,
};

/// Guards against servers that keep returning the same cursor.
const MAX_LIST_PAGES: usize = 64;

pub struct McpBackend {
    name: String,
    client: McpClient,
    // Held so the server process lives as long as the backend.
    _child: Option<Child>,
}

impl McpBackend {
    pub fn new(name: impl Into<String>, client: McpClient) -> Self {
        Self {
            name: name.into(),
            client,
            _child: None,
        }
    }

    pub(crate) fn with_child(mut self, child: Child) -> Self {
        self._child = Some(child);
        self
    }

    pub fn client(&self) -> &McpClient {
        &self.client
    }

    fn supports_tools(&self) -> bool {
        self.client.server().capabilities.tools.is_some()
    }

    fn supports_prompts(&self) -> bool {
        self.client.server().capabilities.prompts.is_some()
    }

    fn supports_resources(&self) -> bool {
        self.client.server().capabilities.resources.is_some()
    }

    /// Follows `nextCursor` until exhausted. A `-32601` reply means the
    /// server does not implement the listing, which reads as empty.
    async fn list_all<P>(&self, method: &str) -> Result<Vec<P::Item>, ToolError>
    where
        P: Paginated + DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.take().map(|cursor| json!({ "cursor": cursor }));
            let page: P = match self.client.request(method, params).await? {
                RpcReply::Result(value) => serde_json::from_value(value).map_err(|err| {
                    ToolError::protocol(format!("unexpected '{method}' result shape: {err}"))
                })?,
                RpcReply::Error(error) if error.is_method_not_found() => {
                    tracing::debug!(backend = %self.name, method, "listing not implemented by server");
                    return Ok(items);
                }
                RpcReply::Error(error) => return Err(ToolError::execution(format_rpc_error(&error))),
            };

            let (page_items, next_cursor) = page.into_page();
            items.extend(page_items);
            match next_cursor.filter(|next| !next.is_empty()) {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }

        tracing::warn!(backend = %self.name, method, "listing truncated after {MAX_LIST_PAGES} pages");
        Ok(items)
    }
}

impl std::fmt::Debug for McpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpBackend")
            .field("name", &self.name)
            .field("client", &self.client)
            .finish()
    }
}

impl Backend for McpBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> ToolFuture<'_, Result<Vec<ToolDescriptor>, ToolError>> {
        Box::pin(async move {
            if !self.supports_tools() {
                return Ok(Vec::new());
            }
            let tools = self.list_all::<ListToolsResult>("tools/list").await?;
            Ok(tools.into_iter().map(tool_descriptor).collect())
        })
    }

    fn list_prompts(&self) -> ToolFuture<'_, Result<Vec<PromptDescriptor>, ToolError>> {
        Box::pin(async move {
            if !self.supports_prompts() {
                return Ok(Vec::new());
            }
            let prompts = self.list_all::<ListPromptsResult>("prompts/list").await?;
            Ok(prompts.into_iter().map(prompt_descriptor).collect())
        })
    }

    fn list_resources(&self) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
        Box::pin(async move {
            if !self.supports_resources() {
                return Ok(Vec::new());
            }
            let resources = self
                .list_all::<ListResourcesResult>("resources/list")
                .await?;
            Ok(resources.into_iter().map(resource_descriptor).collect())
        })
    }

    fn list_resource_templates(
        &self,
    ) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
        Box::pin(async move {
            if !self.supports_resources() {
                return Ok(Vec::new());
            }
            let templates = self
                .list_all::<ListResourceTemplatesResult>("resources/templates/list")
                .await?;
            Ok(templates.into_iter().map(template_descriptor).collect())
        })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: JsonObject,
    ) -> ToolFuture<'a, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let params = json!({ "name": name, "arguments": Value::Object(arguments) });
            let result: CallToolResult = self.client.call("tools/call", Some(params)).await?;
            Ok(tool_output(result))
        })
    }

    fn get_prompt<'a>(
        &'a self,
        name: &'a str,
        arguments: PromptArguments,
    ) -> ToolFuture<'a, Result<RenderedPrompt, ToolError>> {
        Box::pin(async move {
            let params = json!({ "name": name, "arguments": prompt_arguments_value(arguments) });
            let result: GetPromptResult = self.client.call("prompts/get", Some(params)).await?;
            Ok(rendered_prompt(result))
        })
    }

    fn read_resource<'a>(
        &'a self,
        uri: &'a str,
    ) -> ToolFuture<'a, Result<ResourceContents, ToolError>> {
        Box::pin(async move {
            let result: ReadResourceResult = self
                .client
                .call("resources/read", Some(json!({ "uri": uri })))
                .await?;
            Ok(resource_contents(result))
        })
    }
}
