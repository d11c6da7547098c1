//! Backend contract implemented by every capability server connection.

use std::collections::BTreeMap;

use rcommon::BoxFuture;

use crate::{
    JsonObject, PromptDescriptor, RenderedPrompt, ResourceContents, ResourceDescriptor,
    ToolDescriptor, ToolError, ToolOutput,
};

pub type ToolFuture<'a, T> = BoxFuture<'a, T>;

/// Prompt arguments are plain strings on the wire.
pub type PromptArguments = BTreeMap<String, String>;

pub trait Backend: Send + Sync {
    /// Stable name, usually the server key from configuration.
    fn name(&self) -> &str;

    fn list_tools(&self) -> ToolFuture<'_, Result<Vec<ToolDescriptor>, ToolError>>;

    fn list_prompts(&self) -> ToolFuture<'_, Result<Vec<PromptDescriptor>, ToolError>>;

    fn list_resources(&self) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>>;

    fn list_resource_templates(
        &self,
    ) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: JsonObject,
    ) -> ToolFuture<'a, Result<ToolOutput, ToolError>>;

    fn get_prompt<'a>(
        &'a self,
        name: &'a str,
        arguments: PromptArguments,
    ) -> ToolFuture<'a, Result<RenderedPrompt, ToolError>>;

    fn read_resource<'a>(
        &'a self,
        uri: &'a str,
    ) -> ToolFuture<'a, Result<ResourceContents, ToolError>>;
}
