//! In-process backend built from closures.
//!
//! ```rust
//! use rtooling::{LocalBackend, ToolDescriptor, ToolOutput};
//!
//! let backend = LocalBackend::new("local").with_tool(
//!     ToolDescriptor::new("echo", "Echoes input", serde_json::json!({"type": "object"})),
//!     |args| async move { Ok(ToolOutput::text(serde_json::Value::Object(args).to_string())) },
//! );
//!
//! assert_eq!(backend.tool_count(), 1);
//! ```

use std::future::Future;
use std::sync::Arc;

use rcommon::OrderedRegistry;

use crate::{
    Backend, JsonObject, PromptArguments, PromptDescriptor, RenderedPrompt, ResourceContents,
    ResourceDescriptor, ToolDescriptor, ToolError, ToolFuture, ToolOutput,
};

type ToolHandler =
    dyn Fn(JsonObject) -> ToolFuture<'static, Result<ToolOutput, ToolError>> + Send + Sync;
type PromptHandler = dyn Fn(&PromptArguments) -> Result<RenderedPrompt, ToolError> + Send + Sync;
type ResourceHandler = dyn Fn(&str) -> Result<ResourceContents, ToolError> + Send + Sync;

pub struct LocalBackend {
    name: String,
    tools: OrderedRegistry<String, (ToolDescriptor, Arc<ToolHandler>)>,
    prompts: OrderedRegistry<String, (PromptDescriptor, Arc<PromptHandler>)>,
    resources: Vec<(ResourceDescriptor, Arc<ResourceHandler>)>,
}

impl LocalBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: OrderedRegistry::new(),
            prompts: OrderedRegistry::new(),
            resources: Vec::new(),
        }
    }

    pub fn with_tool<F, Fut>(mut self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(JsonObject) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
    {
        let handler: Arc<ToolHandler> = Arc::new(move |args| Box::pin(handler(args)));
        self.tools
            .insert(descriptor.name.clone(), (descriptor, handler));
        self
    }

    pub fn with_sync_tool<F>(self, descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(JsonObject) -> Result<ToolOutput, ToolError> + Send + Sync + 'static,
    {
        self.with_tool(descriptor, move |args| {
            let output = handler(args);
            async move { output }
        })
    }

    pub fn with_prompt<F>(mut self, descriptor: PromptDescriptor, handler: F) -> Self
    where
        F: Fn(&PromptArguments) -> Result<RenderedPrompt, ToolError> + Send + Sync + 'static,
    {
        self.prompts
            .insert(descriptor.name.clone(), (descriptor, Arc::new(handler)));
        self
    }

    /// Registers a literal or templated resource; reads match structurally.
    pub fn with_resource<F>(mut self, descriptor: ResourceDescriptor, handler: F) -> Self
    where
        F: Fn(&str) -> Result<ResourceContents, ToolError> + Send + Sync + 'static,
    {
        self.resources.push((descriptor, Arc::new(handler)));
        self
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    fn resources_where(&self, templated: bool) -> Vec<ResourceDescriptor> {
        self.resources
            .iter()
            .filter(|(descriptor, _)| descriptor.uri.is_template() == templated)
            .map(|(descriptor, _)| descriptor.clone())
            .collect()
    }
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .field("prompts", &self.prompts.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tools(&self) -> ToolFuture<'_, Result<Vec<ToolDescriptor>, ToolError>> {
        let tools = self
            .tools
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect();
        Box::pin(async move { Ok(tools) })
    }

    fn list_prompts(&self) -> ToolFuture<'_, Result<Vec<PromptDescriptor>, ToolError>> {
        let prompts = self
            .prompts
            .values()
            .map(|(descriptor, _)| descriptor.clone())
            .collect();
        Box::pin(async move { Ok(prompts) })
    }

    fn list_resources(&self) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
        let resources = self.resources_where(false);
        Box::pin(async move { Ok(resources) })
    }

    fn list_resource_templates(
        &self,
    ) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
        let templates = self.resources_where(true);
        Box::pin(async move { Ok(templates) })
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: JsonObject,
    ) -> ToolFuture<'a, Result<ToolOutput, ToolError>> {
        match self.tools.get(name) {
            Some((_, handler)) => handler(arguments),
            None => {
                let error = ToolError::not_found(format!(
                    "backend '{}' has no tool '{name}'",
                    self.name
                ));
                Box::pin(async move { Err(error) })
            }
        }
    }

    fn get_prompt<'a>(
        &'a self,
        name: &'a str,
        arguments: PromptArguments,
    ) -> ToolFuture<'a, Result<RenderedPrompt, ToolError>> {
        Box::pin(async move {
            let (_, handler) = self.prompts.get(name).ok_or_else(|| {
                ToolError::not_found(format!("backend '{}' has no prompt '{name}'", self.name))
            })?;
            handler(&arguments)
        })
    }

    fn read_resource<'a>(
        &'a self,
        uri: &'a str,
    ) -> ToolFuture<'a, Result<ResourceContents, ToolError>> {
        Box::pin(async move {
            // Literal entries win over templates that would also match.
            let handler = self
                .resources
                .iter()
                .find(|(descriptor, _)| !descriptor.uri.is_template() && descriptor.uri.matches(uri))
                .or_else(|| {
                    self.resources
                        .iter()
                        .find(|(descriptor, _)| descriptor.uri.matches(uri))
                })
                .map(|(_, handler)| Arc::clone(handler))
                .ok_or_else(|| {
                    ToolError::not_found(format!(
                        "backend '{}' has no resource '{uri}'",
                        self.name
                    ))
                })?;
            handler(uri)
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{PromptArgument, ResourceUri, ToolErrorKind};

    fn backend() -> LocalBackend {
        LocalBackend::new("research")
            .with_tool(
                ToolDescriptor::new("echo", "Echo", json!({"type": "object"})),
                |args| async move {
                    Ok(ToolOutput::text(
                        args.get("text").and_then(|v| v.as_str()).unwrap_or_default(),
                    ))
                },
            )
            .with_prompt(
                PromptDescriptor::new("greet", "Greets")
                    .with_argument(PromptArgument::new("name").required()),
                |args| {
                    Ok(RenderedPrompt::from_text(format!(
                        "hello {}",
                        args.get("name").map(String::as_str).unwrap_or("nobody")
                    )))
                },
            )
            .with_resource(
                ResourceDescriptor::new(ResourceUri::parse("papers://folders"), "folders"),
                |_| Ok(ResourceContents::text("papers://folders", "ai\nphysics")),
            )
            .with_resource(
                ResourceDescriptor::new(ResourceUri::parse("papers://{topic}"), "topic"),
                |uri| Ok(ResourceContents::text(uri, format!("papers for {uri}"))),
            )
    }

    #[tokio::test]
    async fn lists_split_literal_resources_from_templates() {
        let backend = backend();
        let resources = backend.list_resources().await.expect("resources should list");
        let templates = backend
            .list_resource_templates()
            .await
            .expect("templates should list");

        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri.as_str(), "papers://folders");
        assert_eq!(templates.len(), 1);
        assert!(templates[0].uri.is_template());
    }

    #[tokio::test]
    async fn literal_resource_wins_over_matching_template() {
        let backend = backend();
        let folders = backend
            .read_resource("papers://folders")
            .await
            .expect("folders should read");
        let topic = backend
            .read_resource("papers://ai")
            .await
            .expect("topic should read");

        assert_eq!(folders.render(), "ai\nphysics");
        assert_eq!(topic.render(), "papers for papers://ai");
    }

    #[tokio::test]
    async fn calls_tools_and_prompts_by_name() {
        let backend = backend();
        let mut args = JsonObject::new();
        args.insert("text".to_string(), json!("ping"));

        let output = backend.call_tool("echo", args).await.expect("tool should run");
        assert_eq!(output.render(), "ping");

        let mut prompt_args = PromptArguments::new();
        prompt_args.insert("name".to_string(), "ada".to_string());
        let prompt = backend
            .get_prompt("greet", prompt_args)
            .await
            .expect("prompt should render");
        assert_eq!(prompt.text(), "hello ada");

        let error = backend
            .call_tool("missing", JsonObject::new())
            .await
            .expect_err("unknown tool should fail");
        assert_eq!(error.kind, ToolErrorKind::NotFound);
    }
}
