//! Capability discovery: enumerate a backend and populate the registry.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::{Backend, SessionRegistry, ToolError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityCategory {
    Tools,
    Prompts,
    Resources,
    ResourceTemplates,
}

impl Display for CapabilityCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tools => "tools",
            Self::Prompts => "prompts",
            Self::Resources => "resources",
            Self::ResourceTemplates => "resource templates",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFailure {
    pub category: CapabilityCategory,
    /// Set when a single capability was refused rather than the whole listing.
    pub capability: Option<String>,
    pub error: ToolError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub backend: String,
    pub tools: Vec<String>,
    pub prompts: Vec<String>,
    pub resources: Vec<String>,
    pub templates: Vec<String>,
    pub failures: Vec<DiscoveryFailure>,
}

impl DiscoveryReport {
    fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
            templates: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn list_failed(&mut self, category: CapabilityCategory, error: ToolError) {
        tracing::warn!(
            backend = %self.backend,
            category = %category,
            error = %error,
            "capability listing failed; continuing with remaining categories"
        );
        self.failures.push(DiscoveryFailure {
            category,
            capability: None,
            error,
        });
    }

    fn register_failed(&mut self, category: CapabilityCategory, capability: String, error: ToolError) {
        tracing::warn!(
            backend = %self.backend,
            category = %category,
            capability = %capability,
            error = %error,
            "capability registration refused"
        );
        self.failures.push(DiscoveryFailure {
            category,
            capability: Some(capability),
            error,
        });
    }
}

/// Lists every capability category of `backend` and registers the results.
///
/// A failing category is recorded in the report; the remaining categories
/// still run.
pub async fn discover(registry: &mut SessionRegistry, backend: Arc<dyn Backend>) -> DiscoveryReport {
    let mut report = DiscoveryReport::new(backend.name());

    match backend.list_tools().await {
        Ok(tools) => {
            for tool in tools {
                let name = tool.name.clone();
                match registry.register_tool(tool, Arc::clone(&backend)) {
                    Ok(_) => report.tools.push(name),
                    Err(error) => report.register_failed(CapabilityCategory::Tools, name, error),
                }
            }
        }
        Err(error) => report.list_failed(CapabilityCategory::Tools, error),
    }

    match backend.list_prompts().await {
        Ok(prompts) => {
            for prompt in prompts {
                let name = prompt.name.clone();
                match registry.register_prompt(prompt, Arc::clone(&backend)) {
                    Ok(_) => report.prompts.push(name),
                    Err(error) => report.register_failed(CapabilityCategory::Prompts, name, error),
                }
            }
        }
        Err(error) => report.list_failed(CapabilityCategory::Prompts, error),
    }

    match backend.list_resources().await {
        Ok(resources) => {
            for resource in resources {
                let uri = resource.uri.as_str().to_string();
                match registry.register_resource(resource, Arc::clone(&backend)) {
                    Ok(_) => report.resources.push(uri),
                    Err(error) => report.register_failed(CapabilityCategory::Resources, uri, error),
                }
            }
        }
        Err(error) => report.list_failed(CapabilityCategory::Resources, error),
    }

    match backend.list_resource_templates().await {
        Ok(templates) => {
            for template in templates {
                let uri = template.uri.as_str().to_string();
                if !template.uri.is_template() {
                    report.register_failed(
                        CapabilityCategory::ResourceTemplates,
                        uri,
                        ToolError::protocol("listed template has no placeholder"),
                    );
                    continue;
                }
                match registry.register_resource(template, Arc::clone(&backend)) {
                    Ok(_) => report.templates.push(uri),
                    Err(error) => {
                        report.register_failed(CapabilityCategory::ResourceTemplates, uri, error)
                    }
                }
            }
        }
        Err(error) => report.list_failed(CapabilityCategory::ResourceTemplates, error),
    }

    tracing::info!(
        backend = %report.backend,
        tools = report.tools.len(),
        prompts = report.prompts.len(),
        resources = report.resources.len(),
        templates = report.templates.len(),
        failures = report.failures.len(),
        "capability discovery finished"
    );

    report
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        CollisionPolicy, JsonObject, LocalBackend, PromptArguments, PromptDescriptor,
        RenderedPrompt, ResourceContents, ResourceDescriptor, ResourceUri, ToolDescriptor,
        ToolErrorKind, ToolFuture, ToolOutput,
    };

    fn research_backend() -> Arc<dyn Backend> {
        Arc::new(
            LocalBackend::new("research")
                .with_sync_tool(
                    ToolDescriptor::new("search_papers", "Search arXiv", json!({"type": "object"})),
                    |_| Ok(ToolOutput::text("[]")),
                )
                .with_sync_tool(
                    ToolDescriptor::new("extract_info", "Paper info", json!({"type": "object"})),
                    |_| Ok(ToolOutput::text("{}")),
                )
                .with_prompt(PromptDescriptor::new("generate_search_prompt", "Search"), |_| {
                    Ok(RenderedPrompt::from_text("search"))
                })
                .with_resource(
                    ResourceDescriptor::new(ResourceUri::parse("papers://folders"), "folders"),
                    |uri| Ok(ResourceContents::text(uri, "")),
                )
                .with_resource(
                    ResourceDescriptor::new(ResourceUri::parse("papers://{topic}"), "topic"),
                    |uri| Ok(ResourceContents::text(uri, "")),
                ),
        )
    }

    /// Serves tools but fails every other listing.
    struct PartiallyBrokenBackend;

    impl Backend for PartiallyBrokenBackend {
        fn name(&self) -> &str {
            "broken"
        }

        fn list_tools(&self) -> ToolFuture<'_, Result<Vec<ToolDescriptor>, ToolError>> {
            Box::pin(async {
                Ok(vec![ToolDescriptor::new("fetch", "Fetch", json!({}))])
            })
        }

        fn list_prompts(&self) -> ToolFuture<'_, Result<Vec<PromptDescriptor>, ToolError>> {
            Box::pin(async { Err(ToolError::transport("pipe closed")) })
        }

        fn list_resources(&self) -> ToolFuture<'_, Result<Vec<ResourceDescriptor>, ToolError>> {
            Box::pin(async { Err(ToolError::timeout("no answer")) })
        }

        fn call_tool<'a>(
            &'a self,
            _name: &'a str,
            _arguments: JsonObject,
        ) -> ToolFuture<'a, Result<ToolOutput, ToolError>> {
            Box::pin(async { Err(ToolError::other("unused")) })
        }

        fn get_prompt<'a>(
            &'a self,
            _name: &'a str,
            _arguments: PromptArguments,
        ) -> ToolFuture<'a, Result<RenderedPrompt, ToolError>> {
            Box::pin(async { Err(ToolError::other("unused")) })
        }

        fn read_resource<'a>(
            &'a self,
            _uri: &'a str,
        ) -> ToolFuture<'a, Result<ResourceContents, ToolError>> {
            Box::pin(async { Err(ToolError::other("unused")) })
        }
    }

    #[tokio::test]
    async fn discovery_registers_every_category() {
        let mut registry = SessionRegistry::new();
        let report = discover(&mut registry, research_backend()).await;

        assert!(report.is_clean());
        assert_eq!(report.tools, vec!["search_papers", "extract_info"]);
        assert_eq!(report.prompts, vec!["generate_search_prompt"]);
        assert_eq!(report.resources, vec!["papers://folders"]);
        assert_eq!(report.templates, vec!["papers://{topic}"]);
        assert!(registry.resolve_resource("papers://ai").is_some());
    }

    #[tokio::test]
    async fn discovery_is_idempotent() {
        let mut registry = SessionRegistry::new();
        let backend = research_backend();

        discover(&mut registry, Arc::clone(&backend)).await;
        let second = discover(&mut registry, backend).await;

        assert!(second.is_clean());
        assert_eq!(registry.tools().count(), 2);
        assert_eq!(registry.prompts().count(), 1);
        assert_eq!(registry.resources().count(), 1);
        assert_eq!(registry.templates().count(), 1);
    }

    #[tokio::test]
    async fn failing_categories_are_reported_and_others_still_register() {
        let mut registry = SessionRegistry::new();
        let report = discover(&mut registry, Arc::new(PartiallyBrokenBackend)).await;

        assert_eq!(report.tools, vec!["fetch"]);
        let categories = report
            .failures
            .iter()
            .map(|failure| failure.category)
            .collect::<Vec<_>>();
        assert_eq!(
            categories,
            vec![CapabilityCategory::Prompts, CapabilityCategory::Resources]
        );
        assert!(registry.resolve_tool("fetch").is_some());
    }

    #[tokio::test]
    async fn rejected_collisions_show_up_as_failures() {
        let mut registry = SessionRegistry::with_policy(CollisionPolicy::Reject);
        discover(&mut registry, research_backend()).await;

        let rival: Arc<dyn Backend> = Arc::new(LocalBackend::new("rival").with_sync_tool(
            ToolDescriptor::new("search_papers", "Rival search", json!({})),
            |_| Ok(ToolOutput::text("rival")),
        ));
        let report = discover(&mut registry, rival).await;

        assert!(report.tools.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].capability.as_deref(), Some("search_papers"));
        assert_eq!(report.failures[0].error.kind, ToolErrorKind::Collision);
        assert_eq!(registry.owner_of_tool("search_papers"), Some("research"));
    }
}
