//! Direct resource reads and prompt runs outside the model's tool loop.

use rtooling::{PromptArguments, PromptDescriptor, ResourceDescriptor, ToolDescriptor};

use crate::{ChatError, ChatService, ChatSession, ChatTurnRequest, PromptRun};

impl ChatService {
    /// Reads a resource by URI, falling back to a template for the URI's scheme.
    pub async fn get_resource(&self, uri: &str) -> Result<String, ChatError> {
        let backend = self
            .registry()
            .resolve_resource(uri)
            .ok_or_else(|| ChatError::not_found(format!("resource not found: {uri}")))?;

        tracing::debug!(uri, backend = %backend.name(), "reading resource");
        let contents = backend.read_resource(uri).await?;
        Ok(contents.render())
    }

    /// Renders a server prompt and runs it as a fresh user turn.
    ///
    /// Declared arguments the caller left out take their default, or an
    /// empty string when none is declared.
    pub async fn execute_prompt(
        &self,
        session: ChatSession,
        name: &str,
        arguments: PromptArguments,
    ) -> Result<PromptRun, ChatError> {
        let (descriptor, backend) = self
            .registry()
            .resolve_prompt(name)
            .ok_or_else(|| ChatError::not_found(format!("prompt not found: {name}")))?;
        let arguments = fill_prompt_arguments(descriptor, arguments);

        let rendered = backend.get_prompt(name, arguments).await?.text();
        if rendered.trim().is_empty() {
            return Err(ChatError::invalid_request(format!(
                "prompt '{name}' rendered no text"
            )));
        }

        let turn = self
            .run_turn(ChatTurnRequest::new(session, rendered.clone()))
            .await?;
        Ok(PromptRun { rendered, turn })
    }

    pub fn list_prompts(&self) -> Vec<PromptDescriptor> {
        self.registry().prompts().cloned().collect()
    }

    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry().tools().cloned().collect()
    }

    /// Literal resources followed by templates.
    pub fn list_resources(&self) -> Vec<ResourceDescriptor> {
        self.registry()
            .resources()
            .chain(self.registry().templates())
            .cloned()
            .collect()
    }
}

fn fill_prompt_arguments(
    descriptor: &PromptDescriptor,
    mut arguments: PromptArguments,
) -> PromptArguments {
    for declared in &descriptor.arguments {
        if arguments.contains_key(&declared.name) {
            continue;
        }
        let value = declared.default.clone().unwrap_or_default();
        arguments.insert(declared.name.clone(), value);
    }
    arguments
}
