//! Capability layer: backends, the session registry, discovery, and tool execution.
//!
//! A [`Backend`] is anything that can list and invoke tools, prompts, and
//! resources. [`discover`] enumerates a backend into a [`SessionRegistry`],
//! which the [`RegistryToolRuntime`] then uses to route model tool calls.

mod args;
mod backend;
mod capability;
mod discovery;
mod error;
mod hooks;
mod local;
pub mod mcp;
mod registry;
mod runtime;
mod types;

pub mod prelude {
    pub use crate::{
        Backend, CollisionPolicy, DiscoveryReport, LocalBackend, PromptDescriptor,
        RegistryToolRuntime, ResourceDescriptor, ResourceUri, SessionRegistry, ToolDescriptor,
        ToolError, ToolErrorKind, ToolExecutionContext, ToolExecutionResult, ToolFuture,
        ToolOutput, ToolRuntime, discover,
    };
}

pub use args::{parse_json_value, parse_prompt_args, parse_tool_arguments};
pub use backend::{Backend, PromptArguments, ToolFuture};
pub use capability::{
    ContentBlock, JsonObject, PromptArgument, PromptDescriptor, PromptMessage, RenderedPrompt,
    ResourceBody, ResourceContents, ResourceDescriptor, ResourceItem, ResourceUri, ToolDescriptor,
    ToolOutput, split_scheme,
};
pub use discovery::{CapabilityCategory, DiscoveryFailure, DiscoveryReport, discover};
pub use error::{ToolError, ToolErrorKind};
pub use hooks::{NoopToolRuntimeHooks, ToolRuntimeHooks};
pub use local::LocalBackend;
pub use mcp::{McpBackend, StdioConnectOptions, StdioServerConfig, connect_stdio};
pub use registry::{CollisionPolicy, Registration, SessionRegistry};
pub use runtime::{RegistryToolRuntime, ToolRuntime};
pub use types::{ToolExecutionContext, ToolExecutionResult};
