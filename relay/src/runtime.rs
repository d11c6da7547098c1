//! Startup wiring: connect MCP servers, discover their capabilities, and
//! assemble the chat service.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use rchat::{ChatLoopHooks, ChatPolicy, ChatService, ChatSession};
use robserve::{SafeChatHooks, SafeProviderHooks, SafeToolHooks, log_discovery_report, standard_hooks};
use rprovider::{ModelProvider, ProviderError};
use rtooling::{
    Backend, DiscoveryReport, SessionRegistry, StdioConnectOptions, ToolError, connect_stdio,
    discover,
};

use crate::config::{ConfigError, RelayConfig, ServerConfigFile};
use crate::console::ConsoleHooks;
use crate::providers::{ProviderBuildConfig, build_provider};

/// A configured server that could not be launched or initialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerFailure {
    pub server: String,
    pub error: ToolError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Connections {
    pub reports: Vec<DiscoveryReport>,
    pub failures: Vec<ServerFailure>,
}

impl Connections {
    pub fn connected(&self) -> usize {
        self.reports.len()
    }
}

/// Launches every configured server in file order and registers what it offers.
///
/// A server that fails to start, or whose entry was rejected, is reported
/// and skipped.
pub async fn connect_servers(
    registry: &mut SessionRegistry,
    servers: &ServerConfigFile,
    options: StdioConnectOptions,
) -> Connections {
    let mut connections = Connections::default();
    for rejected in &servers.rejected {
        connections.failures.push(ServerFailure {
            server: rejected.server.clone(),
            error: ToolError::invalid_arguments(format!(
                "invalid server config: {}",
                rejected.message
            )),
        });
    }

    for (name, config) in &servers.servers {
        tracing::info!(server = %name, command = %config.display_command(), "connecting MCP server");
        match connect_stdio(name, config, options).await {
            Ok(backend) => {
                let report = discover(registry, Arc::new(backend)).await;
                log_discovery_report(&report);
                connections.reports.push(report);
            }
            Err(error) => {
                tracing::error!(server = %name, error = %error, "failed to connect MCP server");
                connections.failures.push(ServerFailure {
                    server: name.clone(),
                    error,
                });
            }
        }
    }

    connections
}

/// Registers already-connected backends, in order.
pub async fn register_backends(
    registry: &mut SessionRegistry,
    backends: Vec<Arc<dyn Backend>>,
) -> Vec<DiscoveryReport> {
    let mut reports = Vec::with_capacity(backends.len());
    for backend in backends {
        let report = discover(registry, backend).await;
        log_discovery_report(&report);
        reports.push(report);
    }
    reports
}

/// Builds the chat service over a populated registry.
pub fn chat_service(
    provider: Arc<dyn ModelProvider>,
    registry: SessionRegistry,
    config: &RelayConfig,
    hooks: Arc<dyn ChatLoopHooks>,
) -> ChatService {
    let policy = ChatPolicy::default()
        .with_max_turns(config.max_turns)
        .with_max_tokens(config.max_completion_tokens);

    ChatService::builder(provider)
        .registry(Arc::new(registry))
        .tool_hooks(Arc::new(SafeToolHooks::new(standard_hooks())))
        .policy(policy)
        .hooks(hooks)
        .build()
}

pub fn chat_session(config: &RelayConfig) -> ChatSession {
    let session = ChatSession::new("relay-interactive", config.model.clone());
    match &config.system_prompt {
        Some(prompt) => session.with_system_prompt(prompt.clone()),
        None => session,
    }
}

pub struct RelayRuntime {
    pub chat: ChatService,
    pub session: ChatSession,
    pub resource_scheme: String,
    pub connections: Connections,
}

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Provider(ProviderError),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "{error}"),
            Self::Provider(error) => write!(f, "cannot build model provider: {error}"),
        }
    }
}

impl Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<ProviderError> for RuntimeError {
    fn from(error: ProviderError) -> Self {
        Self::Provider(error)
    }
}

/// Full startup from validated settings: servers, provider, and chat service.
pub async fn build_runtime(config: &RelayConfig) -> Result<RelayRuntime, RuntimeError> {
    let servers = ServerConfigFile::load(&config.server_config)?;
    if servers.is_empty() {
        tracing::warn!(
            path = %config.server_config.display(),
            "no MCP servers configured; tools, prompts, and resources are unavailable"
        );
    }

    let provider = build_provider(
        ProviderBuildConfig::new(config.api_key.clone(), config.api_base.clone())
            .with_model(config.model.clone())
            .with_hooks(Arc::new(SafeProviderHooks::new(standard_hooks()))),
    )?;

    let mut registry = SessionRegistry::with_policy(config.collision_policy);
    let options = StdioConnectOptions {
        request_timeout: config.request_timeout,
    };
    let connections = connect_servers(&mut registry, &servers, options).await;

    let hooks = ConsoleHooks::stdout().with_observer(Arc::new(SafeChatHooks::new(standard_hooks())));
    let chat = chat_service(provider, registry, config, Arc::new(hooks));

    Ok(RelayRuntime {
        chat,
        session: chat_session(config),
        resource_scheme: config.resource_scheme.clone(),
        connections,
    })
}
