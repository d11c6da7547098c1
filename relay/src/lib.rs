//! Interactive chat client that routes model tool calls to MCP servers.
//!
//! This crate re-exports the workspace crates and holds the pieces the
//! `relay` binary is assembled from: settings, provider construction,
//! server startup, console output, and command dispatch.

pub mod config;
pub mod console;
pub mod prelude;
pub mod providers;
pub mod repl;
pub mod runtime;

pub use rchat;
pub use rcommon;
pub use robserve;
pub use rprovider;
pub use rtooling;

pub use config::{CliArgs, ConfigError, RejectedServer, RelayConfig, ServerConfigFile};
pub use console::{ConsoleHooks, SharedBuffer};
pub use providers::{ProviderBuildConfig, build_provider};
pub use repl::{BANNER, Flow, Repl};
pub use runtime::{
    Connections, RelayRuntime, RuntimeError, ServerFailure, build_runtime, chat_service,
    chat_session, connect_servers, register_backends,
};
