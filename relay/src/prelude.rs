//! Common imports for embedding relay.

pub use crate::{
    BANNER, ConsoleHooks, Flow, ProviderBuildConfig, RelayConfig, RelayRuntime, Repl,
    ServerConfigFile, build_provider, build_runtime, chat_service, chat_session, connect_servers,
    register_backends,
};
pub use rchat::prelude::*;
pub use rtooling::{LocalBackend, StdioServerConfig};
