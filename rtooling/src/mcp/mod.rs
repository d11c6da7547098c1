//! Model Context Protocol client over newline-delimited JSON-RPC.

mod backend;
mod client;
mod protocol;
mod stdio;

pub use backend::McpBackend;
pub use client::{DEFAULT_REQUEST_TIMEOUT, McpClient, RpcReply};
pub use protocol::{METHOD_NOT_FOUND, PROTOCOL_VERSION, RpcError};
pub use rust_mcp_schema::InitializeResult;
pub use stdio::{StdioConnectOptions, StdioServerConfig, connect_stdio};
