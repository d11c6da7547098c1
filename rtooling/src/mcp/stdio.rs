//! Launching MCP servers as child processes and talking to them over stdio.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::ToolError;

use super::backend::McpBackend;
use super::client::{DEFAULT_REQUEST_TIMEOUT, McpClient};

/// One `mcpServers` entry: how to launch a stdio server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StdioServerConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl StdioServerConfig {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn display_command(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdioConnectOptions {
    pub request_timeout: Duration,
}

impl Default for StdioConnectOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Spawns the server, drains its stderr into debug logs, and runs the
/// MCP handshake. The process is killed when the backend drops.
pub async fn connect_stdio(
    name: &str,
    config: &StdioServerConfig,
    options: StdioConnectOptions,
) -> Result<McpBackend, ToolError> {
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(cwd) = &config.cwd {
        command.current_dir(cwd);
    }

    let mut child = command.spawn().map_err(|err| {
        ToolError::transport(format!(
            "failed to start MCP server '{name}' ({}): {err}",
            config.display_command()
        ))
    })?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| ToolError::transport(format!("server '{name}' has no stdin pipe")))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ToolError::transport(format!("server '{name}' has no stdout pipe")))?;

    if let Some(stderr) = child.stderr.take() {
        let server = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(server = %server, "{line}");
            }
        });
    }

    tracing::info!(
        server = %name,
        command = %config.display_command(),
        "starting MCP server"
    );

    let client = McpClient::connect(BufReader::new(stdout), stdin, options.request_timeout).await?;
    Ok(McpBackend::new(name, client).with_child(child))
}
