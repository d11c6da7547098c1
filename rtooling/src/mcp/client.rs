//! Newline-delimited JSON-RPC client speaking MCP over any async byte stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rust_mcp_schema::InitializeResult;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::ToolError;

use super::protocol::{
    IncomingMessage, JSONRPC_VERSION, OutgoingNotification, OutgoingRequest, OutgoingResponse,
    RpcError, format_rpc_error, initialize_params,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

type Reader = Box<dyn AsyncBufRead + Unpin + Send>;
type Writer = Box<dyn AsyncWrite + Unpin + Send>;

struct Channel {
    reader: Reader,
    writer: Writer,
}

/// Outcome of a request that reached the server.
#[derive(Debug)]
pub enum RpcReply {
    Result(Value),
    Error(RpcError),
}

/// One MCP session. Requests are serialized through an async mutex so
/// responses never interleave.
pub struct McpClient {
    channel: Mutex<Channel>,
    next_id: AtomicU64,
    timeout: Duration,
    server: InitializeResult,
}

impl McpClient {
    /// Runs the `initialize` handshake and sends `notifications/initialized`.
    pub async fn connect<R, W>(reader: R, writer: W, timeout: Duration) -> Result<Self, ToolError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut channel = Channel {
            reader: Box::new(reader),
            writer: Box::new(writer),
        };

        let params = serde_json::to_value(initialize_params())
            .map_err(|err| ToolError::protocol(err.to_string()))?;

        let reply = with_timeout(timeout, "initialize", async {
            channel.exchange(0, "initialize", Some(params)).await
        })
        .await?;
        let server: InitializeResult = decode_reply("initialize", reply)?;
        if server.protocol_version.trim().is_empty() {
            return Err(ToolError::protocol("initialize response has no protocol version"));
        }

        channel
            .send_frame(&OutgoingNotification {
                jsonrpc: JSONRPC_VERSION,
                method: "notifications/initialized",
                params: None,
            })
            .await?;

        tracing::debug!(
            protocol_version = %server.protocol_version,
            server = %server.server_info.name,
            "mcp session initialized"
        );

        Ok(Self {
            channel: Mutex::new(channel),
            next_id: AtomicU64::new(1),
            timeout,
            server,
        })
    }

    pub fn server(&self) -> &InitializeResult {
        &self.server
    }

    /// Sends a request and returns the raw reply, including JSON-RPC errors.
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<RpcReply, ToolError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut channel = self.channel.lock().await;
        with_timeout(self.timeout, method, channel.exchange(id, method, params)).await
    }

    /// Sends a request and decodes its result, treating JSON-RPC errors as failures.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, ToolError> {
        let reply = self.request(method, params).await?;
        decode_reply(method, reply)
    }
}

impl std::fmt::Debug for McpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpClient")
            .field("protocol_version", &self.server.protocol_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Channel {
    async fn send_frame<T: serde::Serialize>(&mut self, frame: &T) -> Result<(), ToolError> {
        let mut line =
            serde_json::to_vec(frame).map_err(|err| ToolError::protocol(err.to_string()))?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|err| ToolError::transport(format!("failed to write to server: {err}")))?;
        self.writer
            .flush()
            .await
            .map_err(|err| ToolError::transport(format!("failed to flush server input: {err}")))
    }

    async fn exchange(
        &mut self,
        id: u64,
        method: &str,
        params: Option<Value>,
    ) -> Result<RpcReply, ToolError> {
        self.send_frame(&OutgoingRequest {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        })
        .await?;

        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .map_err(|err| ToolError::transport(format!("failed to read from server: {err}")))?;
            if read == 0 {
                return Err(ToolError::transport("server closed the connection"));
            }
            if line.trim().is_empty() {
                continue;
            }

            let message: IncomingMessage = match serde_json::from_str(line.trim()) {
                Ok(message) => message,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping non JSON-RPC line from server");
                    continue;
                }
            };

            match (message.method, message.id) {
                (Some(server_method), Some(request_id)) => {
                    self.answer_server_request(&server_method, request_id).await?;
                }
                (Some(server_method), None) => {
                    tracing::debug!(method = %server_method, "ignoring server notification");
                }
                (None, Some(response_id)) if response_id.as_u64() == Some(id) => {
                    return match (message.result, message.error) {
                        (_, Some(error)) => Ok(RpcReply::Error(error)),
                        (Some(result), None) => Ok(RpcReply::Result(result)),
                        (None, None) => Ok(RpcReply::Result(Value::Null)),
                    };
                }
                (None, stale) => {
                    tracing::debug!(id = ?stale, expected = id, "discarding unmatched response");
                }
            }
        }
    }

    async fn answer_server_request(&mut self, method: &str, id: Value) -> Result<(), ToolError> {
        let response = if method == "ping" {
            OutgoingResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: Some(serde_json::json!({})),
                error: None,
            }
        } else {
            tracing::debug!(method, "declining unsupported server request");
            OutgoingResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: None,
                error: Some(RpcError::method_not_found(method)),
            }
        };
        self.send_frame(&response).await
    }
}

async fn with_timeout<F>(timeout: Duration, method: &str, future: F) -> Result<RpcReply, ToolError>
where
    F: std::future::Future<Output = Result<RpcReply, ToolError>>,
{
    tokio::time::timeout(timeout, future).await.map_err(|_| {
        ToolError::timeout(format!(
            "'{method}' did not answer within {}s",
            timeout.as_secs_f32()
        ))
    })?
}

fn decode_reply<T: DeserializeOwned>(method: &str, reply: RpcReply) -> Result<T, ToolError> {
    match reply {
        RpcReply::Result(value) => serde_json::from_value(value).map_err(|err| {
            ToolError::protocol(format!("unexpected '{method}' result shape: {err}"))
        }),
        RpcReply::Error(error) => Err(ToolError::execution(format_rpc_error(&error))),
    }
}
