//! Progress lines printed while the model works through tool calls.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rchat::{ChatError, ChatLoopHooks, ChatTurnResult, LoopState, NoopChatLoopHooks};
use rcommon::SessionId;
use rprovider::ToolCall;
use rtooling::{ToolError, ToolExecutionResult};

/// Prints tool activity to the console and forwards every event to `observer`.
pub struct ConsoleHooks {
    out: Mutex<Box<dyn Write + Send>>,
    observer: Arc<dyn ChatLoopHooks>,
}

impl ConsoleHooks {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            observer: Arc::new(NoopChatLoopHooks),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    pub fn with_observer(mut self, observer: Arc<dyn ChatLoopHooks>) -> Self {
        self.observer = observer;
        self
    }

    fn print(&self, line: &str) {
        // A poisoned or closed console must not abort the turn.
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }
}

pub fn tool_start_line(tool_call: &ToolCall) -> String {
    format!(
        "🛠️  Calling tool `{}` with arguments: {}",
        tool_call.name,
        tool_call.arguments.trim()
    )
}

pub fn tool_success_line(tool_call: &ToolCall) -> String {
    format!("✅ Tool `{}` finished.", tool_call.name)
}

pub fn tool_failure_line(tool_call: &ToolCall, error: &ToolError) -> String {
    format!("❌ Tool `{}` failed: {}", tool_call.name, error.message)
}

impl ChatLoopHooks for ConsoleHooks {
    fn on_state_change(&self, session_id: &SessionId, state: LoopState) {
        self.observer.on_state_change(session_id, state);
    }

    fn on_model_response(
        &self,
        session_id: &SessionId,
        model_turn: u32,
        text: &str,
        tool_calls: &[ToolCall],
    ) {
        // Interim reasoning the model emits alongside tool calls.
        if !tool_calls.is_empty() && !text.trim().is_empty() {
            self.print(text.trim());
        }
        self.observer
            .on_model_response(session_id, model_turn, text, tool_calls);
    }

    fn on_tool_call_start(&self, session_id: &SessionId, tool_call: &ToolCall) {
        self.print(&tool_start_line(tool_call));
        self.observer.on_tool_call_start(session_id, tool_call);
    }

    fn on_tool_call_success(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        self.print(&tool_success_line(tool_call));
        self.observer
            .on_tool_call_success(session_id, tool_call, result, elapsed);
    }

    fn on_tool_call_failure(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        error: &ToolError,
        elapsed: Duration,
    ) {
        self.print(&tool_failure_line(tool_call, error));
        self.observer
            .on_tool_call_failure(session_id, tool_call, error, elapsed);
    }

    fn on_turn_complete(&self, result: &ChatTurnResult, elapsed: Duration) {
        self.observer.on_turn_complete(result, elapsed);
    }

    fn on_turn_failure(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        self.observer.on_turn_failure(session_id, error, elapsed);
    }
}

/// A cloneable in-memory console for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        match self.bytes.lock() {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => String::new(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .bytes
            .lock()
            .map_err(|_| std::io::Error::other("console buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
