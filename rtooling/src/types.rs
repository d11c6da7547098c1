//! Tool runtime context and execution result types.

use rcommon::{SessionId, TraceId};
use rprovider::ToolCall;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionContext {
    pub session_id: SessionId,
    pub trace_id: Option<TraceId>,
    /// Model turn that requested the call, starting at 1.
    pub turn: u32,
}

impl ToolExecutionContext {
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            trace_id: None,
            turn: 1,
        }
    }

    pub fn with_trace_id(mut self, trace_id: impl Into<TraceId>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn with_turn(mut self, turn: u32) -> Self {
        self.turn = turn;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionResult {
    pub tool_call_id: String,
    pub tool_name: String,
    pub output: String,
}

impl ToolExecutionResult {
    pub fn from_call(call: &ToolCall, output: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: output.into(),
        }
    }
}
