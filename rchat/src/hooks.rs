//! Hooks observing the tool-calling loop.
//!
//! ```rust
//! use rchat::{ChatLoopHooks, NoopChatLoopHooks};
//!
//! fn accepts_hooks(_hooks: &dyn ChatLoopHooks) {}
//!
//! accepts_hooks(&NoopChatLoopHooks);
//! ```

use std::time::Duration;

use rcommon::SessionId;
use rprovider::ToolCall;
use rtooling::{ToolError, ToolExecutionResult};

use crate::{ChatError, ChatTurnResult, LoopState};

pub trait ChatLoopHooks: Send + Sync {
    fn on_state_change(&self, _session_id: &SessionId, _state: LoopState) {}

    fn on_model_response(
        &self,
        _session_id: &SessionId,
        _model_turn: u32,
        _text: &str,
        _tool_calls: &[ToolCall],
    ) {
    }

    fn on_tool_call_start(&self, _session_id: &SessionId, _tool_call: &ToolCall) {}

    fn on_tool_call_success(
        &self,
        _session_id: &SessionId,
        _tool_call: &ToolCall,
        _result: &ToolExecutionResult,
        _elapsed: Duration,
    ) {
    }

    fn on_tool_call_failure(
        &self,
        _session_id: &SessionId,
        _tool_call: &ToolCall,
        _error: &ToolError,
        _elapsed: Duration,
    ) {
    }

    fn on_turn_complete(&self, _result: &ChatTurnResult, _elapsed: Duration) {}

    fn on_turn_failure(&self, _session_id: &SessionId, _error: &ChatError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChatLoopHooks;

impl ChatLoopHooks for NoopChatLoopHooks {}
