use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use rchat::{ChatError, ChatLoopHooks, ChatTurnResult, LoopState};
use rcommon::SessionId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{
    ToolError, ToolExecutionContext, ToolExecutionResult, ToolOutput, ToolRuntimeHooks,
};

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(provider, operation, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        }));
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(provider, operation, attempts)
        }));
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_failure(provider, operation, attempts, error)
        }));
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolRuntimeHooks for SafeToolHooks<H>
where
    H: ToolRuntimeHooks,
{
    fn on_unresolved_tool(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_unresolved_tool(tool_call, context)
        }));
    }

    fn on_rejected_arguments(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_rejected_arguments(backend, tool_call, context, error)
        }));
    }

    fn on_backend_call_start(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_backend_call_start(backend, tool_call, context)
        }));
    }

    fn on_backend_call_finish(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        outcome: Result<&ToolOutput, &ToolError>,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_backend_call_finish(backend, tool_call, context, outcome, elapsed)
        }));
    }
}

/// Isolates the chat loop from panicking [`ChatLoopHooks`] implementations.
pub struct SafeChatHooks<H> {
    inner: H,
}

impl<H> SafeChatHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ChatLoopHooks for SafeChatHooks<H>
where
    H: ChatLoopHooks,
{
    fn on_state_change(&self, session_id: &SessionId, state: LoopState) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_state_change(session_id, state)
        }));
    }

    fn on_model_response(
        &self,
        session_id: &SessionId,
        model_turn: u32,
        text: &str,
        tool_calls: &[ToolCall],
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_model_response(session_id, model_turn, text, tool_calls)
        }));
    }

    fn on_tool_call_start(&self, session_id: &SessionId, tool_call: &ToolCall) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_tool_call_start(session_id, tool_call)
        }));
    }

    fn on_tool_call_success(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_tool_call_success(session_id, tool_call, result, elapsed)
        }));
    }

    fn on_tool_call_failure(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        error: &ToolError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_tool_call_failure(session_id, tool_call, error, elapsed)
        }));
    }

    fn on_turn_complete(&self, result: &ChatTurnResult, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_complete(result, elapsed)
        }));
    }

    fn on_turn_failure(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_turn_failure(session_id, error, elapsed)
        }));
    }
}
