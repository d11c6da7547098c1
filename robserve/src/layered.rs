//! Runs two hook implementations in sequence.
//!
//! ```rust
//! use robserve::{LayeredHooks, MetricsObservabilityHooks, TracingObservabilityHooks};
//! use rtooling::ToolRuntimeHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = LayeredHooks::new(TracingObservabilityHooks, MetricsObservabilityHooks);
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatError, ChatLoopHooks, ChatTurnResult, LoopState};
use rcommon::SessionId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{
    ToolError, ToolExecutionContext, ToolExecutionResult, ToolOutput, ToolRuntimeHooks,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredHooks<A, B> {
    first: A,
    second: B,
}

impl<A, B> LayeredHooks<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

/// Tracing events plus metrics for every callback.
pub fn standard_hooks()
-> LayeredHooks<crate::TracingObservabilityHooks, crate::MetricsObservabilityHooks> {
    LayeredHooks::new(
        crate::TracingObservabilityHooks,
        crate::MetricsObservabilityHooks,
    )
}

impl<A, B> ProviderOperationHooks for LayeredHooks<A, B>
where
    A: ProviderOperationHooks,
    B: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        self.first.on_attempt_start(provider, operation, attempt);
        self.second.on_attempt_start(provider, operation, attempt);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        self.first
            .on_retry_scheduled(provider, operation, attempt, delay, error);
        self.second
            .on_retry_scheduled(provider, operation, attempt, delay, error);
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        self.first.on_success(provider, operation, attempts);
        self.second.on_success(provider, operation, attempts);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        self.first.on_failure(provider, operation, attempts, error);
        self.second.on_failure(provider, operation, attempts, error);
    }
}

impl<A, B> ToolRuntimeHooks for LayeredHooks<A, B>
where
    A: ToolRuntimeHooks,
    B: ToolRuntimeHooks,
{
    fn on_unresolved_tool(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        self.first.on_unresolved_tool(tool_call, context);
        self.second.on_unresolved_tool(tool_call, context);
    }

    fn on_rejected_arguments(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
    ) {
        self.first
            .on_rejected_arguments(backend, tool_call, context, error);
        self.second
            .on_rejected_arguments(backend, tool_call, context, error);
    }

    fn on_backend_call_start(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) {
        self.first.on_backend_call_start(backend, tool_call, context);
        self.second.on_backend_call_start(backend, tool_call, context);
    }

    fn on_backend_call_finish(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        outcome: Result<&ToolOutput, &ToolError>,
        elapsed: Duration,
    ) {
        self.first
            .on_backend_call_finish(backend, tool_call, context, outcome, elapsed);
        self.second
            .on_backend_call_finish(backend, tool_call, context, outcome, elapsed);
    }
}

impl<A, B> ChatLoopHooks for LayeredHooks<A, B>
where
    A: ChatLoopHooks,
    B: ChatLoopHooks,
{
    fn on_state_change(&self, session_id: &SessionId, state: LoopState) {
        self.first.on_state_change(session_id, state);
        self.second.on_state_change(session_id, state);
    }

    fn on_model_response(
        &self,
        session_id: &SessionId,
        model_turn: u32,
        text: &str,
        tool_calls: &[ToolCall],
    ) {
        self.first
            .on_model_response(session_id, model_turn, text, tool_calls);
        self.second
            .on_model_response(session_id, model_turn, text, tool_calls);
    }

    fn on_tool_call_start(&self, session_id: &SessionId, tool_call: &ToolCall) {
        self.first.on_tool_call_start(session_id, tool_call);
        self.second.on_tool_call_start(session_id, tool_call);
    }

    fn on_tool_call_success(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        result: &ToolExecutionResult,
        elapsed: Duration,
    ) {
        self.first
            .on_tool_call_success(session_id, tool_call, result, elapsed);
        self.second
            .on_tool_call_success(session_id, tool_call, result, elapsed);
    }

    fn on_tool_call_failure(
        &self,
        session_id: &SessionId,
        tool_call: &ToolCall,
        error: &ToolError,
        elapsed: Duration,
    ) {
        self.first
            .on_tool_call_failure(session_id, tool_call, error, elapsed);
        self.second
            .on_tool_call_failure(session_id, tool_call, error, elapsed);
    }

    fn on_turn_complete(&self, result: &ChatTurnResult, elapsed: Duration) {
        self.first.on_turn_complete(result, elapsed);
        self.second.on_turn_complete(result, elapsed);
    }

    fn on_turn_failure(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        self.first.on_turn_failure(session_id, error, elapsed);
        self.second.on_turn_failure(session_id, error, elapsed);
    }
}
