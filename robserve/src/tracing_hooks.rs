//! Tracing-based observability hooks for provider calls, tool execution, and the chat loop.
//!
//! ```rust
//! use rchat::ChatLoopHooks;
//! use robserve::TracingObservabilityHooks;
//!
//! fn accepts_chat_hooks(_hooks: &dyn ChatLoopHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_chat_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatError, ChatLoopHooks, ChatTurnResult, LoopState};
use rcommon::SessionId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{
    DiscoveryReport, ToolError, ToolExecutionContext, ToolOutput, ToolRuntimeHooks,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        tracing::debug!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        tracing::debug!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolRuntimeHooks for TracingObservabilityHooks {
    fn on_unresolved_tool(&self, tool_call: &ToolCall, context: &ToolExecutionContext) {
        tracing::warn!(
            phase = "tool",
            event = "unresolved",
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            turn = context.turn
        );
    }

    fn on_rejected_arguments(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        error: &ToolError,
    ) {
        tracing::warn!(
            phase = "tool",
            event = "arguments_rejected",
            backend,
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            turn = context.turn,
            error = %error
        );
    }

    fn on_backend_call_start(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) {
        tracing::info!(
            phase = "tool",
            event = "backend_call_start",
            backend,
            tool_name = tool_call.name,
            tool_call_id = tool_call.id,
            session_id = %context.session_id,
            turn = context.turn,
            trace_id = context.trace_id.as_ref().map(|id| id.as_str())
        );
    }

    fn on_backend_call_finish(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
        outcome: Result<&ToolOutput, &ToolError>,
        elapsed: Duration,
    ) {
        match outcome {
            Ok(output) => tracing::info!(
                phase = "tool",
                event = "backend_call_answered",
                backend,
                tool_name = tool_call.name,
                tool_call_id = tool_call.id,
                session_id = %context.session_id,
                turn = context.turn,
                is_error = output.is_error,
                blocks = output.content.len(),
                elapsed_ms = elapsed.as_millis() as u64
            ),
            Err(error) => tracing::error!(
                phase = "tool",
                event = "backend_call_failed",
                backend,
                tool_name = tool_call.name,
                tool_call_id = tool_call.id,
                session_id = %context.session_id,
                turn = context.turn,
                elapsed_ms = elapsed.as_millis() as u64,
                error_kind = ?error.kind,
                retryable = error.retryable,
                error = %error
            ),
        }
    }
}

impl ChatLoopHooks for TracingObservabilityHooks {
    fn on_state_change(&self, session_id: &SessionId, state: LoopState) {
        tracing::trace!(
            phase = "chat",
            event = "state_change",
            session_id = %session_id,
            state = ?state
        );
    }

    fn on_model_response(
        &self,
        session_id: &SessionId,
        model_turn: u32,
        text: &str,
        tool_calls: &[ToolCall],
    ) {
        tracing::debug!(
            phase = "chat",
            event = "model_response",
            session_id = %session_id,
            model_turn,
            text_bytes = text.len(),
            tool_calls = tool_calls.len()
        );
    }

    fn on_turn_complete(&self, result: &ChatTurnResult, elapsed: Duration) {
        tracing::info!(
            phase = "chat",
            event = "turn_complete",
            session_id = %result.session_id,
            model_turns = result.model_turns,
            tool_calls = result.tool_calls_executed,
            max_turns_exceeded = result.max_turns_exceeded,
            total_tokens = result.usage.total_tokens,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_turn_failure(&self, session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "chat",
            event = "turn_failure",
            session_id = %session_id,
            error_kind = ?error.kind,
            error_phase = ?error.phase,
            retryable = error.retryable,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }
}

/// Summarizes one backend's discovery outcome.
pub fn log_discovery_report(report: &DiscoveryReport) {
    tracing::info!(
        phase = "discovery",
        event = "backend_discovered",
        backend = %report.backend,
        tools = report.tools.len(),
        prompts = report.prompts.len(),
        resources = report.resources.len(),
        templates = report.templates.len(),
        failures = report.failures.len()
    );
}
