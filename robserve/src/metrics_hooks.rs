//! Metrics-based observability hooks for provider calls, tool execution, and the chat loop.
//!
//! ```rust
//! use robserve::MetricsObservabilityHooks;
//! use rprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use rchat::{ChatError, ChatLoopHooks, ChatTurnResult};
use rcommon::SessionId;
use rprovider::{ProviderError, ProviderId, ProviderOperationHooks, ToolCall};
use rtooling::{ToolError, ToolExecutionContext, ToolOutput, ToolRuntimeHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "relay_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "relay_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_retry_delay_seconds",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "relay_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_attempts_per_success",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "relay_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "relay_provider_attempts_per_failure",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .record(attempts as f64);
    }
}

impl ToolRuntimeHooks for MetricsObservabilityHooks {
    fn on_unresolved_tool(&self, tool_call: &ToolCall, _context: &ToolExecutionContext) {
        metrics::counter!(
            "relay_tool_unresolved_total",
            "tool_name" => tool_call.name.clone()
        )
        .increment(1);
    }

    fn on_rejected_arguments(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
    ) {
        metrics::counter!(
            "relay_tool_arguments_rejected_total",
            "backend" => backend.to_string(),
            "tool_name" => tool_call.name.clone()
        )
        .increment(1);
    }

    fn on_backend_call_start(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
    ) {
        metrics::counter!(
            "relay_tool_backend_call_start_total",
            "backend" => backend.to_string(),
            "tool_name" => tool_call.name.clone()
        )
        .increment(1);
    }

    fn on_backend_call_finish(
        &self,
        backend: &str,
        tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        outcome: Result<&ToolOutput, &ToolError>,
        elapsed: Duration,
    ) {
        let status = match outcome {
            Ok(output) if output.is_error => "flagged".to_string(),
            Ok(_) => "answered".to_string(),
            Err(error) => format!("{:?}", error.kind),
        };
        metrics::counter!(
            "relay_tool_backend_calls_total",
            "backend" => backend.to_string(),
            "tool_name" => tool_call.name.clone(),
            "status" => status.clone()
        )
        .increment(1);
        metrics::histogram!(
            "relay_tool_backend_call_duration_seconds",
            "backend" => backend.to_string(),
            "status" => status
        )
        .record(elapsed.as_secs_f64());
    }
}

impl ChatLoopHooks for MetricsObservabilityHooks {
    fn on_model_response(
        &self,
        _session_id: &SessionId,
        _model_turn: u32,
        _text: &str,
        tool_calls: &[ToolCall],
    ) {
        metrics::counter!("relay_chat_model_response_total").increment(1);
        metrics::histogram!("relay_chat_tool_calls_per_response").record(tool_calls.len() as f64);
    }

    fn on_turn_complete(&self, result: &ChatTurnResult, elapsed: Duration) {
        metrics::counter!(
            "relay_chat_turn_total",
            "status" => "success",
            "max_turns_exceeded" => result.max_turns_exceeded.to_string()
        )
        .increment(1);
        metrics::histogram!("relay_chat_model_turns_per_turn").record(result.model_turns as f64);
        metrics::histogram!("relay_chat_turn_duration_seconds", "status" => "success")
            .record(elapsed.as_secs_f64());
        metrics::counter!("relay_chat_tokens_total", "direction" => "input")
            .increment(u64::from(result.usage.input_tokens));
        metrics::counter!("relay_chat_tokens_total", "direction" => "output")
            .increment(u64::from(result.usage.output_tokens));
    }

    fn on_turn_failure(&self, _session_id: &SessionId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "relay_chat_turn_total",
            "status" => "failure",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("relay_chat_turn_duration_seconds", "status" => "failure")
            .record(elapsed.as_secs_f64());
    }
}
