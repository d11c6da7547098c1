//! Tool runtime trait and default registry-backed executor.

use std::sync::Arc;
use std::time::Instant;

use rprovider::{ToolCall, ToolDefinition};

use crate::{
    NoopToolRuntimeHooks, SessionRegistry, ToolError, ToolExecutionContext, ToolExecutionResult,
    ToolFuture, ToolRuntimeHooks, parse_tool_arguments,
};

pub trait ToolRuntime: Send + Sync {
    /// Tool definitions offered to the model on every request.
    fn definitions(&self) -> Vec<ToolDefinition>;

    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>>;
}

/// Dispatches tool calls to whichever backend the registry names.
#[derive(Clone)]
pub struct RegistryToolRuntime {
    registry: Arc<SessionRegistry>,
    hooks: Arc<dyn ToolRuntimeHooks>,
}

impl RegistryToolRuntime {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self {
            registry,
            hooks: Arc::new(NoopToolRuntimeHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn registry(&self) -> Arc<SessionRegistry> {
        Arc::clone(&self.registry)
    }

    async fn dispatch(
        &self,
        tool_call: &ToolCall,
        context: &ToolExecutionContext,
    ) -> Result<String, ToolError> {
        let Some(backend) = self.registry.resolve_tool(&tool_call.name) else {
            self.hooks.on_unresolved_tool(tool_call, context);
            return Err(ToolError::not_found(format!(
                "tool not found: '{}'",
                tool_call.name
            )));
        };
        let arguments = match parse_tool_arguments(&tool_call.arguments) {
            Ok(arguments) => arguments,
            Err(error) => {
                self.hooks
                    .on_rejected_arguments(backend.name(), tool_call, context, &error);
                return Err(error);
            }
        };

        tracing::debug!(
            tool = %tool_call.name,
            backend = %backend.name(),
            "dispatching tool call"
        );
        self.hooks
            .on_backend_call_start(backend.name(), tool_call, context);
        let started = Instant::now();
        let outcome = backend.call_tool(&tool_call.name, arguments).await;
        self.hooks.on_backend_call_finish(
            backend.name(),
            tool_call,
            context,
            outcome.as_ref(),
            started.elapsed(),
        );

        let output = outcome?;
        if output.is_error {
            return Err(ToolError::execution(output.render()));
        }
        Ok(output.render())
    }
}

impl ToolRuntime for RegistryToolRuntime {
    fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.tool_definitions()
    }

    fn execute<'a>(
        &'a self,
        tool_call: ToolCall,
        context: ToolExecutionContext,
    ) -> ToolFuture<'a, Result<ToolExecutionResult, ToolError>> {
        Box::pin(async move {
            match self.dispatch(&tool_call, &context).await {
                Ok(output) => Ok(ToolExecutionResult::from_call(&tool_call, output)),
                Err(error) => Err(error
                    .with_tool_name(tool_call.name.clone())
                    .with_tool_call_id(tool_call.id.clone())),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{Backend, LocalBackend, ToolDescriptor, ToolErrorKind, ToolOutput};

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl RecordingHooks {
        fn push(&self, event: String) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    impl ToolRuntimeHooks for RecordingHooks {
        fn on_unresolved_tool(&self, tool_call: &ToolCall, _context: &ToolExecutionContext) {
            self.push(format!("unresolved:{}", tool_call.name));
        }

        fn on_rejected_arguments(
            &self,
            backend: &str,
            tool_call: &ToolCall,
            _context: &ToolExecutionContext,
            error: &ToolError,
        ) {
            self.push(format!("rejected:{backend}:{}:{:?}", tool_call.name, error.kind));
        }

        fn on_backend_call_start(
            &self,
            backend: &str,
            tool_call: &ToolCall,
            _context: &ToolExecutionContext,
        ) {
            self.push(format!("start:{backend}:{}", tool_call.name));
        }

        fn on_backend_call_finish(
            &self,
            backend: &str,
            tool_call: &ToolCall,
            _context: &ToolExecutionContext,
            outcome: Result<&ToolOutput, &ToolError>,
            _elapsed: Duration,
        ) {
            let outcome = match outcome {
                Ok(output) if output.is_error => "flagged".to_string(),
                Ok(_) => "ok".to_string(),
                Err(error) => format!("{:?}", error.kind),
            };
            self.push(format!("finish:{backend}:{}:{outcome}", tool_call.name));
        }
    }

    fn runtime(hooks: Arc<RecordingHooks>) -> RegistryToolRuntime {
        let backend: Arc<dyn Backend> = Arc::new(
            LocalBackend::new("research")
                .with_sync_tool(
                    ToolDescriptor::new("echo", "Echo", json!({"type": "object"})),
                    |args| Ok(ToolOutput::text(serde_json::Value::Object(args).to_string())),
                )
                .with_sync_tool(
                    ToolDescriptor::new("flaky", "Always reports an error", json!({})),
                    |_| Ok(ToolOutput::error("upstream 500")),
                ),
        );

        let mut registry = SessionRegistry::new();
        for name in ["echo", "flaky"] {
            registry
                .register_tool(
                    ToolDescriptor::new(name, "", json!({})),
                    Arc::clone(&backend),
                )
                .expect("tool should register");
        }

        RegistryToolRuntime::new(Arc::new(registry)).with_hooks(hooks)
    }

    #[tokio::test]
    async fn runtime_executes_registered_tool() {
        let hooks = Arc::new(RecordingHooks::default());
        let result = runtime(Arc::clone(&hooks))
            .execute(
                ToolCall::new("call_1", "echo", r#"{"topic":"ai"}"#),
                ToolExecutionContext::new("session-1"),
            )
            .await
            .expect("execution should succeed");

        assert_eq!(result.tool_call_id, "call_1");
        assert_eq!(result.output, r#"{"topic":"ai"}"#);
        assert_eq!(
            *hooks.events.lock().expect("events lock"),
            vec!["start:research:echo", "finish:research:echo:ok"]
        );
    }

    #[tokio::test]
    async fn runtime_returns_not_found_for_unknown_tool() {
        let hooks = Arc::new(RecordingHooks::default());
        let error = runtime(Arc::clone(&hooks))
            .execute(
                ToolCall::new("call_2", "missing", "{}"),
                ToolExecutionContext::new("session-2"),
            )
            .await
            .expect_err("execution should fail");

        assert_eq!(error.kind, ToolErrorKind::NotFound);
        assert_eq!(error.tool_call_id.as_deref(), Some("call_2"));
        assert!(error.message.contains("tool not found"));
        assert_eq!(
            *hooks.events.lock().expect("events lock"),
            vec!["unresolved:missing"]
        );
    }

    #[tokio::test]
    async fn runtime_maps_error_outputs_and_bad_arguments() {
        let hooks = Arc::new(RecordingHooks::default());
        let runtime = runtime(Arc::clone(&hooks));

        let flagged = runtime
            .execute(
                ToolCall::new("call_3", "flaky", "{}"),
                ToolExecutionContext::new("session-3"),
            )
            .await
            .expect_err("is_error output should fail");
        assert_eq!(flagged.kind, ToolErrorKind::Execution);
        assert_eq!(flagged.message, "upstream 500");

        let malformed = runtime
            .execute(
                ToolCall::new("call_4", "echo", "not json"),
                ToolExecutionContext::new("session-3"),
            )
            .await
            .expect_err("bad arguments should fail");
        assert_eq!(malformed.kind, ToolErrorKind::InvalidArguments);

        // A flagged answer still reached the backend; bad arguments never did.
        assert_eq!(
            *hooks.events.lock().expect("events lock"),
            vec![
                "start:research:flaky",
                "finish:research:flaky:flagged",
                "rejected:research:echo:InvalidArguments",
            ]
        );
    }

    #[test]
    fn definitions_follow_registry_order() {
        let runtime = runtime(Arc::new(RecordingHooks::default()));
        let names = runtime
            .definitions()
            .into_iter()
            .map(|definition| definition.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["echo", "flaky"]);
    }
}
