//! Backend-level events from the registry tool runtime.
//!
//! Chat-loop hooks see a tool call succeed or fail. These hooks see what
//! happened underneath: which backend the registry routed to, whether the
//! name resolved at all, and whether the backend answered (possibly with an
//! error flag) or the call itself broke.
//!
//! ```rust
//! use rtooling::{NoopToolRuntimeHooks, ToolRuntimeHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ToolRuntimeHooks) {}
//!
//! let hooks = NoopToolRuntimeHooks;
//! assert_hooks_trait(&hooks);
//! ```

use std::time::Duration;

use rprovider::ToolCall;

use crate::{ToolError, ToolExecutionContext, ToolOutput};

pub trait ToolRuntimeHooks: Send + Sync {
    /// No backend registered the requested name.
    fn on_unresolved_tool(&self, _tool_call: &ToolCall, _context: &ToolExecutionContext) {}

    /// Arguments were rejected before `backend` was contacted.
    fn on_rejected_arguments(
        &self,
        _backend: &str,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _error: &ToolError,
    ) {
    }

    fn on_backend_call_start(
        &self,
        _backend: &str,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
    ) {
    }

    /// `Ok` when the backend answered, even if it flagged the output as an
    /// error; `Err` when the call did not complete.
    fn on_backend_call_finish(
        &self,
        _backend: &str,
        _tool_call: &ToolCall,
        _context: &ToolExecutionContext,
        _outcome: Result<&ToolOutput, &ToolError>,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolRuntimeHooks;

impl ToolRuntimeHooks for NoopToolRuntimeHooks {}
