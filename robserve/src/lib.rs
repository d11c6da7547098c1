//! Observability hooks for provider calls, tool execution, and the chat loop.
//!
//! ```rust
//! use robserve::{MetricsObservabilityHooks, SafeProviderHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _metrics = MetricsObservabilityHooks;
//! ```

mod layered;
mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use layered::{LayeredHooks, standard_hooks};
pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeChatHooks, SafeProviderHooks, SafeToolHooks};
pub use tracing_hooks::{TracingObservabilityHooks, log_discovery_report};

pub mod prelude {
    pub use crate::{
        LayeredHooks, MetricsObservabilityHooks, SafeChatHooks, SafeProviderHooks, SafeToolHooks,
        TracingObservabilityHooks, log_discovery_report, standard_hooks,
    };
}
