//! Conversational orchestration: the tool-calling loop, direct resource and
//! prompt invocation, and the interactive command surface.

mod command;
mod error;
mod hooks;
mod invoke;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatErrorPhase, ChatLoopHooks, ChatPolicy, ChatService,
        ChatServiceBuilder, ChatSession, ChatTurnRequest, ChatTurnResult, Command,
        ConversationStore, InMemoryConversationStore, LoopState, PromptRun, parse_command,
    };
    pub use rcommon::{SessionId, TraceId};
    pub use rtooling::{
        Backend, RegistryToolRuntime, SessionRegistry, ToolError, ToolErrorKind,
        ToolExecutionContext, ToolExecutionResult, ToolRuntime,
    };
}

pub use command::{Command, HELP_TEXT, parse_command};
pub use error::{ChatError, ChatErrorKind, ChatErrorPhase};
pub use hooks::{ChatLoopHooks, NoopChatLoopHooks};
pub use service::{ChatPolicy, ChatService, ChatServiceBuilder, DEFAULT_MAX_TURNS};
pub use store::{ChatFuture, ConversationStore, InMemoryConversationStore};
pub use types::{ChatSession, ChatTurnRequest, ChatTurnResult, LoopState, PromptRun};
pub use rcommon::{SessionId, TraceId};
