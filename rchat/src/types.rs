//! Chat session, turn, and loop state types.

use rcommon::SessionId;
use rprovider::{Message, TokenUsage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: SessionId,
    pub model: String,
    pub system_prompt: Option<String>,
}

impl ChatSession {
    pub fn new(id: impl Into<SessionId>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurnRequest {
    pub session: ChatSession,
    pub user_input: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatTurnRequest {
    pub fn new(session: ChatSession, user_input: impl Into<String>) -> Self {
        Self {
            session,
            user_input: user_input.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Phases of the tool-calling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurnResult {
    pub session_id: SessionId,
    pub final_answer: String,
    /// Messages this turn added: the user message, assistant turns, and tool results.
    pub transcript: Vec<Message>,
    pub model_turns: u32,
    pub tool_calls_executed: u32,
    pub max_turns_exceeded: bool,
    pub usage: TokenUsage,
}

/// Outcome of `/prompt`: the rendered text and the turn it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRun {
    pub rendered: String,
    pub turn: ChatTurnResult,
}
