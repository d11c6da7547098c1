//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use rprovider::{ProviderError, ProviderErrorKind};
use rtooling::{ToolError, ToolErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Provider,
    Store,
    Tooling,
    NotFound,
}

/// Where in a turn the failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorPhase {
    Preparing,
    Model,
    Tooling,
    Storage,
    Invocation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    pub phase: Option<ChatErrorPhase>,
    pub retryable: bool,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            phase: None,
            retryable: false,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message).with_phase(ChatErrorPhase::Preparing)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message).with_phase(ChatErrorPhase::Model)
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message).with_phase(ChatErrorPhase::Storage)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message).with_phase(ChatErrorPhase::Tooling)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::NotFound, message).with_phase(ChatErrorPhase::Invocation)
    }

    pub fn with_phase(mut self, phase: ChatErrorPhase) -> Self {
        self.phase = Some(phase);
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn is_user_error(&self) -> bool {
        matches!(
            self.kind,
            ChatErrorKind::InvalidRequest | ChatErrorKind::NotFound
        )
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let error = match value.kind {
            ProviderErrorKind::InvalidRequest => {
                ChatError::new(ChatErrorKind::InvalidRequest, value.message)
                    .with_phase(ChatErrorPhase::Model)
            }
            _ => ChatError::provider(value.to_string()),
        };
        error.with_retryable(value.retryable)
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        let retryable = value.retryable;
        let error = match value.kind {
            ToolErrorKind::NotFound => ChatError::not_found(value.message),
            ToolErrorKind::InvalidArguments => ChatError::new(
                ChatErrorKind::InvalidRequest,
                value.message,
            )
            .with_phase(ChatErrorPhase::Invocation),
            _ => ChatError::tooling(value.to_string()).with_phase(ChatErrorPhase::Invocation),
        };
        error.with_retryable(retryable)
    }
}
