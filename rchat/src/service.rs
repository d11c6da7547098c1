//! Chat service running the tool-calling conversation loop.

use std::sync::Arc;
use std::time::Instant;

use rcommon::{GenerationOptions, SessionId};
use rprovider::{Message, ModelProvider, ModelRequest, OutputItem, Role, TokenUsage, ToolCall};
use rtooling::{
    NoopToolRuntimeHooks, RegistryToolRuntime, SessionRegistry, ToolExecutionContext, ToolRuntime,
    ToolRuntimeHooks,
};

use crate::{
    ChatError, ChatLoopHooks, ChatSession, ChatTurnRequest, ChatTurnResult, ConversationStore,
    InMemoryConversationStore, LoopState, NoopChatLoopHooks,
};

pub const DEFAULT_MAX_TURNS: u32 = 20;

/// Limits and generation defaults applied to every turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatPolicy {
    /// Ceiling on model invocations per user turn.
    pub max_turns: u32,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            max_tokens: None,
            temperature: None,
        }
    }
}

impl ChatPolicy {
    pub fn with_max_turns(mut self, max_turns: u32) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[derive(Clone)]
pub struct ChatService {
    provider: Arc<dyn ModelProvider>,
    store: Arc<dyn ConversationStore>,
    tools: Arc<dyn ToolRuntime>,
    registry: Arc<SessionRegistry>,
    policy: ChatPolicy,
    hooks: Arc<dyn ChatLoopHooks>,
}

pub struct ChatServiceBuilder {
    provider: Arc<dyn ModelProvider>,
    store: Option<Arc<dyn ConversationStore>>,
    tools: Option<Arc<dyn ToolRuntime>>,
    registry: Option<Arc<SessionRegistry>>,
    tool_hooks: Arc<dyn ToolRuntimeHooks>,
    policy: ChatPolicy,
    hooks: Arc<dyn ChatLoopHooks>,
}

impl ChatServiceBuilder {
    pub fn new(provider: Arc<dyn ModelProvider>) -> Self {
        Self {
            provider,
            store: None,
            tools: None,
            registry: None,
            tool_hooks: Arc::new(NoopToolRuntimeHooks),
            policy: ChatPolicy::default(),
            hooks: Arc::new(NoopChatLoopHooks),
        }
    }

    pub fn store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Capabilities for tool routing, `@resource` reads, and `/prompt` runs.
    pub fn registry(mut self, registry: Arc<SessionRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Overrides the registry-backed tool runtime.
    pub fn tool_runtime(mut self, tools: Arc<dyn ToolRuntime>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Hooks for the default registry-backed tool runtime.
    pub fn tool_hooks(mut self, tool_hooks: Arc<dyn ToolRuntimeHooks>) -> Self {
        self.tool_hooks = tool_hooks;
        self
    }

    pub fn policy(mut self, policy: ChatPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn max_turns(mut self, max_turns: u32) -> Self {
        self.policy.max_turns = max_turns;
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn ChatLoopHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> ChatService {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(SessionRegistry::new()));
        let tools = self.tools.unwrap_or_else(|| {
            Arc::new(RegistryToolRuntime::new(Arc::clone(&registry)).with_hooks(self.tool_hooks))
        });

        ChatService {
            provider: self.provider,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryConversationStore::new())),
            tools,
            registry,
            policy: self.policy,
            hooks: self.hooks,
        }
    }
}

impl ChatService {
    pub fn builder(provider: Arc<dyn ModelProvider>) -> ChatServiceBuilder {
        ChatServiceBuilder::new(provider)
    }

    pub fn policy(&self) -> &ChatPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn store(&self) -> Arc<dyn ConversationStore> {
        Arc::clone(&self.store)
    }

    /// Runs one user turn to completion.
    ///
    /// The model is re-invoked after every batch of tool results until it
    /// answers without tool calls or `max_turns` model calls have been made.
    /// History is only persisted when the turn completes, so a failed or
    /// dropped turn leaves the session untouched.
    pub async fn run_turn(&self, request: ChatTurnRequest) -> Result<ChatTurnResult, ChatError> {
        let session_id = request.session.id.clone();
        let started = Instant::now();

        match self.drive_loop(request).await {
            Ok(result) => {
                self.hooks.on_turn_complete(&result, started.elapsed());
                Ok(result)
            }
            Err(error) => {
                self.hooks
                    .on_turn_failure(&session_id, &error, started.elapsed());
                Err(error)
            }
        }
    }

    async fn drive_loop(&self, request: ChatTurnRequest) -> Result<ChatTurnResult, ChatError> {
        if request.user_input.trim().is_empty() {
            return Err(ChatError::invalid_request("user_input must not be empty"));
        }
        if self.policy.max_turns == 0 {
            return Err(ChatError::invalid_request("chat policy requires max_turns >= 1"));
        }

        let ChatTurnRequest {
            session,
            user_input,
            temperature,
            max_tokens,
        } = request;

        let prior = self.store.load_messages(&session.id).await?;
        let user_message = Message::user(user_input);

        let mut conversation = Vec::with_capacity(prior.len() + 2);
        if let Some(system_prompt) = &session.system_prompt {
            conversation.push(Message::system(system_prompt.clone()));
        }
        conversation.extend(prior);
        let history_len = conversation.len();
        conversation.push(user_message);

        let options = self.generation_options(temperature, max_tokens);
        let definitions = self.tools.definitions();
        let mut usage = TokenUsage::default();
        let mut model_turns = 0_u32;
        let mut tool_calls_executed = 0_u32;
        let mut state = LoopState::AwaitingModel;
        let mut final_answer = None::<String>;

        while state != LoopState::Done {
            self.hooks.on_state_change(&session.id, state);
            match state {
                LoopState::AwaitingModel => {
                    if model_turns >= self.policy.max_turns {
                        break;
                    }

                    let model_request = ModelRequest::builder(session.model.clone())
                        .messages(conversation.clone())
                        .options(options)
                        .tools(definitions.clone())
                        .build()?;
                    let response = self.provider.complete(model_request).await?;
                    model_turns += 1;
                    usage.accumulate(response.usage);

                    let (text, tool_calls) = collect_output(response.output);
                    self.hooks
                        .on_model_response(&session.id, model_turns, &text, &tool_calls);

                    if tool_calls.is_empty() {
                        conversation.push(Message::assistant(text.clone()));
                        final_answer = Some(text);
                        state = LoopState::Done;
                    } else {
                        conversation.push(Message::assistant_with_tool_calls(text, tool_calls));
                        state = LoopState::ExecutingTools;
                    }
                }
                LoopState::ExecutingTools => {
                    let pending = conversation
                        .last()
                        .map(|message| message.tool_calls.clone())
                        .unwrap_or_default();

                    for tool_call in pending {
                        let content = self
                            .execute_tool(&session, model_turns, tool_call.clone())
                            .await;
                        conversation.push(Message::tool(tool_call.id, content));
                        tool_calls_executed += 1;
                    }
                    state = LoopState::AwaitingModel;
                }
                LoopState::Done => {}
            }
        }

        let max_turns_exceeded = final_answer.is_none();
        let final_answer = match final_answer {
            Some(answer) => answer,
            None => {
                let answer = format!(
                    "max turns exceeded: stopped after {} model calls without a final answer",
                    self.policy.max_turns
                );
                tracing::warn!(
                    session_id = %session.id,
                    max_turns = self.policy.max_turns,
                    "tool loop hit the turn ceiling"
                );
                conversation.push(Message::assistant(answer.clone()));
                answer
            }
        };
        self.hooks.on_state_change(&session.id, LoopState::Done);

        let transcript = conversation.split_off(history_len);
        self.store
            .append_messages(&session.id, transcript.clone())
            .await?;

        Ok(ChatTurnResult {
            session_id: session.id,
            final_answer,
            transcript,
            model_turns,
            tool_calls_executed,
            max_turns_exceeded,
            usage,
        })
    }

    /// Runs one tool call; failures become the tool result text.
    async fn execute_tool(&self, session: &ChatSession, turn: u32, tool_call: ToolCall) -> String {
        self.hooks.on_tool_call_start(&session.id, &tool_call);
        let context = ToolExecutionContext::new(session.id.clone()).with_turn(turn);
        let started = Instant::now();

        match self.tools.execute(tool_call.clone(), context).await {
            Ok(result) => {
                self.hooks.on_tool_call_success(
                    &session.id,
                    &tool_call,
                    &result,
                    started.elapsed(),
                );
                result.output
            }
            Err(error) => {
                tracing::debug!(
                    session_id = %session.id,
                    tool = %tool_call.name,
                    error = %error,
                    "tool call failed; returning error text to the model"
                );
                self.hooks.on_tool_call_failure(
                    &session.id,
                    &tool_call,
                    &error,
                    started.elapsed(),
                );
                format!("Error: {}", error.message)
            }
        }
    }

    fn generation_options(
        &self,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> GenerationOptions {
        GenerationOptions {
            temperature: temperature.or(self.policy.temperature),
            max_tokens: max_tokens.or(self.policy.max_tokens),
        }
    }

    pub async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, ChatError> {
        self.store.load_messages(session_id).await
    }
}

fn collect_output(items: Vec<OutputItem>) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for item in items {
        match item {
            OutputItem::Message(message) => {
                if message.role == Role::Assistant {
                    text.push_str(&message.content);
                }
            }
            OutputItem::ToolCall(call) => tool_calls.push(call),
        }
    }

    (text, tool_calls)
}
