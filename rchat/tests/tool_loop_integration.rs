use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rchat::prelude::*;
use rprovider::{
    Message, ModelProvider, ModelRequest, ModelResponse, OutputItem, ProviderError,
    ProviderFuture, ProviderId, Role, StopReason, TokenUsage, ToolCall,
};
use rtooling::{
    LocalBackend, PromptArgument, PromptDescriptor, RenderedPrompt, ResourceContents,
    ResourceDescriptor, ResourceUri, ToolDescriptor, ToolOutput, discover, parse_prompt_args,
};
use serde_json::json;

/// Replays scripted responses and records every request it sees.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ModelResponse, ProviderError>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<ModelResponse, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ModelProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> ProviderFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::other("script exhausted")))
        })
    }
}

fn usage(total: u32) -> TokenUsage {
    TokenUsage {
        input_tokens: total - 1,
        output_tokens: 1,
        total_tokens: total,
    }
}

fn text_response(text: &str) -> Result<ModelResponse, ProviderError> {
    Ok(ModelResponse {
        provider: ProviderId::OpenAi,
        model: "o4-mini".to_string(),
        output: vec![OutputItem::Message(Message::assistant(text))],
        stop_reason: StopReason::EndTurn,
        usage: usage(10),
    })
}

fn tool_response(calls: &[(&str, &str, &str)]) -> Result<ModelResponse, ProviderError> {
    Ok(ModelResponse {
        provider: ProviderId::OpenAi,
        model: "o4-mini".to_string(),
        output: calls
            .iter()
            .map(|(id, name, args)| OutputItem::ToolCall(ToolCall::new(*id, *name, *args)))
            .collect(),
        stop_reason: StopReason::ToolUse,
        usage: usage(5),
    })
}

fn research_backend() -> Arc<dyn Backend> {
    Arc::new(
        LocalBackend::new("research")
            .with_sync_tool(
                ToolDescriptor::new(
                    "search_papers",
                    "Search arXiv for papers on a topic",
                    json!({"type": "object", "properties": {"topic": {"type": "string"}}}),
                ),
                |args| {
                    let topic = args.get("topic").and_then(|v| v.as_str()).unwrap_or("?");
                    Ok(ToolOutput::text(format!("[\"{topic}-1\", \"{topic}-2\"]")))
                },
            )
            .with_sync_tool(
                ToolDescriptor::new(
                    "extract_info",
                    "Look up a stored paper",
                    json!({"type": "object", "properties": {"paper_id": {"type": "string"}}}),
                ),
                |args| {
                    let id = args.get("paper_id").and_then(|v| v.as_str()).unwrap_or("?");
                    Ok(ToolOutput::text(format!("info for {id}")))
                },
            )
            .with_prompt(
                PromptDescriptor::new("generate_search_prompt", "Search and discuss papers")
                    .with_argument(PromptArgument::new("topic").required())
                    .with_argument(PromptArgument::new("num_papers")),
                |args| {
                    Ok(RenderedPrompt::from_text(format!(
                        "Search for {} academic papers about '{}'",
                        args.get("num_papers").map(String::as_str).unwrap_or("5"),
                        args.get("topic").map(String::as_str).unwrap_or_default()
                    )))
                },
            )
            .with_resource(
                ResourceDescriptor::new(ResourceUri::parse("papers://folders"), "folders"),
                |_| Ok(ResourceContents::text("papers://folders", "# Topics\n- ai")),
            )
            .with_resource(
                ResourceDescriptor::new(ResourceUri::parse("papers://{topic}"), "topic"),
                |uri| Ok(ResourceContents::text(uri, format!("# Papers for {uri}"))),
            ),
    )
}

async fn registry() -> Arc<SessionRegistry> {
    let mut registry = SessionRegistry::new();
    let report = discover(&mut registry, research_backend()).await;
    assert!(report.is_clean());
    Arc::new(registry)
}

fn session() -> ChatSession {
    ChatSession::new("int-session", "o4-mini")
}

#[tokio::test]
async fn search_then_extract_twice_then_answer() {
    let provider = ScriptedProvider::new(vec![
        tool_response(&[("c1", "search_papers", r#"{"topic":"llm"}"#)]),
        tool_response(&[
            ("c2", "extract_info", r#"{"paper_id":"llm-1"}"#),
            ("c3", "extract_info", r#"{"paper_id":"llm-2"}"#),
        ]),
        text_response("Two papers on llm."),
    ]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .build();

    let result = service
        .run_turn(ChatTurnRequest::new(session(), "summarize llm papers"))
        .await
        .expect("turn should succeed");

    assert_eq!(result.final_answer, "Two papers on llm.");
    assert_eq!(result.model_turns, 3);
    assert_eq!(result.tool_calls_executed, 3);
    assert!(!result.max_turns_exceeded);
    assert_eq!(result.usage.total_tokens, 20);

    let roles = result
        .transcript
        .iter()
        .map(|message| message.role)
        .collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![
            Role::User,
            Role::Assistant,
            Role::Tool,
            Role::Assistant,
            Role::Tool,
            Role::Tool,
            Role::Assistant,
        ]
    );

    // Tool results follow request order and carry their call ids.
    assert_eq!(result.transcript[4].tool_call_id.as_deref(), Some("c2"));
    assert_eq!(result.transcript[4].content, "info for llm-1");
    assert_eq!(result.transcript[5].tool_call_id.as_deref(), Some("c3"));
    assert_eq!(result.transcript[5].content, "info for llm-2");

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].tools.len(), 2);
    assert_eq!(requests[2].messages.len(), 6);
}

#[tokio::test]
async fn text_only_response_finishes_on_first_turn() {
    let provider = ScriptedProvider::new(vec![text_response("hello there")]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .build();

    let result = service
        .run_turn(ChatTurnRequest::new(session(), "hi"))
        .await
        .expect("turn should succeed");

    assert_eq!(result.final_answer, "hello there");
    assert_eq!(result.model_turns, 1);
    assert_eq!(result.tool_calls_executed, 0);
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn unknown_tool_becomes_error_content_and_loop_continues() {
    let provider = ScriptedProvider::new(vec![
        tool_response(&[("c1", "delete_everything", "{}")]),
        text_response("I cannot do that."),
    ]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .build();

    let result = service
        .run_turn(ChatTurnRequest::new(session(), "wipe it"))
        .await
        .expect("turn should succeed");

    assert_eq!(result.final_answer, "I cannot do that.");
    let tool_message = &result.transcript[2];
    assert_eq!(tool_message.role, Role::Tool);
    assert!(tool_message.content.contains("tool not found"));

    let second = &provider.requests()[1];
    assert!(second.messages.iter().any(|m| m.content.contains("tool not found")));
}

#[tokio::test]
async fn malformed_arguments_are_reported_to_the_model() {
    let provider = ScriptedProvider::new(vec![
        tool_response(&[("c1", "search_papers", "{not json")]),
        text_response("retrying failed"),
    ]);
    let service = ChatService::builder(provider)
        .registry(registry().await)
        .build();

    let result = service
        .run_turn(ChatTurnRequest::new(session(), "search"))
        .await
        .expect("turn should succeed");

    assert!(result.transcript[2].content.starts_with("Error: invalid JSON arguments"));
}

#[tokio::test]
async fn max_turn_ceiling_synthesizes_final_answer() {
    let provider = ScriptedProvider::new(vec![
        tool_response(&[("c1", "search_papers", r#"{"topic":"a"}"#)]),
        tool_response(&[("c2", "search_papers", r#"{"topic":"b"}"#)]),
        tool_response(&[("c3", "search_papers", r#"{"topic":"c"}"#)]),
    ]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .max_turns(2)
        .build();

    let result = service
        .run_turn(ChatTurnRequest::new(session(), "loop forever"))
        .await
        .expect("turn should end cleanly");

    assert!(result.max_turns_exceeded);
    assert_eq!(result.model_turns, 2);
    assert!(result.final_answer.contains("max turns exceeded"));
    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn history_is_kept_across_turns_but_not_after_failures() {
    let provider = ScriptedProvider::new(vec![
        text_response("first answer"),
        Err(ProviderError::authentication("bad key")),
        text_response("third answer"),
    ]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .build();
    let session = session().with_system_prompt("be brief");

    service
        .run_turn(ChatTurnRequest::new(session.clone(), "one"))
        .await
        .expect("first turn should succeed");

    let error = service
        .run_turn(ChatTurnRequest::new(session.clone(), "two"))
        .await
        .expect_err("second turn should fail");
    assert_eq!(error.kind, ChatErrorKind::Provider);

    service
        .run_turn(ChatTurnRequest::new(session.clone(), "three"))
        .await
        .expect("third turn should succeed");

    let history = service.history(&session.id).await.expect("history");
    let contents = history
        .iter()
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["one", "first answer", "three", "third answer"]);

    let third = &provider.requests()[2];
    assert_eq!(third.messages[0].role, Role::System);
    assert_eq!(third.messages.len(), 4);
}

#[tokio::test]
async fn abandoned_turns_leave_history_untouched() {
    let stalled: Arc<dyn Backend> = Arc::new(LocalBackend::new("slow").with_tool(
        ToolDescriptor::new("wait_forever", "Never answers", json!({"type": "object"})),
        |_| std::future::pending(),
    ));
    let mut registry = SessionRegistry::new();
    assert!(discover(&mut registry, stalled).await.is_clean());

    let provider = ScriptedProvider::new(vec![
        text_response("first answer"),
        tool_response(&[("call_1", "wait_forever", "{}")]),
    ]);
    let service = ChatService::builder(provider.clone())
        .registry(Arc::new(registry))
        .build();
    let session = session();

    service
        .run_turn(ChatTurnRequest::new(session.clone(), "one"))
        .await
        .expect("first turn should succeed");

    let abandoned = tokio::time::timeout(
        std::time::Duration::from_millis(50),
        service.run_turn(ChatTurnRequest::new(session.clone(), "two")),
    )
    .await;
    assert!(abandoned.is_err(), "the stalled tool should keep the turn pending");
    assert_eq!(provider.requests().len(), 2);

    let history = service.history(&session.id).await.expect("history");
    let contents = history
        .iter()
        .map(|message| message.content.as_str())
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["one", "first answer"]);
}

#[tokio::test]
async fn prompt_command_renders_and_runs_a_turn() {
    let provider = ScriptedProvider::new(vec![text_response("Here are 3 papers.")]);
    let service = ChatService::builder(provider.clone())
        .registry(registry().await)
        .build();

    let Command::Prompt { name, arguments } = parse_command(
        r#"/prompt generate_search_prompt topic="graph neural networks" num_papers=3"#,
        "papers",
    ) else {
        panic!("expected a prompt command");
    };

    let run = service
        .execute_prompt(session(), &name, arguments)
        .await
        .expect("prompt should run");

    assert_eq!(
        run.rendered,
        "Search for 3 academic papers about 'graph neural networks'"
    );
    assert_eq!(run.turn.final_answer, "Here are 3 papers.");
    assert_eq!(
        provider.requests()[0].messages.last().map(|m| m.content.as_str()),
        Some(run.rendered.as_str())
    );
}

#[tokio::test]
async fn unknown_prompt_is_not_found() {
    let service = ChatService::builder(ScriptedProvider::new(Vec::new()))
        .registry(registry().await)
        .build();

    let error = service
        .execute_prompt(session(), "missing", parse_prompt_args(""))
        .await
        .expect_err("unknown prompt should fail");
    assert_eq!(error.kind, ChatErrorKind::NotFound);
}

#[tokio::test]
async fn resources_resolve_exactly_or_through_templates() {
    let service = ChatService::builder(ScriptedProvider::new(Vec::new()))
        .registry(registry().await)
        .build();

    let folders = service
        .get_resource("papers://folders")
        .await
        .expect("folders should read");
    assert_eq!(folders, "# Topics\n- ai");

    let topic = service
        .get_resource("papers://machine_learning")
        .await
        .expect("template should resolve");
    assert_eq!(topic, "# Papers for papers://machine_learning");

    let error = service
        .get_resource("notes://machine_learning")
        .await
        .expect_err("unrelated scheme should fail");
    assert_eq!(error.kind, ChatErrorKind::NotFound);
}

#[tokio::test]
async fn listings_reflect_discovered_capabilities() {
    let service = ChatService::builder(ScriptedProvider::new(Vec::new()))
        .registry(registry().await)
        .build();

    assert_eq!(service.list_tools().len(), 2);
    let prompts = service.list_prompts();
    assert_eq!(
        prompts[0].usage(),
        "/prompt generate_search_prompt topic=<topic> num_papers=<num_papers>"
    );
    let resources = service
        .list_resources()
        .into_iter()
        .map(|resource| resource.uri.to_string())
        .collect::<Vec<_>>();
    assert_eq!(resources, vec!["papers://folders", "papers://{topic}"]);
}
