//! Focused unit tests for OpenAI adapter internals.

#![cfg(test)]

use std::sync::Arc;

use serde_json::json;

use crate::{Message, ModelRequest, ProviderError, ProviderFuture, SecretString, ToolCall, ToolDefinition};

use super::provider::OpenAiProvider;
use super::serde_api::{OpenAiApiResponse, build_api_request, parse_finish_reason};
use super::transport::OpenAiTransport;
use super::types::{OpenAiFinishReason, OpenAiRequest, OpenAiResponse, OpenAiRole};

#[derive(Debug)]
struct NoopTransport;

impl OpenAiTransport for NoopTransport {
    fn complete<'a>(
        &'a self,
        _request: OpenAiRequest,
        _api_key: &'a SecretString,
    ) -> ProviderFuture<'a, Result<OpenAiResponse, ProviderError>> {
        Box::pin(async { Err(ProviderError::other("not used")) })
    }
}

fn provider() -> OpenAiProvider {
    OpenAiProvider::new(SecretString::new("sk-test"), Arc::new(NoopTransport))
}

fn tool_round_trip_request() -> ModelRequest {
    ModelRequest::new(
        "o4-mini",
        vec![
            Message::user("find papers"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolCall::new(
                    "call_1",
                    "search_papers",
                    r#"{"topic":"llm agents","max_results":2}"#,
                )],
            ),
            Message::tool("call_1", "1234.5678\n2234.5678"),
        ],
    )
    .with_max_tokens(2024)
    .with_tools(vec![ToolDefinition {
        name: "search_papers".to_string(),
        description: "Search arXiv".to_string(),
        input_schema: r#"{"type":"object","properties":{"topic":{"type":"string"}}}"#.to_string(),
    }])
}

#[test]
fn build_openai_request_keeps_tool_call_linkage() {
    let built = provider().build_openai_request(tool_round_trip_request());

    assert_eq!(built.messages.len(), 3);
    assert_eq!(built.messages[1].role, OpenAiRole::Assistant);
    assert_eq!(built.messages[1].tool_calls[0].id, "call_1");
    assert_eq!(built.messages[2].role, OpenAiRole::Tool);
    assert_eq!(built.messages[2].tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(built.max_completion_tokens, Some(2024));
}

#[test]
fn build_openai_request_uses_fallback_model_for_blank_names() {
    let request = ModelRequest::new("  ", vec![Message::user("hi")]);
    let built = provider()
        .with_fallback_model("gpt-4o-mini")
        .build_openai_request(request);
    assert_eq!(built.model, "gpt-4o-mini");
}

#[test]
fn api_payload_serializes_function_tools_and_null_assistant_content() {
    let built = provider().build_openai_request(tool_round_trip_request());
    let payload = serde_json::to_value(build_api_request(built).expect("payload should build"))
        .expect("payload should serialize");

    assert_eq!(payload["max_completion_tokens"], json!(2024));
    assert_eq!(payload["tools"][0]["type"], json!("function"));
    assert_eq!(payload["tools"][0]["function"]["name"], json!("search_papers"));
    assert_eq!(
        payload["tools"][0]["function"]["parameters"]["type"],
        json!("object")
    );

    let assistant = &payload["messages"][1];
    assert_eq!(assistant["content"], serde_json::Value::Null);
    assert_eq!(assistant["tool_calls"][0]["type"], json!("function"));
    assert_eq!(
        assistant["tool_calls"][0]["function"]["arguments"],
        json!(r#"{"topic":"llm agents","max_results":2}"#)
    );

    let tool = &payload["messages"][2];
    assert_eq!(tool["role"], json!("tool"));
    assert_eq!(tool["tool_call_id"], json!("call_1"));
    assert!(payload.get("temperature").is_none());
}

#[test]
fn api_payload_rejects_invalid_tool_schema() {
    let request = ModelRequest::new("o4-mini", vec![Message::user("hi")]).with_tools(vec![
        ToolDefinition {
            name: "broken".to_string(),
            description: String::new(),
            input_schema: "{not json".to_string(),
        },
    ]);

    let error = build_api_request(provider().build_openai_request(request))
        .expect_err("schema should fail");
    assert!(error.message.contains("broken"));
}

#[test]
fn api_response_parses_tool_calls_without_content() {
    let body = json!({
        "model": "o4-mini",
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [{
                    "id": "call_7",
                    "type": "function",
                    "function": {"name": "extract_info", "arguments": "{\"paper_id\":\"1234.5678\"}"}
                }]
            },
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
    });

    let parsed: OpenAiApiResponse = serde_json::from_value(body).expect("body should parse");
    let response = OpenAiResponse::try_from(parsed).expect("response should convert");

    assert_eq!(response.finish_reason, OpenAiFinishReason::ToolCalls);
    assert!(response.message.content.is_empty());
    assert_eq!(response.message.tool_calls[0].name, "extract_info");
    assert_eq!(response.usage.total_tokens, 16);

    let model_response = response.into_model_response();
    assert_eq!(model_response.output.len(), 1);
    assert_eq!(model_response.tool_calls()[0].id, "call_7");
}

#[test]
fn parse_finish_reason_maps_expected_values() {
    assert_eq!(parse_finish_reason(Some("stop")), OpenAiFinishReason::Stop);
    assert_eq!(parse_finish_reason(Some("length")), OpenAiFinishReason::Length);
    assert_eq!(
        parse_finish_reason(Some("tool_calls")),
        OpenAiFinishReason::ToolCalls
    );
    assert_eq!(
        parse_finish_reason(Some("content_filter")),
        OpenAiFinishReason::ContentFilter
    );
    assert_eq!(parse_finish_reason(None), OpenAiFinishReason::Other);
}
