//! One neutral message, three wire shapes: how each dialect places tool
//! results.

use serde_json::json;
use tsunagi_llm::core::ProtocolAdapter;
use tsunagi_llm::provider::anthropic::AnthropicAdapter;
use tsunagi_llm::provider::gemini::GeminiAdapter;
use tsunagi_llm::provider::openai::OpenAiAdapter;
use tsunagi_llm::{ContentBlock, Message, Role, ToolResultBlock};

fn two_tool_results() -> Message {
    Message::with_blocks(
        Role::User,
        vec![
            ContentBlock::ToolResult(ToolResultBlock {
                tool_use_id: "t1".to_string(),
                content: "ok".to_string(),
                is_error: false,
            }),
            ContentBlock::ToolResult(ToolResultBlock {
                tool_use_id: "t2".to_string(),
                content: "done".to_string(),
                is_error: false,
            }),
        ],
    )
}

#[test]
fn openai_expands_each_result_into_its_own_tool_message() {
    let wire = OpenAiAdapter.convert_to_api(&[two_tool_results()]);
    assert_eq!(wire.len(), 2);
    for message in &wire {
        assert_eq!(message["role"], json!("tool"));
    }
    assert_eq!(wire[0]["tool_call_id"], json!("t1"));
    assert_eq!(wire[0]["content"], json!("ok"));
    assert_eq!(wire[1]["tool_call_id"], json!("t2"));
    assert_eq!(wire[1]["content"], json!("done"));
}

#[test]
fn anthropic_keeps_both_results_in_one_content_array() {
    let wire = AnthropicAdapter.convert_to_api(&[two_tool_results()]);
    assert_eq!(wire.len(), 1);
    let content = wire[0]["content"].as_array().expect("array");
    assert_eq!(content.len(), 2);
    assert_eq!(content[0]["type"], json!("tool_result"));
    assert_eq!(content[0]["tool_use_id"], json!("t1"));
    assert_eq!(content[1]["tool_use_id"], json!("t2"));
}

#[test]
fn gemini_emits_one_message_with_two_function_response_parts() {
    let adapter = GeminiAdapter::new();
    let wire = adapter.convert_to_api(&[two_tool_results()]);
    assert_eq!(wire.len(), 1);
    let parts = wire[0]["parts"].as_array().expect("parts");
    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0]["functionResponse"]["name"], json!("t1"));
    assert_eq!(
        parts[0]["functionResponse"]["response"]["content"],
        json!("ok")
    );
    assert_eq!(parts[1]["functionResponse"]["name"], json!("t2"));
}

#[test]
fn ordering_is_preserved_across_all_three_dialects() {
    let ids = ["a", "b", "c", "d"];
    let blocks: Vec<ContentBlock> = ids
        .iter()
        .map(|id| {
            ContentBlock::ToolResult(ToolResultBlock {
                tool_use_id: id.to_string(),
                content: id.to_string(),
                is_error: false,
            })
        })
        .collect();
    let message = Message::with_blocks(Role::User, blocks);

    let openai = OpenAiAdapter.convert_to_api(&[message.clone()]);
    let openai_ids: Vec<&str> = openai
        .iter()
        .map(|m| m["tool_call_id"].as_str().expect("id"))
        .collect();
    assert_eq!(openai_ids, ids);

    let anthropic = AnthropicAdapter.convert_to_api(&[message.clone()]);
    let anthropic_ids: Vec<&str> = anthropic[0]["content"]
        .as_array()
        .expect("array")
        .iter()
        .map(|b| b["tool_use_id"].as_str().expect("id"))
        .collect();
    assert_eq!(anthropic_ids, ids);

    let gemini = GeminiAdapter::new().convert_to_api(&[message]);
    let gemini_ids: Vec<&str> = gemini[0]["parts"]
        .as_array()
        .expect("parts")
        .iter()
        .map(|p| p["functionResponse"]["name"].as_str().expect("name"))
        .collect();
    assert_eq!(gemini_ids, ids);
}
