//! Translation between the session message log (`agentcore_types::Message`)
//! and the model-call layer's wire format (`agentcore_provider::*`).

use agentcore_provider::{ContentPart, ProviderMessage, Role as WireRole};
use agentcore_types::{Message, Role, ToolCall, ToolCallId};
use std::collections::HashMap;

/// Convert one session message into its wire representation.
///
/// `Role::Tool` messages become a `User`-role turn carrying one
/// `ToolResult` part — most provider wire formats have no dedicated tool
/// role, answering a tool call from inside the next user turn instead.
/// Adjacent tool messages are coalesced by [`messages_to_provider`],
/// matching the convention that all results from one iteration's
/// dispatch land in a single user turn.
fn message_to_provider(message: &Message) -> ProviderMessage {
    match message.role {
        Role::System => ProviderMessage {
            role: WireRole::System,
            content: vec![ContentPart::Text {
                text: message.content.clone(),
            }],
        },
        Role::User => ProviderMessage {
            role: WireRole::User,
            content: vec![ContentPart::Text {
                text: message.content.clone(),
            }],
        },
        Role::Assistant => {
            let mut content = Vec::new();
            if !message.content.is_empty() {
                content.push(ContentPart::Text {
                    text: message.content.clone(),
                });
            }
            for call in &message.tool_calls {
                content.push(ContentPart::ToolUse {
                    id: call.id.0.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                });
            }
            ProviderMessage {
                role: WireRole::Assistant,
                content,
            }
        }
        Role::Tool => {
            let is_error = message.content.starts_with("[error]");
            ProviderMessage {
                role: WireRole::User,
                content: vec![ContentPart::ToolResult {
                    tool_use_id: message
                        .tool_call_id
                        .as_ref()
                        .map(|id| id.0.clone())
                        .unwrap_or_default(),
                    content: message.content.clone(),
                    is_error,
                }],
            }
        }
        _ => unreachable!("agentcore_types::Role is exhaustively matched above"),
    }
}

/// Convert a whole prompt-view message list, coalescing consecutive
/// `Tool` messages into one `User` turn per the wire format's convention.
pub fn messages_to_provider(messages: &[Message]) -> Vec<ProviderMessage> {
    let mut out: Vec<ProviderMessage> = Vec::with_capacity(messages.len());
    for message in messages {
        let converted = message_to_provider(message);
        if message.role == Role::Tool {
            if let Some(last) = out.last_mut() {
                let last_is_tool_turn = last.role == WireRole::User
                    && last
                        .content
                        .iter()
                        .all(|part| matches!(part, ContentPart::ToolResult { .. }));
                if last_is_tool_turn {
                    last.content.extend(converted.content);
                    continue;
                }
            }
        }
        out.push(converted);
    }
    out
}

/// Concatenate every `Text` part of a response into one string.
pub fn extract_text(content: &[ContentPart]) -> String {
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Pull every tool-use request out of a response, renaming duplicate ids
/// within the same turn with a deterministic `-k` suffix so the executor
/// never sees two calls sharing an id.
pub fn extract_tool_calls(content: &[ContentPart]) -> Vec<ToolCall> {
    let mut seen: HashMap<String, u32> = HashMap::new();
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::ToolUse { id, name, input } => {
                let occurrence = seen.entry(id.clone()).or_insert(0);
                let call_id = if *occurrence == 0 {
                    id.clone()
                } else {
                    format!("{id}-{occurrence}")
                };
                *occurrence += 1;
                Some(ToolCall {
                    id: ToolCallId::new(call_id),
                    name: name.clone(),
                    arguments: input.clone(),
                })
            }
            _ => None,
        })
        .collect()
}

/// Scan assistant text for `{"tool_call": {"name": "...", "arguments": {...}}}`
/// blocks — the fallback form a model without native function-calling (or
/// one that ignores it) may emit inline with its prose instead. Called only
/// when [`extract_tool_calls`] found nothing in the structured content, per
/// the engine's "structured form first, embedded form only if absent" rule.
///
/// Candidate JSON objects are located by brace balancing so the rest of the
/// text doesn't need to be well-formed around them; each candidate that
/// parses and carries a `tool_call.name` field becomes one `ToolCall`, in
/// the order it appears. IDs are synthesized since the embedded form has
/// none of its own.
pub fn extract_embedded_tool_calls(text: &str) -> Vec<ToolCall> {
    let bytes = text.as_bytes();
    let mut calls = Vec::new();
    let mut cursor = 0;

    for (start, _) in text.match_indices('{') {
        if start < cursor {
            continue;
        }
        let Some(end) = balanced_object_end(bytes, start) else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text[start..=end]) {
            if let Some(tool_call) = value.get("tool_call") {
                let name = tool_call
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or_default()
                    .to_string();
                let arguments = tool_call
                    .get("arguments")
                    .cloned()
                    .unwrap_or_else(|| serde_json::json!({}));
                calls.push(ToolCall {
                    id: ToolCallId::new(format!("embedded-{}", calls.len())),
                    name,
                    arguments,
                });
                cursor = end + 1;
            }
        }
    }
    calls
}

/// Index of the `}` that closes the object opened at `bytes[start]`,
/// skipping braces inside quoted strings. `None` if the object never closes.
fn balanced_object_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            match byte {
                b'\\' if !escaped => escaped = true,
                b'"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + offset);
                }
            }
            _ => {}
        }
    }
    None
}
