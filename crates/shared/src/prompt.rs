use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::ChatTurn;
use crate::retrieval::RankedDoc;

const CONTEXT_HEADER: &str = "Reference documents:";
const CONTEXT_INSTRUCTION: &str = "Use these documents when they are relevant to the \
question and cite the source document by its identifier.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: PromptRole,
    pub content: String,
}

/// Builds the message sequence sent upstream: one system message (extended
/// with retrieved context when present), the most recent history turns in
/// original order, then the current user message.
pub fn assemble(
    system_prompt: &str,
    docs: &[RankedDoc],
    history: &[ChatTurn],
    message: &str,
    max_history_turns: usize,
) -> Vec<PromptMessage> {
    let mut messages = Vec::with_capacity(history.len().min(max_history_turns) + 2);

    messages.push(PromptMessage {
        role: PromptRole::System,
        content: system_message(system_prompt, docs),
    });

    let dropped = history.len().saturating_sub(max_history_turns);
    for turn in &history[dropped..] {
        messages.push(PromptMessage {
            role: coerce_role(&turn.role),
            content: stringify_content(&turn.content),
        });
    }

    messages.push(PromptMessage {
        role: PromptRole::User,
        content: message.to_string(),
    });

    messages
}

fn system_message(system_prompt: &str, docs: &[RankedDoc]) -> String {
    if docs.is_empty() {
        return system_prompt.to_string();
    }

    let mut content = String::from(system_prompt);
    content.push_str("\n\n");
    content.push_str(CONTEXT_HEADER);
    for (index, doc) in docs.iter().enumerate() {
        content.push_str(&format!("\n{}. [{}] {}", index + 1, doc.id, doc.text));
    }
    content.push_str("\n\n");
    content.push_str(CONTEXT_INSTRUCTION);
    content
}

// History roles outside the closed set collapse to user rather than being
// forwarded verbatim to the provider.
fn coerce_role(raw: &str) -> PromptRole {
    match raw.trim().to_ascii_lowercase().as_str() {
        "assistant" => PromptRole::Assistant,
        _ => PromptRole::User,
    }
}

fn stringify_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
