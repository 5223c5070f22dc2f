//! Heuristic token estimation: ~4 characters per token plus a small
//! per-message overhead for role/formatting, used when no provider-native
//! tokenizer is wired in.

use agentcore_types::Message;

const CHARS_PER_TOKEN: usize = 4;
const PER_MESSAGE_OVERHEAD: usize = 4;

/// Estimate the token cost of one message.
pub fn estimate_message_tokens(message: &Message) -> usize {
    message.content.len() / CHARS_PER_TOKEN + PER_MESSAGE_OVERHEAD
}

/// Estimate the total token cost of a message sequence.
pub fn estimate_messages(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}
