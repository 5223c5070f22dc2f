//! The shared data model: sessions, messages, tool calls/results, task
//! state, usage records, cost summaries, and tool metadata.

use crate::id::{SessionId, ToolCallId};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who produced a message.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The system prompt. Never compressible.
    System,
    /// The human (or calling process) driving the task.
    User,
    /// The model's own output.
    Assistant,
    /// An observation returned from a tool call.
    Tool,
}

/// A single entry in a session's message log.
///
/// Invariants (enforced by the context manager, not by this type):
/// system messages have `compressible = false`; every tool message
/// references a `tool_call_id` that appears in some earlier assistant
/// message's `tool_calls`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who produced this message.
    pub role: Role,
    /// The textual content. May be empty for an assistant turn that is
    /// pure tool calls.
    pub content: String,
    /// Tool calls requested by this message (assistant role only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The tool-call id this message answers (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<ToolCallId>,
    /// When this message was appended.
    pub timestamp: DateTime<Utc>,
    /// Whether this message may be folded into a compaction summary.
    /// System messages and the preserved tail are never compressible
    /// regardless of this flag; it exists so the context manager can
    /// mark e.g. synthesized summaries as themselves non-compressible.
    pub compressible: bool,
}

impl Message {
    /// Construct a new message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        let compressible = role != Role::System;
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
            compressible,
        }
    }

    /// Attach tool calls to this (assistant) message.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = calls;
        self
    }

    /// Mark this (tool) message as answering a specific call.
    pub fn with_tool_call_id(mut self, id: ToolCallId) -> Self {
        self.tool_call_id = Some(id);
        self
    }

    /// System prompts and non-compressible messages are protected from
    /// compaction regardless of tail position.
    pub fn is_compressible(&self) -> bool {
        self.role != Role::System && self.compressible
    }
}

/// A structured request to invoke a named tool, emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique within the assistant turn that produced it.
    pub id: ToolCallId,
    /// The registered tool name.
    pub name: String,
    /// Arguments as a JSON object.
    pub arguments: serde_json::Value,
}

/// The outcome of executing one `ToolCall`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Which call this answers.
    pub tool_call_id: ToolCallId,
    /// The LLM-facing output text.
    pub output: String,
    /// Set when the call did not succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<crate::error::ErrorKind>,
    /// Arbitrary structured metadata (timings, byte counts, etc.).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ToolResult {
    /// Build a successful result.
    pub fn ok(tool_call_id: ToolCallId, output: impl Into<String>) -> Self {
        Self {
            tool_call_id,
            output: output.into(),
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Build a failed result carrying an `ErrorKind`.
    pub fn err(
        tool_call_id: ToolCallId,
        kind: crate::error::ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id,
            output: message.into(),
            error: Some(kind),
            metadata: BTreeMap::new(),
        }
    }

    /// Whether this result represents a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a `SolveTask` invocation stopped.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a final answer with no outstanding tool calls.
    FinalAnswer,
    /// The configured iteration cap was reached.
    MaxIterations,
    /// A permanent model-call error stopped the loop.
    FatalError,
    /// The task was cancelled.
    Cancelled,
    /// Every tool call in one iteration failed permanently.
    AllToolsErrored,
}

/// Running state of one `SolveTask` invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskState {
    /// 0-indexed iteration counter.
    pub iteration: u32,
    /// Index into the session's message log at which this task began.
    pub history_index: usize,
    /// Set once the loop has a verdict.
    pub stop_reason: Option<StopReason>,
    /// Cumulative input/output tokens consumed by this task so far.
    pub token_totals: TokenTotals,
}

impl TaskState {
    /// A fresh task state beginning at the given history offset.
    pub fn starting_at(history_index: usize) -> Self {
        Self {
            iteration: 0,
            history_index,
            stop_reason: None,
            token_totals: TokenTotals::default(),
        }
    }
}

/// Token accounting accumulated across a task's iterations.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenTotals {
    /// Prompt tokens sent.
    pub input_tokens: u64,
    /// Completion tokens received.
    pub output_tokens: u64,
    /// Tokens served from a provider-side prompt cache, if reported.
    pub cached_tokens: u64,
}

/// A conversation session: an ordered message log plus derived metadata.
///
/// Appended to many times; the only in-place rewrite is compaction's
/// prefix replacement, which preserves the relative order of every
/// retained message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque, process-wide unique identifier.
    pub id: SessionId,
    /// The message log, oldest first.
    pub messages: Vec<Message>,
    /// Cumulative tokens consumed across the session's lifetime.
    pub cumulative_tokens: TokenTotals,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: SessionId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            cumulative_tokens: TokenTotals::default(),
            started_at: Utc::now(),
        }
    }

    /// Append a message, preserving append order.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// An immutable record of one model response's token usage and cost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Which session incurred this usage.
    pub session_id: SessionId,
    /// Model identifier, e.g. `"gpt-4o"`.
    pub model: String,
    /// Provider identifier, e.g. `"openai"`.
    pub provider: String,
    /// Prompt tokens billed at the input rate.
    pub input_tokens: u64,
    /// Completion tokens billed at the output rate.
    pub output_tokens: u64,
    /// Tokens served from a provider prompt cache, billed at the cached
    /// rate when the pricing table has one.
    pub cached_tokens: u64,
    /// Computed cost of the input tokens, USD.
    pub input_cost: Decimal,
    /// Computed cost of the output tokens, USD.
    pub output_cost: Decimal,
    /// `input_cost + output_cost`.
    pub total_cost: Decimal,
    /// When the response was received.
    pub timestamp: DateTime<Utc>,
}

/// A selector for cost/usage aggregation queries.
#[derive(Debug, Clone)]
pub enum CostSelector {
    /// All records for one session.
    BySession(SessionId),
    /// All records for one UTC calendar date.
    ByDate(chrono::NaiveDate),
    /// All records for one UTC calendar month.
    ByMonth {
        /// Four-digit year.
        year: i32,
        /// 1-indexed month.
        month: u32,
    },
    /// All records in `[from, to]` inclusive.
    ByRange {
        /// Start of the range, inclusive.
        from: DateTime<Utc>,
        /// End of the range, inclusive.
        to: DateTime<Utc>,
    },
}

/// Aggregated totals over a set of `UsageRecord`s, broken down by model
/// and by provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    /// Number of records the summary was computed over.
    pub record_count: u64,
    /// Sum of input tokens.
    pub input_tokens: u64,
    /// Sum of output tokens.
    pub output_tokens: u64,
    /// Sum of cached tokens.
    pub cached_tokens: u64,
    /// Sum of total cost.
    pub total_cost: Decimal,
    /// Totals keyed by model name.
    pub by_model: BTreeMap<String, ModelCostBreakdown>,
    /// Totals keyed by provider name.
    pub by_provider: BTreeMap<String, ModelCostBreakdown>,
}

/// Per-model or per-provider cost breakdown entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelCostBreakdown {
    /// Number of records.
    pub record_count: u64,
    /// Sum of input tokens.
    pub input_tokens: u64,
    /// Sum of output tokens.
    pub output_tokens: u64,
    /// Sum of total cost.
    pub total_cost: Decimal,
}

impl CostSummary {
    /// Fold one usage record into a running summary.
    pub fn accumulate(&mut self, record: &UsageRecord) {
        self.record_count += 1;
        self.input_tokens += record.input_tokens;
        self.output_tokens += record.output_tokens;
        self.cached_tokens += record.cached_tokens;
        self.total_cost += record.total_cost;

        let model_entry = self.by_model.entry(record.model.clone()).or_default();
        model_entry.record_count += 1;
        model_entry.input_tokens += record.input_tokens;
        model_entry.output_tokens += record.output_tokens;
        model_entry.total_cost += record.total_cost;

        let provider_entry = self
            .by_provider
            .entry(record.provider.clone())
            .or_default();
        provider_entry.record_count += 1;
        provider_entry.input_tokens += record.input_tokens;
        provider_entry.output_tokens += record.output_tokens;
        provider_entry.total_cost += record.total_cost;
    }
}

/// Metadata a tool publishes to the registry: what it's called, what it
/// takes, and whether invoking it is destructive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Registry-unique name.
    pub name: String,
    /// Human/model-facing description.
    pub description: String,
    /// JSON Schema for the tool's `arguments` map.
    pub parameter_schema: serde_json::Value,
    /// Whether this tool mutates external state and requires approval
    /// and backup per the executor's destructive-operation policy.
    pub dangerous: bool,
    /// Free-form tags used for policy filtering.
    #[serde(default)]
    pub group_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_messages_default_non_compressible() {
        let m = Message::new(Role::System, "you are an assistant");
        assert!(!m.is_compressible());
    }

    #[test]
    fn user_messages_default_compressible() {
        let m = Message::new(Role::User, "hello");
        assert!(m.is_compressible());
    }

    #[test]
    fn cost_summary_accumulates_linearly() {
        let mut summary = CostSummary::default();
        let r = UsageRecord {
            session_id: SessionId::new("s1"),
            model: "gpt-4o".into(),
            provider: "openai".into(),
            input_tokens: 1000,
            output_tokens: 500,
            cached_tokens: 0,
            input_cost: Decimal::new(5, 3),
            output_cost: Decimal::new(75, 4),
            total_cost: Decimal::new(575, 4),
            timestamp: Utc::now(),
        };
        summary.accumulate(&r);
        summary.accumulate(&r);
        assert_eq!(summary.record_count, 2);
        assert_eq!(summary.input_tokens, 2000);
        assert_eq!(summary.total_cost, Decimal::new(1150, 4));
        assert_eq!(summary.by_model["gpt-4o"].record_count, 2);
    }
}
