//! Partial-JSON tool-call accumulator (P4): buffers each tool call's
//! `partial_json` fragments verbatim, in arrival order, and only ever parses
//! the joined string once — on completion. Never re-serializes a fragment it
//! didn't produce itself.

use std::collections::HashMap;

use serde_json::Value;

use crate::messages::unified::{ToolArguments, ToolCallDelta};

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    json: String,
    complete_value: Option<Value>,
}

/// Keyed by `(response_id, tool_call index)`, since a single response can
/// stream several tool calls concurrently (one per `index`) and the same
/// index is reused across unrelated responses.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: HashMap<(String, u32), PendingToolCall>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinishedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one delta. `id`/`name` (sent once, typically on the first delta
    /// for a given index) are remembered; `partial_json` fragments are
    /// appended verbatim; a complete `arguments` object short-circuits the
    /// buffer entirely.
    pub fn push(&mut self, response_id: &str, delta: &ToolCallDelta) {
        let key = (response_id.to_string(), delta.index);
        let entry = self.pending.entry(key).or_default();

        if let Some(id) = &delta.id {
            entry.id = Some(id.clone());
        }
        if let Some(name) = &delta.name {
            entry.name = Some(name.clone());
        }
        if let Some(fragment) = &delta.partial_json {
            entry.json.push_str(fragment);
        }
        if let Some(value) = &delta.arguments {
            entry.complete_value = Some(value.clone());
        }
    }

    /// Finalizes and removes the buffer for `(response_id, index)`. Parses
    /// the joined fragments as JSON; if they don't form valid JSON (a
    /// truncated stream, or a dialect that never sends a balanced document),
    /// falls back to wrapping the raw text so no bytes are lost.
    pub fn finish(&mut self, response_id: &str, index: u32) -> Option<FinishedToolCall> {
        let entry = self.pending.remove(&(response_id.to_string(), index))?;

        let arguments = if let Some(value) = entry.complete_value {
            value
        } else if entry.json.is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&entry.json).unwrap_or_else(|_| ToolArguments::Raw(entry.json.clone()).as_value())
        };

        Some(FinishedToolCall {
            id: entry.id.unwrap_or_default(),
            name: entry.name.unwrap_or_default(),
            arguments,
        })
    }

    /// True once at least one delta has arrived for this key, even if it
    /// hasn't finished — used to decide whether a `Done`/`stop_reason` chunk
    /// should trigger a flush.
    pub fn is_pending(&self, response_id: &str, index: u32) -> bool {
        self.pending.contains_key(&(response_id.to_string(), index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(index: u32, id: Option<&str>, name: Option<&str>, partial_json: Option<&str>) -> ToolCallDelta {
        ToolCallDelta {
            index,
            id: id.map(str::to_string),
            name: name.map(str::to_string),
            partial_json: partial_json.map(str::to_string),
            arguments: None,
        }
    }

    #[test]
    fn fragments_are_joined_and_parsed_only_on_finish() {
        let mut acc = ToolCallAccumulator::new();
        acc.push("resp-1", &delta(0, Some("call_1"), Some("get_weather"), Some("{\"city\":")));
        acc.push("resp-1", &delta(0, None, None, Some("\"sf\"}")));

        let finished = acc.finish("resp-1", 0).unwrap();
        assert_eq!(finished.id, "call_1");
        assert_eq!(finished.name, "get_weather");
        assert_eq!(finished.arguments, serde_json::json!({"city": "sf"}));
    }

    #[test]
    fn truncated_json_falls_back_to_a_raw_string_wrapper() {
        let mut acc = ToolCallAccumulator::new();
        acc.push("resp-1", &delta(0, Some("call_1"), Some("f"), Some("{\"city\": \"sf\"")));

        let finished = acc.finish("resp-1", 0).unwrap();
        assert_eq!(finished.arguments, Value::String("{\"city\": \"sf\"".to_string()));
    }

    #[test]
    fn concurrent_indices_on_the_same_response_do_not_interfere() {
        let mut acc = ToolCallAccumulator::new();
        acc.push("resp-1", &delta(0, Some("call_0"), Some("a"), Some("{\"x\":1}")));
        acc.push("resp-1", &delta(1, Some("call_1"), Some("b"), Some("{\"y\":2}")));

        let first = acc.finish("resp-1", 0).unwrap();
        let second = acc.finish("resp-1", 1).unwrap();
        assert_eq!(first.name, "a");
        assert_eq!(second.name, "b");
    }

    #[test]
    fn finish_is_a_one_shot_removal() {
        let mut acc = ToolCallAccumulator::new();
        acc.push("resp-1", &delta(0, Some("call_1"), Some("a"), Some("{}")));
        assert!(acc.finish("resp-1", 0).is_some());
        assert!(acc.finish("resp-1", 0).is_none());
    }
}
