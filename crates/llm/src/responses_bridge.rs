//! OpenAI-"Responses" bridge (C7, spec §4.7): `/v1/responses` is not a peer
//! dialect in the registry (it has no tool-call or thinking wire shape of
//! its own worth modeling as a fifth `DialectAdapter`); instead it's a
//! sub-pipeline that converts directly to and from OpenAI-Chat's wire shape,
//! never touching the IR other dialects share.

use uuid::Uuid;

use crate::messages::openai;
use crate::messages::openai_responses as responses;

pub fn request(req: responses::Request) -> openai::ChatCompletionRequest {
    let mut messages = Vec::new();
    if let Some(instructions) = req.instructions {
        messages.push(system_message(instructions));
    }

    match req.input {
        responses::Input::Text(text) => messages.push(chat_message(openai::ChatRole::User, text)),
        responses::Input::Messages(items) => {
            for item in items {
                let role = match item.role {
                    responses::InputRole::System | responses::InputRole::Developer => openai::ChatRole::System,
                    responses::InputRole::User => openai::ChatRole::User,
                    responses::InputRole::Assistant => openai::ChatRole::Assistant,
                };
                messages.push(chat_message(role, item.content));
            }
        }
    }

    openai::ChatCompletionRequest {
        model: req.model,
        messages,
        max_tokens: req.max_output_tokens,
        temperature: None,
        top_p: None,
        stop: None,
        stream: req.stream,
        tools: None,
        tool_choice: None,
        user: None,
    }
}

fn chat_message(role: openai::ChatRole, text: String) -> openai::ChatMessage {
    openai::ChatMessage {
        role,
        content: Some(openai::MessageContent::Text(text)),
        name: None,
        tool_calls: None,
        tool_call_id: None,
    }
}

fn system_message(text: String) -> openai::ChatMessage {
    chat_message(openai::ChatRole::System, text)
}

/// Non-streaming response, already in its terminal state. `chat`'s own id is
/// discarded in favor of a freshly minted `resp_…`/`msg_…` pair — the two
/// dialects don't share an id namespace.
pub fn response(chat: openai::ChatCompletionResponse, created_at: i64) -> responses::Response {
    let choice = chat.choices.into_iter().next();
    let text = choice.as_ref().and_then(|c| c.message.content.as_ref()).map(|c| c.as_text()).unwrap_or_default();
    let (status, reason) = status_and_reason(choice.and_then(|c| c.finish_reason));

    responses::Response {
        id: format!("resp_{}", Uuid::new_v4()),
        object: "response".into(),
        created_at,
        status,
        model: chat.model,
        output: vec![responses::OutputItem {
            id: format!("msg_{}", Uuid::new_v4()),
            r#type: responses::OutputItemType::Message,
            status: responses::ResponseStatus::Completed,
            role: responses::OutputRole::Assistant,
            content: vec![responses::OutputContent::OutputText { text }],
        }],
        incomplete_details: reason.map(|reason| responses::IncompleteDetails { reason }),
        usage: chat.usage.map(|usage| responses::Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }),
    }
}

/// Chat's `FinishReason` has no error variant, so this never maps to
/// `failed` — only `length`/`content_filter` are incomplete; everything
/// else, including `tool_calls`, is `completed`.
fn status_and_reason(finish_reason: Option<openai::FinishReason>) -> (responses::ResponseStatus, Option<responses::IncompleteReason>) {
    match finish_reason {
        Some(openai::FinishReason::Length) => (responses::ResponseStatus::Incomplete, Some(responses::IncompleteReason::MaxOutputTokens)),
        Some(openai::FinishReason::ContentFilter) => (responses::ResponseStatus::Incomplete, Some(responses::IncompleteReason::ContentFilter)),
        _ => (responses::ResponseStatus::Completed, None),
    }
}

/// Drives the `response.created` → `...output_text.delta`(*) →
/// `response.completed` lifecycle from a sequence of OpenAI-Chat stream
/// chunks. Holds the running state a single chunk can't carry on its own:
/// the response and output-item ids, whether the opening events have fired
/// yet, and the text accumulated so far (needed for the final
/// `output_text.done` event, which repeats the full text rather than just
/// the last delta).
pub struct ResponsesStreamEmitter {
    response_id: String,
    item_id: String,
    model: String,
    created_at: i64,
    started: bool,
    accumulated_text: String,
}

impl ResponsesStreamEmitter {
    pub fn new(model: impl Into<String>, created_at: i64) -> Self {
        Self {
            response_id: format!("resp_{}", Uuid::new_v4()),
            item_id: format!("msg_{}", Uuid::new_v4()),
            model: model.into(),
            created_at,
            started: false,
            accumulated_text: String::new(),
        }
    }

    /// The opening sequence is exactly `created` → `output_item.added` →
    /// `content_part.added`, with no separate `in_progress` event — the
    /// `created` event's own embedded response already carries
    /// `status: in_progress`.
    pub fn push(&mut self, chunk: &openai::ChatCompletionChunk) -> Vec<responses::StreamEvent> {
        let mut events = Vec::new();
        let Some(choice) = chunk.choices.first() else {
            return events;
        };

        let content = choice.delta.content.as_deref().filter(|text| !text.is_empty());

        if !self.started && (content.is_some() || choice.finish_reason.is_some()) {
            self.started = true;
            events.push(responses::StreamEvent::ResponseCreated { response: self.in_progress_response() });
            events.push(responses::StreamEvent::OutputItemAdded {
                output_index: 0,
                item: self.output_item(responses::ResponseStatus::InProgress, String::new()),
            });
            events.push(responses::StreamEvent::ContentPartAdded {
                item_id: self.item_id.clone(),
                output_index: 0,
                content_index: 0,
                part: responses::OutputContent::OutputText { text: String::new() },
            });
        }

        if let Some(text) = content {
            self.accumulated_text.push_str(text);
            events.push(responses::StreamEvent::OutputTextDelta {
                item_id: self.item_id.clone(),
                output_index: 0,
                content_index: 0,
                delta: text.to_string(),
            });
        }

        if let Some(finish_reason) = choice.finish_reason {
            events.push(responses::StreamEvent::OutputTextDone {
                item_id: self.item_id.clone(),
                output_index: 0,
                content_index: 0,
                text: self.accumulated_text.clone(),
            });

            events.push(responses::StreamEvent::OutputItemDone {
                output_index: 0,
                item: self.output_item(responses::ResponseStatus::Completed, self.accumulated_text.clone()),
            });

            let (status, reason) = status_and_reason(Some(finish_reason));
            events.push(responses::StreamEvent::ResponseCompleted {
                response: self.response_in_status(status, reason),
            });
        }

        events
    }

    fn output_item(&self, status: responses::ResponseStatus, text: String) -> responses::OutputItem {
        responses::OutputItem {
            id: self.item_id.clone(),
            r#type: responses::OutputItemType::Message,
            status,
            role: responses::OutputRole::Assistant,
            content: vec![responses::OutputContent::OutputText { text }],
        }
    }

    fn in_progress_response(&self) -> responses::Response {
        self.response_in_status(responses::ResponseStatus::InProgress, None)
    }

    fn response_in_status(&self, status: responses::ResponseStatus, reason: Option<responses::IncompleteReason>) -> responses::Response {
        responses::Response {
            id: self.response_id.clone(),
            object: "response".into(),
            created_at: self.created_at,
            status,
            model: self.model.clone(),
            output: vec![self.output_item(
                if status == responses::ResponseStatus::InProgress {
                    responses::ResponseStatus::InProgress
                } else {
                    responses::ResponseStatus::Completed
                },
                self.accumulated_text.clone(),
            )],
            incomplete_details: reason.map(|reason| responses::IncompleteDetails { reason }),
            usage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_become_a_leading_system_message() {
        let req = responses::Request {
            model: "gpt-4o".into(),
            instructions: Some("be terse".into()),
            input: responses::Input::Text("hi".into()),
            max_output_tokens: None,
            stream: None,
            reasoning: None,
        };

        let chat = request(req);
        assert_eq!(chat.messages[0].role, openai::ChatRole::System);
        assert_eq!(chat.messages[0].content.as_ref().unwrap().as_text(), "be terse");
        assert_eq!(chat.messages[1].content.as_ref().unwrap().as_text(), "hi");
    }

    #[test]
    fn system_and_developer_input_messages_both_map_to_the_system_role() {
        let req = responses::Request {
            model: "gpt-4o".into(),
            instructions: None,
            input: responses::Input::Messages(vec![
                responses::InputMessage { role: responses::InputRole::Developer, content: "use markdown".into() },
                responses::InputMessage { role: responses::InputRole::User, content: "hi".into() },
            ]),
            max_output_tokens: None,
            stream: None,
            reasoning: None,
        };

        let chat = request(req);
        assert_eq!(chat.messages[0].role, openai::ChatRole::System);
        assert_eq!(chat.messages.len(), 2);
    }

    fn chunk(delta: openai::ChunkDelta, finish_reason: Option<openai::FinishReason>) -> openai::ChatCompletionChunk {
        openai::ChatCompletionChunk {
            id: "chatcmpl-1".into(),
            object: "chat.completion.chunk".into(),
            created: 1_700_000_000,
            model: "gpt-4o".into(),
            choices: vec![openai::ChunkChoice { index: 0, delta, finish_reason }],
            usage: None,
        }
    }

    /// Scenario S4: exactly 7 events in order, with no separate
    /// `response.in_progress` event.
    #[test]
    fn streaming_emits_the_seven_event_sequence_for_a_single_delta() {
        let mut emitter = ResponsesStreamEmitter::new("gpt-4o", 1_700_000_000);

        let mut events = emitter.push(&chunk(openai::ChunkDelta { content: Some("Hi".into()), ..Default::default() }, None));
        events.extend(emitter.push(&chunk(openai::ChunkDelta::default(), Some(openai::FinishReason::Stop))));

        assert_eq!(events.len(), 7);
        assert!(matches!(events[0], responses::StreamEvent::ResponseCreated { .. }));
        assert!(matches!(events[1], responses::StreamEvent::OutputItemAdded { .. }));
        assert!(matches!(events[2], responses::StreamEvent::ContentPartAdded { .. }));
        assert!(matches!(events[3], responses::StreamEvent::OutputTextDelta { .. }));
        assert!(matches!(events[4], responses::StreamEvent::OutputTextDone { .. }));
        assert!(matches!(events[5], responses::StreamEvent::OutputItemDone { .. }));
        assert!(matches!(events[6], responses::StreamEvent::ResponseCompleted { .. }));
    }

    #[test]
    fn done_chunk_emits_the_full_accumulated_text_not_just_the_last_delta() {
        let mut emitter = ResponsesStreamEmitter::new("gpt-4o", 1_700_000_000);
        emitter.push(&chunk(openai::ChunkDelta { content: Some("hi ".into()), ..Default::default() }, None));
        let events = emitter.push(&chunk(openai::ChunkDelta { content: Some("there".into()), ..Default::default() }, None));
        assert_eq!(events.len(), 1);

        let done = emitter.push(&chunk(openai::ChunkDelta::default(), Some(openai::FinishReason::Stop)));

        match &done[0] {
            responses::StreamEvent::OutputTextDone { text, .. } => assert_eq!(text, "hi there"),
            other => panic!("expected OutputTextDone, got {other:?}"),
        }
        assert!(matches!(done[2], responses::StreamEvent::ResponseCompleted { .. }));
    }

    #[test]
    fn length_finish_reason_maps_to_incomplete_with_max_output_tokens() {
        let mut emitter = ResponsesStreamEmitter::new("gpt-4o", 1_700_000_000);
        emitter.push(&chunk(openai::ChunkDelta { content: Some("partial".into()), ..Default::default() }, None));
        let done = emitter.push(&chunk(openai::ChunkDelta::default(), Some(openai::FinishReason::Length)));

        match &done[2] {
            responses::StreamEvent::ResponseCompleted { response } => {
                assert_eq!(response.status, responses::ResponseStatus::Incomplete);
                assert_eq!(response.incomplete_details.as_ref().unwrap().reason, responses::IncompleteReason::MaxOutputTokens);
            }
            other => panic!("expected ResponseCompleted, got {other:?}"),
        }
    }

    #[test]
    fn non_streaming_tool_calls_finish_reason_is_still_completed() {
        let chat = openai::ChatCompletionResponse {
            id: "chatcmpl-1".into(),
            object: "chat.completion".into(),
            created: 1_700_000_000,
            model: "gpt-4o".into(),
            choices: vec![openai::Choice {
                index: 0,
                message: openai::ChatMessage {
                    role: openai::ChatRole::Assistant,
                    content: Some(openai::MessageContent::Text(String::new())),
                    name: None,
                    tool_calls: None,
                    tool_call_id: None,
                },
                finish_reason: Some(openai::FinishReason::ToolCalls),
            }],
            usage: None,
        };

        let resp = response(chat, 1_700_000_000);
        assert_eq!(resp.status, responses::ResponseStatus::Completed);
        assert!(resp.incomplete_details.is_none());
    }

    #[test]
    fn content_filter_finish_reason_maps_to_incomplete() {
        let chat = openai::ChatCompletionResponse {
            id: "chatcmpl-1".into(),
            object: "chat.completion".into(),
            created: 1_700_000_000,
            model: "gpt-4o".into(),
            choices: vec![openai::Choice {
                index: 0,
                message: openai::ChatMessage {
                    role: openai::ChatRole::Assistant,
                    content: Some(openai::MessageContent::Text("blocked".into())),
                    name: None,
                    tool_calls: None,
                    tool_call_id: None,
                },
                finish_reason: Some(openai::FinishReason::ContentFilter),
            }],
            usage: None,
        };

        let resp = response(chat, 1_700_000_000);
        assert_eq!(resp.status, responses::ResponseStatus::Incomplete);
        assert_eq!(resp.incomplete_details.unwrap().reason, responses::IncompleteReason::ContentFilter);
    }
}
