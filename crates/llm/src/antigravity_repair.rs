//! Antigravity tool-pairing repair (spec §4.6).
//!
//! Gemini requires a `functionResponse` group to sit immediately after the
//! `model` turn whose `functionCall`s it answers. Antigravity's upstream
//! context rewriting can both scatter that group's responses across several
//! later turns and drop some of them outright. This pass walks the flat
//! `contents` sequence once, consolidates every scattered-but-present
//! response into a single `user` turn right after its originating model
//! turn, and synthesizes a placeholder for anything still missing at the
//! end of the walk.

use std::collections::{HashMap, HashSet};

use crate::messages::gemini;

struct PendingGroup {
    insertion_index: usize,
    call_ids: Vec<String>,
    function_names: HashMap<String, String>,
}

fn call_id(call: &gemini::FunctionCall) -> String {
    call.id.clone().unwrap_or_else(|| call.name.clone())
}

fn response_id(response: &gemini::FunctionResponse) -> String {
    response.id.clone().unwrap_or_else(|| response.name.clone())
}

/// Walks `contents`, folding every `functionResponse` it finds into the
/// group of the model turn it answers, placed directly after that turn.
/// Idempotent (P6): re-running over already-repaired contents finds every
/// call already satisfied by its own merged group and changes nothing.
pub fn repair(contents: &mut Vec<gemini::Content>) {
    let pending: Vec<PendingGroup> = contents
        .iter()
        .enumerate()
        .filter(|(_, content)| content.role == gemini::ContentRole::Model)
        .filter_map(|(index, content)| {
            let mut call_ids = Vec::new();
            let mut function_names = HashMap::new();
            for part in &content.parts {
                if let Some(call) = &part.function_call {
                    let id = call_id(call);
                    function_names.insert(id.clone(), call.name.clone());
                    call_ids.push(id);
                }
            }
            (!call_ids.is_empty()).then_some(PendingGroup { insertion_index: index, call_ids, function_names })
        })
        .collect();

    if pending.is_empty() {
        return;
    }

    // Every function response seen anywhere, keyed by id, plus the item
    // indices that carried one — those items are dropped from the rebuilt
    // sequence once their contents are folded into a merged group (step 3).
    let mut pool: HashMap<String, gemini::Part> = HashMap::new();
    let mut response_item_indices: HashSet<usize> = HashSet::new();
    for (index, content) in contents.iter().enumerate() {
        for part in &content.parts {
            if let Some(response) = &part.function_response {
                pool.insert(response_id(response), part.clone());
                response_item_indices.insert(index);
            }
        }
    }

    let mut unresolved_count = 0;
    let mut merged: Vec<(usize, gemini::Content)> = Vec::with_capacity(pending.len());

    for group in &pending {
        // Exact id matches (step 3) are resolved before any orphan
        // reassignment (step 4) so one call's placeholder fallback never
        // steals a response another call in the same group matches exactly.
        let mut resolved: Vec<Option<gemini::Part>> = group.call_ids.iter().map(|id| pool.remove(id)).collect();

        for (slot, id) in resolved.iter_mut().zip(&group.call_ids) {
            if slot.is_some() {
                continue;
            }
            let name = group.function_names.get(id).map(String::as_str).unwrap_or_default();
            let orphan = pool
                .iter()
                .find(|(_, part)| part.function_response.as_ref().is_some_and(|r| r.name == name))
                .map(|(orphan_id, _)| orphan_id.clone())
                .or_else(|| pool.keys().next().cloned());

            *slot = Some(match orphan.and_then(|orphan_id| pool.remove(&orphan_id)) {
                Some(reassigned) => reassigned,
                None => {
                    unresolved_count += 1;
                    placeholder_part(id.clone())
                }
            });
        }

        let parts: Vec<gemini::Part> = resolved.into_iter().map(|part| part.expect("every slot resolved above")).collect();
        merged.push((group.insertion_index, gemini::Content { role: gemini::ContentRole::User, parts }));
    }

    if unresolved_count > 0 {
        log::warn!("antigravity repair synthesized {unresolved_count} placeholder tool response(s); no orphan response was available to reassign");
    }

    let mut rebuilt = Vec::with_capacity(contents.len());
    for (index, content) in contents.drain(..).enumerate() {
        if !response_item_indices.contains(&index) {
            rebuilt.push(content);
        }
        if let Some((_, merged_item)) = merged.iter().find(|(group_index, _)| *group_index == index) {
            rebuilt.push(merged_item.clone());
        }
    }

    *contents = rebuilt;
}

fn placeholder_part(id: String) -> gemini::Part {
    gemini::Part {
        function_response: Some(gemini::FunctionResponse {
            name: id.clone(),
            response: serde_json::json!({ "error": "recovered placeholder" }),
            id: Some(id),
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call_content(ids: &[&str]) -> gemini::Content {
        gemini::Content {
            role: gemini::ContentRole::Model,
            parts: ids
                .iter()
                .map(|id| gemini::Part {
                    function_call: Some(gemini::FunctionCall {
                        name: "get_weather".into(),
                        args: serde_json::json!({}),
                        id: Some((*id).into()),
                    }),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn response_content(id: &str) -> gemini::Content {
        gemini::Content {
            role: gemini::ContentRole::User,
            parts: vec![gemini::Part {
                function_response: Some(gemini::FunctionResponse {
                    name: "get_weather".into(),
                    response: serde_json::json!({"temp": 72}),
                    id: Some(id.into()),
                }),
                ..Default::default()
            }],
        }
    }

    #[test]
    fn dangling_call_gets_a_placeholder_response_inserted_after_it() {
        let mut contents = vec![call_content(&["call_1"])];
        repair(&mut contents);

        assert_eq!(contents.len(), 2);
        let response = contents[1].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.id.as_deref(), Some("call_1"));
        assert_eq!(response.response["error"], "recovered placeholder");
    }

    #[test]
    fn repair_is_idempotent() {
        let mut contents = vec![call_content(&["call_1"])];
        repair(&mut contents);
        let after_first = contents.len();

        repair(&mut contents);
        assert_eq!(contents.len(), after_first);
    }

    #[test]
    fn already_satisfied_calls_are_left_alone() {
        let mut contents = vec![call_content(&["call_1"]), response_content("call_1")];

        repair(&mut contents);
        assert_eq!(contents.len(), 2);
    }

    /// Scenario S5's first case: responses for both calls are present but
    /// scattered across separate turns — the pass must consolidate them
    /// into one merged group right after the model turn, not leave them
    /// scattered in place.
    #[test]
    fn scattered_responses_for_the_same_group_are_consolidated_into_one_turn() {
        let mut contents = vec![call_content(&["A", "B"]), response_content("A"), response_content("B")];

        repair(&mut contents);

        assert_eq!(contents.len(), 2);
        assert_eq!(contents[1].role, gemini::ContentRole::User);
        assert_eq!(contents[1].parts.len(), 2);
        let ids: Vec<&str> = contents[1].parts.iter().map(|p| p.function_response.as_ref().unwrap().id.as_deref().unwrap()).collect();
        assert_eq!(ids, vec!["A", "B"]);
    }

    #[test]
    fn one_missing_response_in_a_group_gets_a_placeholder_while_the_other_is_kept() {
        let mut contents = vec![call_content(&["A", "B"]), response_content("B")];

        repair(&mut contents);

        assert_eq!(contents.len(), 2);
        let responses = &contents[1].parts;
        assert_eq!(responses[0].function_response.as_ref().unwrap().response["error"], "recovered placeholder");
        assert_eq!(responses[1].function_response.as_ref().unwrap().id.as_deref(), Some("B"));
    }

    #[test]
    fn non_function_items_pass_through_untouched() {
        let text_turn = gemini::Content {
            role: gemini::ContentRole::User,
            parts: vec![gemini::Part { text: Some("hello".into()), ..Default::default() }],
        };
        let mut contents = vec![text_turn, call_content(&["call_1"]), response_content("call_1")];

        repair(&mut contents);

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0].parts[0].text.as_deref(), Some("hello"));
    }
}
