//! Timeline Folder: canonical events -> bounded, display-ready activity items.
//!
//! Tool calls are correlated through an `id -> sequence` index into the ring,
//! so args split across many records still land on the right item and each
//! event is handled in O(1) amortized time.

use std::collections::HashMap;
use turnweave_core::{
    ArtifactItem, CanonicalEvent, EventItem, EventKind, RingBuffer, StateChange, StateItem,
    TimelineItem, ToolItem, ToolStatus,
};

const UNKNOWN_TOOL: &str = "unknown";

pub struct TimelineFolder {
    items: RingBuffer<TimelineItem>,
    tool_index: HashMap<String, u64>,
}

impl TimelineFolder {
    /// Folder keeping the `display_cap` most recent items.
    pub fn new(display_cap: usize) -> Self {
        Self {
            items: RingBuffer::new(display_cap),
            tool_index: HashMap::new(),
        }
    }

    pub fn push(&mut self, event: &CanonicalEvent) {
        let timestamp = event.timestamp();
        match &event.kind {
            EventKind::MessageStart { .. }
            | EventKind::MessageContent { .. }
            | EventKind::MessageEnd { .. } => {}

            EventKind::ToolStart {
                tool_call_id,
                tool_name,
                ..
            } => {
                if let Some(tool) = self.tool_mut(tool_call_id) {
                    // Replayed start for a call we already show.
                    if tool.name == UNKNOWN_TOOL {
                        tool.name = tool_name.clone();
                    }
                    return;
                }
                self.append_tool(ToolItem {
                    id: tool_call_id.clone(),
                    timestamp,
                    name: tool_name.clone(),
                    args: String::new(),
                    result: None,
                    status: ToolStatus::Running,
                });
            }
            EventKind::ToolArgs {
                tool_call_id,
                delta,
            } => match self.tool_mut(tool_call_id) {
                Some(tool) => tool.args.push_str(delta),
                None => tracing::trace!("dropping args for unknown tool call {tool_call_id}"),
            },
            EventKind::ToolResult {
                tool_call_id,
                tool_name,
                content,
            } => match self.tool_mut(tool_call_id) {
                Some(tool) => {
                    tool.result = Some(content.clone());
                    tool.status = ToolStatus::Completed;
                }
                None => self.append_tool(ToolItem {
                    id: tool_call_id.clone(),
                    timestamp,
                    name: tool_name.clone().unwrap_or_else(|| UNKNOWN_TOOL.to_string()),
                    args: String::new(),
                    result: Some(content.clone()),
                    status: ToolStatus::Completed,
                }),
            },
            EventKind::ToolEnd { tool_call_id } => {
                if let Some(tool) = self.tool_mut(tool_call_id) {
                    if tool.status != ToolStatus::Completed {
                        tool.status = ToolStatus::Done;
                    }
                }
            }

            EventKind::StateDelta { delta } => {
                let id = self.generic_id("state");
                self.append(TimelineItem::State(StateItem {
                    id,
                    timestamp,
                    change: StateChange::Delta(delta.clone()),
                }));
            }
            EventKind::StateSnapshot { snapshot } => {
                let id = self.generic_id("state");
                self.append(TimelineItem::State(StateItem {
                    id,
                    timestamp,
                    change: StateChange::Snapshot(snapshot.clone()),
                }));
            }
            EventKind::ArtifactDelta { delta } => {
                let id = self.generic_id("artifact");
                self.append(TimelineItem::Artifact(ArtifactItem {
                    id,
                    timestamp,
                    delta: delta.clone(),
                }));
            }
            EventKind::MessagesSnapshot { messages } => {
                self.append_event(event, "messages-snapshot", messages.clone().into())
            }
            EventKind::StepStarted { step_name } => {
                self.append_event(event, "step-started", step_name.clone().into())
            }
            EventKind::StepFinished { step_name } => {
                self.append_event(event, "step-finished", step_name.clone().into())
            }
            EventKind::Raw { event: raw } => self.append_event(event, "raw", raw.clone()),
            EventKind::Custom { name, value } => self.append_event(event, name, value.clone()),
        }
    }

    pub fn extend<'a>(&mut self, events: impl IntoIterator<Item = &'a CanonicalEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &TimelineItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<TimelineItem> {
        self.items.iter().cloned().collect()
    }

    fn tool_mut(&mut self, tool_call_id: &str) -> Option<&mut ToolItem> {
        let seq = *self.tool_index.get(tool_call_id)?;
        match self.items.get_mut(seq) {
            Some(TimelineItem::Tool(tool)) => Some(tool),
            _ => None,
        }
    }

    fn generic_id(&self, label: &str) -> String {
        format!("{label}-{}", self.items.next_seq())
    }

    fn append_event(&mut self, event: &CanonicalEvent, label: &str, payload: serde_json::Value) {
        let id = self.generic_id("event");
        self.append(TimelineItem::Event(EventItem {
            id,
            timestamp: event.timestamp(),
            label: label.to_string(),
            payload,
        }));
    }

    fn append_tool(&mut self, tool: ToolItem) {
        let seq = self.items.next_seq();
        self.tool_index.insert(tool.id.clone(), seq);
        self.append(TimelineItem::Tool(tool));
    }

    fn append(&mut self, item: TimelineItem) {
        if let Some(TimelineItem::Tool(evicted)) = self.items.push(item) {
            // Only forget the id if it still points at the evicted slot.
            if self
                .tool_index
                .get(&evicted.id)
                .is_some_and(|seq| *seq < self.items.evicted())
            {
                self.tool_index.remove(&evicted.id);
            }
        }
    }
}

/// Fold a full event sequence into its display timeline.
pub fn fold_timeline<'a>(
    events: impl IntoIterator<Item = &'a CanonicalEvent>,
    display_cap: usize,
) -> Vec<TimelineItem> {
    let mut folder = TimelineFolder::new(display_cap);
    folder.extend(events);
    folder.into_items()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use turnweave_core::testing::{
        message_content, state_delta, tool_args, tool_end, tool_result, tool_start,
    };

    fn tool(items: &[TimelineItem], id: &str) -> ToolItem {
        items
            .iter()
            .filter_map(TimelineItem::as_tool)
            .find(|t| t.id == id)
            .cloned()
            .unwrap_or_else(|| panic!("tool {id} missing"))
    }

    #[test]
    fn args_accumulate_across_events() {
        let events = vec![
            tool_start("t1", "search"),
            tool_args("t1", "{\"q\":"),
            tool_args("t1", "\"x\"}"),
        ];
        let items = fold_timeline(&events, 10);
        assert_eq!(items.len(), 1);
        let t1 = tool(&items, "t1");
        assert_eq!(t1.args, "{\"q\":\"x\"}");
        assert_eq!(t1.status, ToolStatus::Running);
    }

    #[test]
    fn args_for_unknown_id_are_dropped() {
        let items = fold_timeline(&[tool_args("ghost", "{}")], 10);
        assert!(items.is_empty());
    }

    #[test]
    fn result_wins_over_later_end() {
        let events = vec![
            tool_start("t1", "search"),
            tool_result("t1", "ok"),
            tool_end("t1"),
        ];
        let t1 = tool(&fold_timeline(&events, 10), "t1");
        assert_eq!(t1.status, ToolStatus::Completed);
        assert_eq!(t1.result.as_deref(), Some("ok"));
    }

    #[test]
    fn end_without_result_marks_done_then_result_completes() {
        let mut folder = TimelineFolder::new(10);
        folder.push(&tool_start("t1", "search"));
        folder.push(&tool_end("t1"));
        assert_eq!(
            folder.items().next().and_then(TimelineItem::as_tool).map(|t| t.status),
            Some(ToolStatus::Done)
        );
        folder.push(&tool_result("t1", "late"));
        assert_eq!(
            folder.items().next().and_then(TimelineItem::as_tool).map(|t| t.status),
            Some(ToolStatus::Completed)
        );
    }

    #[test]
    fn replayed_start_does_not_duplicate() {
        let events = vec![
            tool_start("t1", "search"),
            tool_args("t1", "{}"),
            tool_start("t1", "search"),
        ];
        let items = fold_timeline(&events, 10);
        assert_eq!(items.len(), 1);
        assert_eq!(tool(&items, "t1").args, "{}");
    }

    #[test]
    fn state_deltas_always_append() {
        let events = vec![
            state_delta(json!({"a": 1})),
            state_delta(json!({"a": 2})),
            message_content("m1", "text is not timeline material"),
        ];
        let items = fold_timeline(&events, 10);
        assert_eq!(items.len(), 2);
        assert_ne!(items[0].id(), items[1].id());
        assert!(matches!(items[1], TimelineItem::State(_)));
    }

    #[test]
    fn display_cap_evicts_oldest_and_forgets_evicted_tools() {
        let events = vec![
            tool_start("t1", "first"),
            state_delta(json!({"a": 1})),
            state_delta(json!({"b": 2})),
            tool_args("t1", "{}"),
            tool_result("t1", "late result"),
        ];
        let items = fold_timeline(&events, 2);
        assert_eq!(items.len(), 2);
        // t1 was evicted: args were dropped, the result became a standalone item.
        let t1 = tool(&items, "t1");
        assert_eq!(t1.status, ToolStatus::Completed);
        assert_eq!(t1.args, "");
        assert_eq!(t1.name, "unknown");
    }
}
