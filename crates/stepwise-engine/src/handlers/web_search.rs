use serde_json::json;
use stepwise_core::payload::{WebSearchPayload, dedup_sources};
use stepwise_core::{AgentEvent, EventType, StepId, StepType, ToolKind};

use crate::context::{RunContext, payload_map};
use crate::registry::EventHandler;

/// Hosted web search. Arrives as one self-contained event, so the step is
/// created already COMPLETED. Later fragments carrying the same call id
/// merge their sources into it.
pub struct WebSearchHandler;

impl EventHandler for WebSearchHandler {
    fn name(&self) -> &str {
        "web_search"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        event.event_type == EventType::ToolWebSearch
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        let mut payload: WebSearchPayload = event.payload();
        payload.sources = dedup_sources(payload.sources);

        let existing = payload.call_id.as_deref().and_then(|call_id| {
            ctx.find_tool_step(|s| {
                s.tool_kind() == Some(ToolKind::WebSearch) && s.call_id() == Some(call_id)
            })
        });
        if let Some(id) = existing {
            if let Some(step) = ctx.step_mut(id) {
                step.merge_data(payload_map(&payload));
                step.complete();
            }
            return vec![id];
        }

        let mut data = payload_map(&payload);
        data.insert("tool_type".into(), json!(ToolKind::WebSearch.as_str()));
        data.insert("tool_name".into(), json!("web_search"));

        let title = ctx.tool_title("search_web");
        let step = ctx.create_step(StepType::Tool, title);
        step.merge_data(data);
        step.complete();
        vec![step.id]
    }
}
