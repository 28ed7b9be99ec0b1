use serde_json::json;
use stepwise_core::payload::CodeInterpreterPayload;
use stepwise_core::{AgentEvent, EventType, StepId, StepStatus, StepType, ToolKind};

use crate::context::{RunContext, payload_map};
use crate::registry::EventHandler;

/// Hosted code execution.
///
/// The call opens a RUNNING step; output may follow on a correlated
/// `tool_ended` or on later fragments with the same call id. A fragment
/// reporting `status: "completed"` with output completes the step.
pub struct CodeInterpreterHandler;

impl EventHandler for CodeInterpreterHandler {
    fn name(&self) -> &str {
        "code_interpreter"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        event.event_type == EventType::ToolCodeInterpreter
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        let payload: CodeInterpreterPayload = event.payload();
        let completed = payload.is_completed();

        let existing = payload.call_id.as_deref().and_then(|call_id| {
            ctx.find_tool_step(|s| {
                s.tool_kind() == Some(ToolKind::CodeInterpreter) && s.call_id() == Some(call_id)
            })
        });
        if let Some(id) = existing {
            if let Some(step) = ctx.step_mut(id) {
                step.merge_data(payload_map(&payload));
                if completed {
                    step.complete();
                }
            }
            return vec![id];
        }

        // Never take a span another RUNNING step still owns.
        let span = event
            .span_id
            .clone()
            .filter(|span| ctx.find_running_by_span(span).is_none());

        let mut data = payload_map(&payload);
        data.insert("tool_type".into(), json!(ToolKind::CodeInterpreter.as_str()));
        data.insert("tool_name".into(), json!("code_interpreter"));
        data.entry("outputs").or_insert_with(|| json!([]));

        let title = ctx.tool_title("code_interpreter");
        let step = ctx.create_step(StepType::Tool, title);
        step.advance(StepStatus::Running);
        step.span_id = span;
        step.merge_data(data);
        if completed {
            step.complete();
        }
        vec![step.id]
    }
}
