use serde_json::{Value, json};
use stepwise_core::merge::append_unique;
use stepwise_core::payload::{ToolCallPayload, ToolEndPayload, ToolStartPayload};
use stepwise_core::{AgentEvent, EventType, StepId, StepStatus, StepType, ToolKind};
use tracing::{debug, warn};

use crate::context::{RunContext, payload_map};
use crate::registry::EventHandler;
use crate::title::UNKNOWN_TOOL;

/// Two-phase tool lifecycle: `tool_call_detected` → `tool_started` → `tool_ended`.
///
/// Steps are correlated by span id. Several tool steps may be RUNNING at
/// once; opening one never touches another.
pub struct GenericToolHandler;

impl EventHandler for GenericToolHandler {
    fn name(&self) -> &str {
        "generic_tool"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        matches!(
            event.event_type,
            EventType::ToolCallDetected | EventType::ToolStarted | EventType::ToolEnded
        )
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        match event.event_type {
            EventType::ToolCallDetected => on_detected(event, ctx),
            EventType::ToolStarted => on_started(event, ctx),
            EventType::ToolEnded => on_ended(event, ctx),
            _ => Vec::new(),
        }
    }
}

fn on_detected(event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
    let mut payload: ToolCallPayload = event.payload();
    let tool_name = payload
        .tool_name
        .take()
        .unwrap_or_else(|| UNKNOWN_TOOL.to_string());
    let title = ctx.tool_title(&tool_name);

    let mut data = payload_map(&payload);
    data.insert("tool_type".into(), json!(ToolKind::Generic.as_str()));
    data.insert("tool_name".into(), json!(tool_name));

    let step = ctx.create_step(StepType::Tool, title);
    step.merge_data(data);
    vec![step.id]
}

fn on_started(event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
    let payload: ToolStartPayload = event.payload();
    let tool_name = payload
        .tool_name
        .clone()
        .unwrap_or_else(|| UNKNOWN_TOOL.to_string());
    let kind = payload
        .tool_type
        .as_deref()
        .map_or(ToolKind::Generic, ToolKind::parse);
    let span = event.span_id.as_deref();

    // A span already owned by a RUNNING step is a repeat, not a new call.
    if let Some(owner) = span.and_then(|s| ctx.find_running_by_span(s)) {
        debug!(span = ?span, step = %owner, "tool_started for an owned span, merging");
        if let Some(step) = ctx.step_mut(owner) {
            step.merge_data(payload_map(&payload));
        }
        return vec![owner];
    }

    // The hosted code interpreter announces itself before the runtime does.
    let is_code = kind == ToolKind::CodeInterpreter || tool_name == "code_interpreter";
    if is_code {
        let absorbing = ctx.last_step().filter(|last| {
            last.is_running()
                && last.span_id.is_none()
                && last.tool_kind() == Some(ToolKind::CodeInterpreter)
        });
        if let Some(id) = absorbing.map(|s| s.id) {
            if let Some(step) = ctx.step_mut(id) {
                step.span_id = span.map(str::to_string);
            }
            return vec![id];
        }
    }

    if let Some(pending) = ctx.find_pending_tool(&tool_name) {
        let Some(step) = ctx.step_mut(pending) else {
            return Vec::new();
        };
        step.advance(StepStatus::Running);
        step.span_id = span.map(str::to_string);
        let title = step.title.clone();
        ctx.set_headline(title);
        return vec![pending];
    }

    let title = ctx.tool_title(&tool_name);
    let mut data = payload_map(&payload);
    data.insert("tool_type".into(), json!(kind.as_str()));
    data.insert("tool_name".into(), json!(tool_name));

    let step = ctx.create_step(StepType::Tool, title.clone());
    step.advance(StepStatus::Running);
    step.span_id = span.map(str::to_string);
    step.merge_data(data);
    let id = step.id;
    ctx.set_headline(title);
    vec![id]
}

fn on_ended(event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
    let payload: ToolEndPayload = event.payload();

    let matched = event
        .span_id
        .as_deref()
        .and_then(|span| ctx.find_running_by_span(span));
    let target = match matched {
        Some(id) => Some(id),
        None => fallback_target(event, ctx),
    };
    let Some(id) = target else {
        debug!(span = ?event.span_id, source = %event.source, "tool_ended matched no running step, dropping");
        return Vec::new();
    };
    let Some(step) = ctx.step_mut(id) else {
        return Vec::new();
    };

    if payload.is_error {
        step.fail();
    } else {
        step.complete();
    }

    let result = payload.result.clone();
    let mut data = payload_map(&payload);
    // The tool name on the step came from the call; keep it.
    data.remove("tool_name");
    step.merge_data(data);

    let result = result.filter(|r| !r.is_null());
    if let (Some(ToolKind::CodeInterpreter), Some(result)) = (step.tool_kind(), result) {
        let outputs = step
            .data
            .entry("outputs")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !outputs.is_array() {
            *outputs = Value::Array(Vec::new());
        }
        if let Value::Array(items) = outputs {
            append_unique(items, [result]);
        }
    }

    vec![id]
}

/// Degraded correlation: without a usable span, the most recent RUNNING tool
/// step takes the result. With several tools running this can pick the wrong
/// one, which is why it is logged louder.
fn fallback_target(event: &AgentEvent, ctx: &RunContext) -> Option<StepId> {
    let candidate = ctx.last_running_of(StepType::Tool)?;
    let running = ctx.running_tool_count();
    if running > 1 {
        warn!(
            span = ?event.span_id,
            step = %candidate,
            running,
            "tool_ended without a matching span while several tools are running; attributing to the most recent"
        );
    } else {
        debug!(span = ?event.span_id, step = %candidate, "tool_ended correlated by fallback");
    }
    Some(candidate)
}
