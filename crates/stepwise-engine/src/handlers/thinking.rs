use stepwise_core::{AgentEvent, EventType, StepId, StepStatus, StepType};

use super::HEADLINE_THINKING;
use crate::context::{RunContext, event_data};
use crate::registry::EventHandler;

/// Reasoning turns: `llm_started` opens a THINKING step, `llm_ended` closes it.
///
/// Reasoning is serial, so a new turn first completes the previous RUNNING
/// THINKING step. Tool steps are left alone.
pub struct ThinkingHandler;

impl EventHandler for ThinkingHandler {
    fn name(&self) -> &str {
        "thinking"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        matches!(event.event_type, EventType::LlmStarted | EventType::LlmEnded)
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        let mut affected = Vec::new();

        if event.event_type == EventType::LlmStarted {
            if let Some(previous) = ctx.last_running_of(StepType::Thinking) {
                if let Some(step) = ctx.step_mut(previous) {
                    step.complete();
                }
                affected.push(previous);
            }

            let step = ctx.create_step(StepType::Thinking, "Thinking...");
            step.advance(StepStatus::Running);
            step.merge_data(event_data(event));
            affected.push(step.id);
            ctx.set_headline(HEADLINE_THINKING);
            return affected;
        }

        // llm_ended: prefer the open turn, else annotate the latest one.
        let target = ctx
            .last_running_of(StepType::Thinking)
            .or_else(|| ctx.last_of(StepType::Thinking));
        let Some(id) = target else {
            tracing::debug!(source = %event.source, "llm_ended without a reasoning step, dropping");
            return affected;
        };
        if let Some(step) = ctx.step_mut(id) {
            step.complete();
            step.merge_data(event_data(event));
            affected.push(id);
        }
        affected
    }
}
