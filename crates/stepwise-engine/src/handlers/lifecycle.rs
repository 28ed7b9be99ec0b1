use stepwise_core::{AgentEvent, EventType, StepId, StepType};
use tracing::{debug, info};

use super::{HEADLINE_FINISHED, HEADLINE_WORKING};
use crate::context::{RunContext, event_data};
use crate::registry::EventHandler;

/// Run start and end.
///
/// The first `agent_started` names the main agent. The main agent's
/// `agent_ended` closes every open step and appends the single FINISHED step.
pub struct LifecycleHandler;

impl EventHandler for LifecycleHandler {
    fn name(&self) -> &str {
        "lifecycle"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        matches!(
            event.event_type,
            EventType::AgentStarted | EventType::AgentEnded
        )
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        if event.event_type == EventType::AgentStarted {
            if ctx.main_agent().is_none() {
                ctx.set_main_agent(event.source.clone());
                ctx.set_headline(HEADLINE_WORKING);
                info!(agent = %event.source, run_id = %ctx.run_id(), "Run started");
            }
            return Vec::new();
        }

        if ctx.has_finished() {
            debug!(agent = %event.source, "Run already finished, ignoring agent_ended");
            return Vec::new();
        }
        match ctx.main_agent() {
            Some(main) if main != event.source => return Vec::new(),
            Some(_) => {}
            None => ctx.set_main_agent(event.source.clone()),
        }

        let mut affected = Vec::new();
        for id in ctx.open_steps() {
            if ctx.step_mut(id).is_some_and(|step| step.complete()) {
                affected.push(id);
            }
        }

        let step = ctx.create_step(StepType::Finished, "Finished");
        step.merge_data(event_data(event));
        step.complete();
        affected.push(step.id);

        ctx.set_headline(HEADLINE_FINISHED);
        info!(
            agent = %event.source,
            run_id = %ctx.run_id(),
            steps = ctx.steps().len(),
            "Run finished"
        );
        affected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_core::StepStatus;

    fn start(ctx: &mut RunContext) {
        LifecycleHandler.handle(&AgentEvent::new(EventType::AgentStarted, "Manager"), ctx);
    }

    #[test]
    fn test_first_start_names_main_agent() {
        let mut ctx = RunContext::default();
        start(&mut ctx);
        LifecycleHandler.handle(&AgentEvent::new(EventType::AgentStarted, "Executor"), &mut ctx);
        assert_eq!(ctx.main_agent(), Some("Manager"));
        assert_eq!(ctx.headline(), "Agent working...");
        assert!(ctx.steps().is_empty());
    }

    #[test]
    fn test_end_finalizes_open_steps() {
        let mut ctx = RunContext::default();
        start(&mut ctx);
        let running = ctx.create_step(StepType::Tool, "Executing a");
        running.advance(StepStatus::Running);
        ctx.create_step(StepType::Tool, "Executing b");

        let end = AgentEvent::new(EventType::AgentEnded, "Manager")
            .with_data(json!({"output": "All done"}));
        let affected = LifecycleHandler.handle(&end, &mut ctx);

        assert_eq!(affected, vec![StepId(1), StepId(2), StepId(3)]);
        assert!(ctx.steps().iter().all(|s| s.status == StepStatus::Completed));
        let finished = &ctx.steps()[2];
        assert_eq!(finished.step_type, StepType::Finished);
        assert_eq!(finished.data["output"], "All done");
        assert_eq!(ctx.headline(), "Agent finished");
    }

    #[test]
    fn test_second_end_is_ignored() {
        let mut ctx = RunContext::default();
        start(&mut ctx);
        let end = AgentEvent::new(EventType::AgentEnded, "Manager");
        LifecycleHandler.handle(&end, &mut ctx);
        assert!(LifecycleHandler.handle(&end, &mut ctx).is_empty());
        let finished = ctx
            .steps()
            .iter()
            .filter(|s| s.step_type == StepType::Finished)
            .count();
        assert_eq!(finished, 1);
    }

    #[test]
    fn test_sub_agent_end_does_not_finish() {
        let mut ctx = RunContext::default();
        start(&mut ctx);
        LifecycleHandler.handle(&AgentEvent::new(EventType::AgentEnded, "Executor"), &mut ctx);
        assert!(!ctx.has_finished());
    }
}
