use stepwise_core::payload::HandoffPayload;
use stepwise_core::{AgentEvent, EventType, StepId, StepType};

use crate::context::{RunContext, payload_map};
use crate::registry::EventHandler;

/// Delegation from the main agent to another agent, shown as a MESSAGE step.
pub struct HandoffHandler;

impl EventHandler for HandoffHandler {
    fn name(&self) -> &str {
        "handoff"
    }

    fn can_handle(&self, event: &AgentEvent) -> bool {
        event.event_type == EventType::AgentHandoff
    }

    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId> {
        let payload: HandoffPayload = event.payload();
        let to = payload.to_agent.as_deref().unwrap_or("another agent");
        let title = format!("Handing off to {to}");

        let step = ctx.create_step(StepType::Message, title);
        step.merge_data(payload_map(&payload));
        step.complete();
        vec![step.id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_core::StepStatus;

    #[test]
    fn test_handoff_message() {
        let mut ctx = RunContext::default();
        let event = AgentEvent::new(EventType::AgentHandoff, "Manager")
            .with_data(json!({"from_agent": "Manager", "to_agent": "Executor"}));
        HandoffHandler.handle(&event, &mut ctx);

        let step = &ctx.steps()[0];
        assert_eq!(step.step_type, StepType::Message);
        assert_eq!(step.title, "Handing off to Executor");
        assert_eq!(step.status, StepStatus::Completed);
    }

    #[test]
    fn test_handoff_without_target() {
        let mut ctx = RunContext::default();
        HandoffHandler.handle(&AgentEvent::new(EventType::AgentHandoff, "Manager"), &mut ctx);
        assert_eq!(ctx.steps()[0].title, "Handing off to another agent");
    }
}
