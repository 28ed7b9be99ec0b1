//! The step engine: filter, dispatch, collect the delta.

use std::sync::Arc;

use serde::Serialize;
use stepwise_core::config::EngineConfig;
use stepwise_core::{AgentEvent, EventType, Step, StepId};
use tracing::{debug, info};

use crate::context::RunContext;
use crate::registry::{EventHandler, HandlerRegistry};

/// Steps created or mutated by one event, each listed once in the order
/// it was first touched.
#[derive(Debug, Clone, Serialize)]
pub struct StepDelta {
    pub event_type: EventType,
    pub steps: Vec<Step>,
}

impl StepDelta {
    fn empty(event_type: EventType) -> Self {
        Self {
            event_type,
            steps: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Processes one event at a time against a single [`RunContext`].
pub struct StepEngine {
    registry: HandlerRegistry,
    context: RunContext,
}

impl StepEngine {
    /// An engine with the built-in handlers.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_registry(HandlerRegistry::with_defaults(), config)
    }

    pub fn with_registry(registry: HandlerRegistry, config: &EngineConfig) -> Self {
        Self {
            registry,
            context: RunContext::new(config.tool_titles.clone()),
        }
    }

    /// Add a handler after the built-ins.
    pub fn register_handler(&mut self, handler: Arc<dyn EventHandler>) {
        self.registry.register(handler);
    }

    pub fn steps(&self) -> &[Step] {
        self.context.steps()
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn headline(&self) -> &str {
        self.context.headline()
    }

    /// Discard the current run.
    pub fn reset(&mut self) {
        self.context.reset();
    }

    /// Apply one event and return the steps it created or mutated.
    ///
    /// Unroutable and filtered events produce an empty delta; nothing here
    /// fails.
    pub fn process(&mut self, event: &AgentEvent) -> StepDelta {
        let event_type = event.event_type.clone();

        if self.context.has_finished() {
            // Only the main agent starting over begins a new run; a late
            // sub-agent start must not wipe the finished one.
            let restart = event_type == EventType::AgentStarted
                && self
                    .context
                    .main_agent()
                    .is_none_or(|main| main == event.source);
            if !restart {
                debug!(%event_type, source = %event.source, "Run finished, dropping event");
                return StepDelta::empty(event_type);
            }
            info!(
                previous_run = %self.context.run_id(),
                agent = %event.source,
                "New run after finish, resetting"
            );
            self.context.reset();
        }

        let foreign = self
            .context
            .main_agent()
            .is_some_and(|main| event.source != main);
        if foreign && !event_type.is_global() {
            debug!(
                %event_type,
                source = %event.source,
                main_agent = ?self.context.main_agent(),
                "Dropping sub-agent event"
            );
            return StepDelta::empty(event_type);
        }

        let handlers = self.registry.dispatch(event);
        if handlers.is_empty() {
            debug!(%event_type, "No handler for event");
            return StepDelta::empty(event_type);
        }

        let mut touched: Vec<StepId> = Vec::new();
        for handler in handlers {
            for id in handler.handle(event, &mut self.context) {
                if !touched.contains(&id) {
                    touched.push(id);
                }
            }
        }

        let steps = touched
            .into_iter()
            .filter_map(|id| self.context.step(id).cloned())
            .collect();
        StepDelta { event_type, steps }
    }
}

impl Default for StepEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
