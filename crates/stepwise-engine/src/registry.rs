//! Event handler registry.

use std::sync::Arc;

use stepwise_core::{AgentEvent, StepId};

use crate::context::RunContext;
use crate::handlers::{
    CodeInterpreterHandler, GenericToolHandler, HandoffHandler, LifecycleHandler,
    ThinkingHandler, WebSearchHandler,
};

/// Reacts to one family of events by creating or mutating steps.
pub trait EventHandler: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn can_handle(&self, event: &AgentEvent) -> bool;

    /// Apply the event and return the ids of the steps it touched.
    /// Absent payload fields mean "unknown"; handlers never fail.
    fn handle(&self, event: &AgentEvent, ctx: &mut RunContext) -> Vec<StepId>;
}

/// Registered handlers, in registration order.
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// A registry with every built-in handler.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LifecycleHandler));
        registry.register(Arc::new(ThinkingHandler));
        registry.register(Arc::new(GenericToolHandler));
        registry.register(Arc::new(WebSearchHandler));
        registry.register(Arc::new(CodeInterpreterHandler));
        registry.register(Arc::new(HandoffHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(handler = handler.name(), "Registered event handler");
        self.handlers.push(handler);
    }

    /// Every handler that claims `event`, in registration order.
    pub fn dispatch(&self, event: &AgentEvent) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .iter()
            .filter(|h| h.can_handle(event))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
