//! Renderer registry: picks how each step is presented.
//!
//! Renderers turn a [`Step`] into a presentation-neutral [`StepView`]. The
//! [`RendererRegistry`] resolves the highest-priority renderer that claims a
//! step; the generic tool renderer sits at the bottom and claims every TOOL
//! step.

use std::sync::Arc;

use stepwise_core::Step;
use stepwise_core::config::EngineConfig;

pub mod renderers;
pub mod view;

pub use renderers::{
    CodeInterpreterRenderer, FinishedRenderer, GenericToolRenderer, MessageRenderer,
    ThinkingRenderer, WebSearchRenderer,
};
pub use view::{LinkView, SectionBody, StepView, ViewSection, format_view};

pub const PRIORITY_THINKING: i32 = 100;
pub const PRIORITY_FINISHED: i32 = 100;
pub const PRIORITY_WEB_SEARCH: i32 = 90;
pub const PRIORITY_CODE_INTERPRETER: i32 = 90;
pub const PRIORITY_MESSAGE: i32 = 50;
pub const PRIORITY_GENERIC_TOOL: i32 = 10;

/// Presentation strategy for one shape of step.
pub trait StepRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn can_handle(&self, step: &Step) -> bool;

    fn render(&self, step: &Step) -> StepView;
}

/// Renderers ordered by priority, highest first. Equal priorities keep
/// registration order.
pub struct RendererRegistry {
    renderers: Vec<(i32, Arc<dyn StepRenderer>)>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self {
            renderers: Vec::new(),
        }
    }

    /// A registry with every built-in renderer.
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ThinkingRenderer), PRIORITY_THINKING);
        registry.register(Arc::new(WebSearchRenderer), PRIORITY_WEB_SEARCH);
        registry.register(
            Arc::new(CodeInterpreterRenderer),
            PRIORITY_CODE_INTERPRETER,
        );
        registry.register(Arc::new(FinishedRenderer), PRIORITY_FINISHED);
        registry.register(Arc::new(MessageRenderer), PRIORITY_MESSAGE);
        registry.register(
            Arc::new(GenericToolRenderer::new(config.clone())),
            PRIORITY_GENERIC_TOOL,
        );
        registry
    }

    pub fn register(&mut self, renderer: Arc<dyn StepRenderer>, priority: i32) {
        tracing::debug!(renderer = renderer.name(), priority, "Registered step renderer");
        self.renderers.push((priority, renderer));
        // Stable sort: ties stay in registration order.
        self.renderers.sort_by_key(|(p, _)| std::cmp::Reverse(*p));
    }

    /// The highest-priority renderer that claims `step`.
    pub fn resolve(&self, step: &Step) -> Option<Arc<dyn StepRenderer>> {
        self.renderers
            .iter()
            .find(|(_, r)| r.can_handle(step))
            .map(|(_, r)| Arc::clone(r))
    }

    /// Render with the resolved renderer, or a bare "Unknown step" view.
    pub fn render(&self, step: &Step) -> StepView {
        match self.resolve(step) {
            Some(renderer) => renderer.render(step),
            None => {
                tracing::debug!(step = %step.id, step_type = ?step.step_type, "No renderer for step");
                StepView::new(step.id, "Unknown step", "unknown", step.status)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}
