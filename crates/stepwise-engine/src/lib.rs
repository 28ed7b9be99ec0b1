//! Step engine: turns the agent event stream into an ordered list of steps.
//!
//! [`StepEngine::process`] takes one canonical event at a time, filters it
//! against the run's main agent, dispatches it to every matching
//! [`EventHandler`], and returns the [`StepDelta`] of steps it created or
//! mutated. Handlers share a [`RunContext`] that owns the step list.

pub mod context;
pub mod engine;
pub mod handlers;
pub mod registry;
pub mod subscriber;
pub mod title;

pub use context::RunContext;
pub use engine::{StepDelta, StepEngine};
pub use registry::{EventHandler, HandlerRegistry};
pub use subscriber::EngineSubscriber;
pub use title::{UNKNOWN_TOOL, resolve_tool_title};
