//! Built-in event handlers.

mod code_interpreter;
mod generic_tool;
mod handoff;
mod lifecycle;
mod thinking;
mod web_search;

pub use code_interpreter::CodeInterpreterHandler;
pub use generic_tool::GenericToolHandler;
pub use handoff::HandoffHandler;
pub use lifecycle::LifecycleHandler;
pub use thinking::ThinkingHandler;
pub use web_search::WebSearchHandler;

pub const HEADLINE_WORKING: &str = "Agent working...";
pub const HEADLINE_THINKING: &str = "Thinking...";
pub const HEADLINE_FINISHED: &str = "Agent finished";
