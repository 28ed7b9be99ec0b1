//! Core event and step model, config, and errors for Stepwise.

pub mod config;
pub mod error;
pub mod event;
pub mod merge;
pub mod payload;
pub mod step;

pub use error::{Result, StepwiseError};
pub use event::{AgentEvent, EventType};
pub use payload::Source;
pub use step::{Step, StepId, StepStatus, StepType, ToolKind};
