//! Event translator: the boundary between the agent runtime and the step engine.
//!
//! Runtime callbacks arrive as [`UpstreamEvent`]s. [`translate`] maps each
//! one onto zero or more canonical [`AgentEvent`]s whose `data` follows the
//! payload shapes in [`stepwise_core::payload`]. Nothing downstream of this
//! crate looks at runtime shapes.

pub mod translate;
pub mod upstream;

pub use translate::{decode_line, translate, translate_json};
pub use upstream::{ModelResponse, OutputItem, ToolRef, UpstreamEvent};
