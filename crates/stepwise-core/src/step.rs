//! Steps: the observable units of run progress.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::merge::merge_data;

/// Step identifier, unique and increasing within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub u64);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step_{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Thinking,
    Tool,
    Message,
    Error,
    Finished,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Tool subtype stored at `data.tool_type`. Used to pick a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Generic,
    WebSearch,
    CodeInterpreter,
}

impl ToolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::WebSearch => "web_search",
            Self::CodeInterpreter => "code_interpreter",
        }
    }

    /// Unrecognized subtypes render as generic tools.
    pub fn parse(tool_type: &str) -> Self {
        match tool_type {
            "web_search" => Self::WebSearch,
            "code_interpreter" => Self::CodeInterpreter,
            _ => Self::Generic,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    #[serde(rename = "type")]
    pub step_type: StepType,
    pub title: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Step {
    pub fn new(id: StepId, step_type: StepType, title: impl Into<String>) -> Self {
        Self {
            id,
            step_type,
            title: title.into(),
            status: StepStatus::Pending,
            span_id: None,
            data: Map::new(),
        }
    }

    /// Move the status forward. Returns `false` (and leaves the step alone)
    /// for backward moves, no-op moves, and moves out of a terminal state.
    pub fn advance(&mut self, next: StepStatus) -> bool {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            tracing::trace!(step = %self.id, from = ?self.status, to = ?next, "Refused status move");
            return false;
        }
        self.status = next;
        true
    }

    /// Bring a non-terminal step to COMPLETED. Returns whether it changed.
    pub fn complete(&mut self) -> bool {
        self.advance(StepStatus::Completed)
    }

    pub fn fail(&mut self) -> bool {
        self.advance(StepStatus::Failed)
    }

    pub fn is_running(&self) -> bool {
        self.status == StepStatus::Running
    }

    pub fn merge_data(&mut self, incoming: Map<String, Value>) {
        merge_data(&mut self.data, incoming);
    }

    pub fn tool_kind(&self) -> Option<ToolKind> {
        if self.step_type != StepType::Tool {
            return None;
        }
        let tool_type = self.data.get("tool_type").and_then(Value::as_str);
        Some(tool_type.map_or(ToolKind::Generic, ToolKind::parse))
    }

    pub fn tool_name(&self) -> Option<&str> {
        self.data.get("tool_name").and_then(Value::as_str)
    }

    pub fn call_id(&self) -> Option<&str> {
        self.data.get("call_id").and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_step() -> Step {
        Step::new(StepId(1), StepType::Tool, "Executing random_number")
    }

    #[test]
    fn test_status_moves_forward_only() {
        let mut step = tool_step();
        assert!(step.advance(StepStatus::Running));
        assert!(!step.advance(StepStatus::Pending));
        assert!(!step.advance(StepStatus::Running));
        assert!(step.complete());
        assert_eq!(step.status, StepStatus::Completed);
    }

    #[test]
    fn test_terminal_states_absorb() {
        let mut step = tool_step();
        step.advance(StepStatus::Running);
        assert!(step.fail());
        assert!(!step.complete());
        assert_eq!(step.status, StepStatus::Failed);
    }

    #[test]
    fn test_pending_can_complete_directly() {
        let mut step = tool_step();
        assert!(step.complete());
    }

    #[test]
    fn test_tool_kind_defaults_to_generic() {
        let mut step = tool_step();
        assert_eq!(step.tool_kind(), Some(ToolKind::Generic));
        step.data.insert("tool_type".into(), json!("web_search"));
        assert_eq!(step.tool_kind(), Some(ToolKind::WebSearch));

        let thinking = Step::new(StepId(2), StepType::Thinking, "Thinking...");
        assert_eq!(thinking.tool_kind(), None);
    }

    #[test]
    fn test_step_serialization() {
        let mut step = tool_step();
        step.span_id = Some("span_a".into());
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["id"], 1);
        assert_eq!(value["type"], "tool");
        assert_eq!(value["status"], "pending");
        assert_eq!(value["span_id"], "span_a");
        assert_eq!(StepId(3).to_string(), "step_3");
    }
}
