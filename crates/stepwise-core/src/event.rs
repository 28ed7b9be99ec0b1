//! Canonical agent events as they travel over the bus.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type tag.
///
/// Known tags get their own variant; anything else is carried verbatim in
/// [`EventType::Other`] so custom tools can publish their own events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    AgentStarted,
    AgentEnded,
    AgentHandoff,
    LlmStarted,
    LlmEnded,
    ToolCallDetected,
    ToolStarted,
    ToolEnded,
    ToolWebSearch,
    ToolCodeInterpreter,
    Other(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::AgentStarted => "agent_started",
            Self::AgentEnded => "agent_ended",
            Self::AgentHandoff => "agent_handoff",
            Self::LlmStarted => "llm_started",
            Self::LlmEnded => "llm_ended",
            Self::ToolCallDetected => "tool_call_detected",
            Self::ToolStarted => "tool_started",
            Self::ToolEnded => "tool_ended",
            Self::ToolWebSearch => "tool_web_search",
            Self::ToolCodeInterpreter => "tool_code_interpreter",
            Self::Other(tag) => tag,
        }
    }

    /// Parse a tag, accepting the runtime's `_stream_event` / `_event` suffixed
    /// spellings as aliases of the canonical tags.
    pub fn parse(tag: &str) -> Self {
        let base = tag
            .strip_suffix("_stream_event")
            .or_else(|| tag.strip_suffix("_event"))
            .unwrap_or(tag);
        match base {
            "agent_started" => Self::AgentStarted,
            "agent_ended" => Self::AgentEnded,
            "agent_handoff" => Self::AgentHandoff,
            "llm_started" => Self::LlmStarted,
            "llm_ended" => Self::LlmEnded,
            "tool_call_detected" => Self::ToolCallDetected,
            "tool_started" => Self::ToolStarted,
            "tool_ended" => Self::ToolEnded,
            "tool_web_search" => Self::ToolWebSearch,
            "tool_code_interpreter" => Self::ToolCodeInterpreter,
            _ => Self::Other(tag.to_string()),
        }
    }

    /// Hosted-tool results that surface no matter which agent produced them.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::ToolWebSearch | Self::ToolCodeInterpreter)
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        event_type.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable record of something the agent runtime did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub event_type: EventType,
    /// Name of the agent that emitted the event.
    pub source: String,
    /// Correlates a tool invocation's start and end events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl AgentEvent {
    pub fn new(event_type: impl Into<EventType>, source: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
            span_id: None,
            timestamp: Utc::now(),
            data: Map::new(),
        }
    }

    pub fn with_span(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Replace the payload. Non-object values are ignored.
    pub fn with_data(mut self, data: Value) -> Self {
        if let Value::Object(map) = data {
            self.data = map;
        }
        self
    }

    /// Build an event from a typed payload.
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => self.data = map,
            Ok(_) => {}
            Err(e) => tracing::debug!(%e, "Payload did not serialize to an object"),
        }
        self
    }

    /// Decode the payload into its canonical shape.
    ///
    /// Absent fields take their defaults; a payload whose fields have the wrong
    /// JSON types decodes to `T::default()` rather than failing.
    pub fn payload<T: DeserializeOwned + Default>(&self) -> T {
        serde_json::from_value(Value::Object(self.data.clone())).unwrap_or_else(|e| {
            tracing::debug!(event_type = %self.event_type, %e, "Malformed payload, using defaults");
            T::default()
        })
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}
