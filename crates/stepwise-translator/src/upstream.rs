//! Runtime event shapes, as emitted by the agent runtime's lifecycle hooks.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use stepwise_core::Source;
use stepwise_core::payload::Usage;

/// One lifecycle callback from the agent runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamEvent {
    AgentStart {
        agent: String,
    },
    AgentEnd {
        agent: String,
        #[serde(default)]
        output: Option<Value>,
    },
    Handoff {
        from: String,
        to: String,
    },
    LlmStart {
        agent: String,
    },
    LlmEnd {
        agent: String,
        #[serde(default)]
        response: ModelResponse,
    },
    ToolStart {
        agent: String,
        #[serde(default)]
        tool: ToolRef,
        #[serde(default)]
        span_id: Option<String>,
    },
    ToolEnd {
        agent: String,
        #[serde(default)]
        tool: ToolRef,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        span_id: Option<String>,
    },
    /// Events emitted directly by tools (e.g. a random number tool reporting its draw).
    Custom {
        source: String,
        event_type: String,
        #[serde(default)]
        span_id: Option<String>,
        #[serde(default)]
        data: Map<String, Value>,
    },
}

/// A tool reference: either a bare name or a described tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolRef {
    Name(String),
    Described {
        #[serde(default)]
        name: Option<String>,
        #[serde(default, rename = "type")]
        tool_type: Option<String>,
    },
}

impl Default for ToolRef {
    fn default() -> Self {
        Self::Described {
            name: None,
            tool_type: None,
        }
    }
}

impl ToolRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Described { name, .. } => name.as_deref(),
        }
    }

    pub fn tool_type(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Described { tool_type, .. } => tool_type.as_deref(),
        }
    }
}

/// The model response attached to an `llm_end` callback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
        #[serde(default)]
        call_id: Option<String>,
    },
    WebSearchCall {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        action: Option<SearchAction>,
    },
    CodeInterpreterCall {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        outputs: Vec<CodeOutput>,
        #[serde(default)]
        status: Option<String>,
    },
    Reasoning {
        #[serde(default)]
        summary: Vec<SummaryText>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Annotation {
    UrlCitation {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchAction {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub sources: Vec<RawSource>,
}

/// Search sources arrive either as bare URLs or as `{url, title}` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSource {
    Url(String),
    Entry {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

impl From<RawSource> for Source {
    fn from(raw: RawSource) -> Self {
        match raw {
            RawSource::Url(url) => Source::new(url),
            RawSource::Entry { url, title } => Source { url, title },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CodeOutput {
    Logs { logs: String },
    Image { url: String },
}

impl CodeOutput {
    /// Logs become plain strings; images keep a typed object.
    pub fn into_value(self) -> Value {
        match self {
            Self::Logs { logs } => Value::String(logs),
            Self::Image { url } => serde_json::json!({ "type": "image", "url": url }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryText {
    pub text: String,
}
