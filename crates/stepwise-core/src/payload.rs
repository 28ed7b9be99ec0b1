//! Canonical payload shapes per event type.
//!
//! These are the field names the step engine reads from `AgentEvent::data`.
//! Every field is optional or defaulted: a missing field means "unknown".
//! Fields decode independently, so one wrong-typed field drops only itself.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Per-field decoders that turn a wrong-typed value into "absent".
mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::Source;

    pub fn field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => Ok(serde_json::from_value(value).ok()),
        }
    }

    /// Call ids arrive as strings or, from some runtimes, as numbers.
    pub fn id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(id) => Some(id),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    pub fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
    }

    pub fn list<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            _ => Vec::new(),
        })
    }

    /// Sources as `{url, title}` objects or bare URL strings. Entries without
    /// a usable url are skipped one by one.
    pub fn sources<'de, D>(deserializer: D) -> Result<Vec<Source>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Value::Array(items) = Value::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(url) => Some(Source::new(url)),
                other => serde_json::from_value::<Source>(other).ok(),
            })
            .filter(|source| !source.url.is_empty())
            .collect())
    }
}

/// A citation or search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(
        default,
        deserialize_with = "lenient::field",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
}

impl Source {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
        }
    }

    pub fn titled(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: Some(title.into()),
        }
    }
}

/// Keep the first occurrence of each URL, preserving insertion order.
pub fn dedup_sources(sources: impl IntoIterator<Item = Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|s| seen.insert(s.url.clone()))
        .collect()
}

/// `tool_call_detected`: the model decided to call a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolCallPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
    #[serde(
        deserialize_with = "lenient::id",
        alias = "tool_call_id",
        skip_serializing_if = "Option::is_none",
    )]
    pub call_id: Option<String>,
}

/// `tool_started`: the runtime began executing a tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStartPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
}

/// `tool_ended`: a tool finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolEndPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

/// `tool_web_search`: a hosted web search and the sources it surfaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(deserialize_with = "lenient::sources")]
    pub sources: Vec<Source>,
    #[serde(
        deserialize_with = "lenient::id",
        alias = "tool_call_id",
        skip_serializing_if = "Option::is_none",
    )]
    pub call_id: Option<String>,
}

/// `tool_code_interpreter`: hosted code execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeInterpreterPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub outputs: Vec<Value>,
    #[serde(
        deserialize_with = "lenient::id",
        alias = "tool_call_id",
        skip_serializing_if = "Option::is_none",
    )]
    pub call_id: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl CodeInterpreterPayload {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("completed") && !self.outputs.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// `llm_ended`: a reasoning turn finished.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmEndPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Reasoning summary, when the model exposes one.
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    /// URL citations found in the response text.
    #[serde(
        deserialize_with = "lenient::sources",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub citations: Vec<Source>,
}

/// `agent_handoff`: control moved from one agent to another.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoffPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub from_agent: Option<String>,
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub to_agent: Option<String>,
}

/// `agent_ended`: the agent produced its final output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEndPayload {
    #[serde(deserialize_with = "lenient::field", skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
}
