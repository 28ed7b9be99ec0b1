//! Built-in step renderers.

use serde_json::Value;
use stepwise_core::config::EngineConfig;
use stepwise_core::payload::Source;
use stepwise_core::{Step, StepStatus, StepType, ToolKind};

use crate::StepRenderer;
use crate::view::{LinkView, SectionBody, StepView};

fn str_field<'a>(step: &'a Step, key: &str) -> Option<&'a str> {
    step.data
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Sources stored as `{url, title}` objects or bare URL strings.
fn links(value: Option<&Value>) -> Vec<LinkView> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(LinkView::new(url.clone(), None)),
            other => serde_json::from_value::<Source>(other.clone())
                .ok()
                .map(|s| LinkView::new(s.url, s.title.as_deref())),
        })
        .collect()
}

/// Strings as-is, everything else as pretty JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Show tool arguments as a function call: `name(\n  {..}\n)`.
pub fn format_call(tool_name: &str, arguments: &Value) -> String {
    let parsed = match arguments {
        Value::String(raw) => serde_json::from_str::<Value>(raw).ok(),
        Value::Object(_) | Value::Array(_) => Some(arguments.clone()),
        _ => None,
    };
    match parsed.and_then(|v| serde_json::to_string_pretty(&v).ok()) {
        Some(pretty) => format!("{tool_name}(\n  {}\n)", pretty.replace('\n', "\n  ")),
        None => format!("{tool_name}({})", display_value(arguments)),
    }
}

pub struct ThinkingRenderer;

impl StepRenderer for ThinkingRenderer {
    fn name(&self) -> &str {
        "thinking"
    }

    fn can_handle(&self, step: &Step) -> bool {
        step.step_type == StepType::Thinking
    }

    fn render(&self, step: &Step) -> StepView {
        let mut view = StepView::new(step.id, &step.title, "thinking", step.status);
        if let Some(reasoning) = str_field(step, "reasoning") {
            view = view.section("Reasoning", SectionBody::text(reasoning));
        }
        let citations = links(step.data.get("citations"));
        if !citations.is_empty() {
            view = view.section("Citations", SectionBody::Links { links: citations });
        }
        view
    }
}

pub struct FinishedRenderer;

impl StepRenderer for FinishedRenderer {
    fn name(&self) -> &str {
        "finished"
    }

    fn can_handle(&self, step: &Step) -> bool {
        step.step_type == StepType::Finished
    }

    fn render(&self, step: &Step) -> StepView {
        let mut view = StepView::new(step.id, "Task Completed", "finished", step.status);
        view.final_marker = true;
        if let Some(output) = step.data.get("output").filter(|v| !v.is_null()) {
            view = view.section("Result", SectionBody::text(display_value(output)));
        }
        view
    }
}

pub struct WebSearchRenderer;

impl StepRenderer for WebSearchRenderer {
    fn name(&self) -> &str {
        "web_search"
    }

    fn can_handle(&self, step: &Step) -> bool {
        step.tool_kind() == Some(ToolKind::WebSearch)
    }

    fn render(&self, step: &Step) -> StepView {
        let query = str_field(step, "query").unwrap_or("Searching...");
        let mut view = StepView::new(step.id, &step.title, "search", step.status)
            .section("Query", SectionBody::text(query));

        let sources = links(step.data.get("sources"));
        if !sources.is_empty() {
            view = view.section(
                format!("Reviewing sources ({})", sources.len()),
                SectionBody::Links { links: sources },
            );
        }
        view
    }
}

pub struct CodeInterpreterRenderer;

impl StepRenderer for CodeInterpreterRenderer {
    fn name(&self) -> &str {
        "code_interpreter"
    }

    fn can_handle(&self, step: &Step) -> bool {
        step.tool_kind() == Some(ToolKind::CodeInterpreter)
    }

    fn render(&self, step: &Step) -> StepView {
        let mut view = StepView::new(step.id, &step.title, "code", step.status);
        if let Some(code) = str_field(step, "code") {
            view = view.section("Code", SectionBody::code(Some("python"), code));
        }

        let outputs = match step.data.get("outputs") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        };
        for output in outputs {
            let body = match output {
                Value::String(text) if text.is_empty() => continue,
                Value::String(text) => SectionBody::code(None, text.clone()),
                Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("image") => {
                    SectionBody::text("[Image Output]")
                }
                Value::Object(map) => match map.get("logs").and_then(Value::as_str) {
                    Some(logs) => SectionBody::code(None, logs),
                    None => SectionBody::code(None, output.to_string()),
                },
                other => SectionBody::code(None, other.to_string()),
            };
            view = view.section("Output", body);
        }
        view
    }
}

/// MESSAGE and ERROR steps.
pub struct MessageRenderer;

impl StepRenderer for MessageRenderer {
    fn name(&self) -> &str {
        "message"
    }

    fn can_handle(&self, step: &Step) -> bool {
        matches!(step.step_type, StepType::Message | StepType::Error)
    }

    fn render(&self, step: &Step) -> StepView {
        let icon = if step.step_type == StepType::Error {
            "error"
        } else {
            "message"
        };
        let mut view = StepView::new(step.id, &step.title, icon, step.status);
        if let Some(text) = str_field(step, "text").or_else(|| str_field(step, "message")) {
            view = view.section("Details", SectionBody::text(text));
        }
        view
    }
}

/// Any TOOL step. Registered at the lowest priority so specific tools win.
pub struct GenericToolRenderer {
    config: EngineConfig,
}

impl GenericToolRenderer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl StepRenderer for GenericToolRenderer {
    fn name(&self) -> &str {
        "generic_tool"
    }

    fn can_handle(&self, step: &Step) -> bool {
        step.step_type == StepType::Tool
    }

    fn render(&self, step: &Step) -> StepView {
        let tool_name = step.tool_name().unwrap_or("tool");
        let is_search = step.title.contains("Searching");
        let icon = if is_search { "search" } else { "tool" };
        let mut view = StepView::new(step.id, &step.title, icon, step.status);

        if self.config.is_detail_hidden(tool_name) {
            return view;
        }

        let arguments = step.data.get("arguments").filter(|v| !v.is_null());
        if let Some(arguments) = arguments.filter(|_| !is_search) {
            view = view.section(
                "Function call",
                SectionBody::code(Some("python"), format_call(tool_name, arguments)),
            );
        }

        match step.status {
            StepStatus::Completed => {
                let output = step
                    .data
                    .get("result")
                    .filter(|v| !v.is_null())
                    .map_or_else(|| "No result".to_string(), display_value);
                view = view.section("Output", SectionBody::code(None, output));
            }
            StepStatus::Failed => {
                let error = step
                    .data
                    .get("result")
                    .map_or_else(|| "Tool failed".to_string(), display_value);
                view = view.section("Error", SectionBody::text(error));
            }
            _ => {}
        }
        view
    }
}
