//! Per-run state shared by all event handlers.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};
use stepwise_core::{AgentEvent, Step, StepId, StepStatus, StepType};
use uuid::Uuid;

use crate::title::resolve_tool_title;

pub const HEADLINE_IDLE: &str = "Waiting for agent...";

/// The ordered step list plus everything handlers need to correlate events
/// within one run.
///
/// Steps are append-only: handlers create them through [`RunContext::create_step`]
/// and afterwards only mutate them in place.
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    steps: Vec<Step>,
    main_agent: Option<String>,
    tool_titles: HashMap<String, String>,
    next_id: u64,
    headline: String,
}

impl RunContext {
    pub fn new(tool_titles: HashMap<String, String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            steps: Vec::new(),
            main_agent: None,
            tool_titles,
            next_id: 1,
            headline: HEADLINE_IDLE.to_string(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn main_agent(&self) -> Option<&str> {
        self.main_agent.as_deref()
    }

    pub fn set_main_agent(&mut self, agent: impl Into<String>) {
        self.main_agent = Some(agent.into());
    }

    /// One-line status of the run, for a header above the step list.
    pub fn headline(&self) -> &str {
        &self.headline
    }

    pub fn set_headline(&mut self, headline: impl Into<String>) {
        self.headline = headline.into();
    }

    /// Append a new PENDING step with the next id and return it for setup.
    pub fn create_step(&mut self, step_type: StepType, title: impl Into<String>) -> &mut Step {
        let id = StepId(self.next_id);
        self.next_id += 1;
        self.steps.push(Step::new(id, step_type, title));
        let index = self.steps.len() - 1;
        &mut self.steps[index]
    }

    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn step_mut(&mut self, id: StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.id == id)
    }

    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Most recent RUNNING step that owns `span_id`.
    pub fn find_running_by_span(&self, span_id: &str) -> Option<StepId> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.is_running() && s.span_id.as_deref() == Some(span_id))
            .map(|s| s.id)
    }

    /// Oldest PENDING tool step announced for `tool_name`.
    pub fn find_pending_tool(&self, tool_name: &str) -> Option<StepId> {
        self.steps
            .iter()
            .find(|s| {
                s.step_type == StepType::Tool
                    && s.status == StepStatus::Pending
                    && s.tool_name() == Some(tool_name)
            })
            .map(|s| s.id)
    }

    /// Most recent RUNNING step of the given type.
    pub fn last_running_of(&self, step_type: StepType) -> Option<StepId> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step_type == step_type && s.is_running())
            .map(|s| s.id)
    }

    /// Most recent step of the given type, whatever its status.
    pub fn last_of(&self, step_type: StepType) -> Option<StepId> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step_type == step_type)
            .map(|s| s.id)
    }

    /// Most recent tool step matching `predicate`.
    pub fn find_tool_step(&self, predicate: impl Fn(&Step) -> bool) -> Option<StepId> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step_type == StepType::Tool && predicate(s))
            .map(|s| s.id)
    }

    pub fn running_tool_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.step_type == StepType::Tool && s.is_running())
            .count()
    }

    pub fn has_finished(&self) -> bool {
        self.steps.iter().any(|s| s.step_type == StepType::Finished)
    }

    /// Ids of all PENDING or RUNNING steps, in list order.
    pub fn open_steps(&self) -> Vec<StepId> {
        self.steps
            .iter()
            .filter(|s| !s.status.is_terminal())
            .map(|s| s.id)
            .collect()
    }

    pub fn tool_title(&self, tool_name: &str) -> String {
        resolve_tool_title(tool_name, &self.tool_titles)
    }

    /// Start over for a new run. Title overrides are kept.
    pub fn reset(&mut self) {
        self.run_id = Uuid::new_v4();
        self.steps.clear();
        self.main_agent = None;
        self.next_id = 1;
        self.headline = HEADLINE_IDLE.to_string();
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

/// Serialize a payload into step data, dropping null fields.
pub(crate) fn payload_map<T: Serialize>(payload: &T) -> Map<String, Value> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map.into_iter().filter(|(_, v)| !v.is_null()).collect(),
        _ => Map::new(),
    }
}

/// The event payload without null fields.
pub(crate) fn event_data(event: &AgentEvent) -> Map<String, Value> {
    event
        .data
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
