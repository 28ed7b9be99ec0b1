//! `stepwise watch`: replay an NDJSON event stream through the bus and
//! print the step timeline as it changes.

use std::io::Write;
use std::sync::Arc;

use stepwise_bus::{EventBus, LoggingSubscriber};
use stepwise_core::config::EngineConfig;
use stepwise_core::{Step, StepStatus};
use stepwise_engine::{EngineSubscriber, StepDelta, StepEngine};
use stepwise_render::{RendererRegistry, format_view};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// How the watch loop prints step views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    /// One JSON-serialized view per line.
    Json,
}

/// Totals reported once the input stream ends.
#[derive(Debug, Default)]
pub struct WatchSummary {
    pub lines: usize,
    pub events: usize,
    /// Lines that could not be decoded.
    pub skipped: usize,
    /// Subscriber failures reported by the bus.
    pub failures: usize,
    pub headline: String,
    pub steps: Vec<Step>,
}

impl WatchSummary {
    pub fn count(&self, status: StepStatus) -> usize {
        self.steps.iter().filter(|s| s.status == status).count()
    }

    pub fn describe(&self) -> String {
        format!(
            "{} steps: {} completed, {} failed, {} running, {} pending ({} events from {} lines, {} skipped)",
            self.steps.len(),
            self.count(StepStatus::Completed),
            self.count(StepStatus::Failed),
            self.count(StepStatus::Running),
            self.count(StepStatus::Pending),
            self.events,
            self.lines,
            self.skipped,
        )
    }
}

/// Read events line by line until EOF, publishing each through a fresh bus.
pub async fn run<R, W>(
    reader: R,
    out: &mut W,
    config: &EngineConfig,
    mode: OutputMode,
) -> anyhow::Result<WatchSummary>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let renderers = RendererRegistry::with_defaults(config);
    let (engine, mut deltas) = EngineSubscriber::new(StepEngine::new(config));
    let engine = Arc::new(engine);

    let bus = EventBus::new();
    bus.subscribe(engine.clone()).await;
    bus.subscribe(Arc::new(LoggingSubscriber)).await;

    let mut summary = WatchSummary::default();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        summary.lines += 1;
        let events = match stepwise_translator::decode_line(&line) {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!(line = summary.lines, "Skipping undecodable line: {e}");
                summary.skipped += 1;
                continue;
            }
        };

        for event in events {
            summary.events += 1;
            let report = bus.publish(event).await;
            summary.failures += report.failures.len();
            // Publish waits for every subscriber, so the delta is already queued.
            drain(&mut deltas, &renderers, out, mode)?;
        }
    }

    summary.headline = engine.headline().await;
    summary.steps = engine.steps().await;
    Ok(summary)
}

fn drain<W: Write>(
    deltas: &mut mpsc::UnboundedReceiver<StepDelta>,
    renderers: &RendererRegistry,
    out: &mut W,
    mode: OutputMode,
) -> anyhow::Result<()> {
    while let Ok(delta) = deltas.try_recv() {
        for step in &delta.steps {
            let view = renderers.render(step);
            match mode {
                OutputMode::Text => write!(out, "{}", format_view(&view))?,
                OutputMode::Json => writeln!(out, "{}", serde_json::to_string(&view)?)?,
            }
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RUN: &str = r#"{"kind": "agent_start", "agent": "Manager"}
{"kind": "llm_start", "agent": "Manager"}
{"kind": "llm_end", "agent": "Manager", "response": {"output": [{"type": "function_call", "name": "random_number", "arguments": "{\"max\": 10}", "call_id": "c1"}]}}
{"kind": "tool_start", "agent": "Manager", "tool": "random_number", "span_id": "S1"}
not json at all
{"kind": "tool_end", "agent": "Manager", "tool": "random_number", "result": 7, "span_id": "S1"}

{"kind": "agent_end", "agent": "Manager", "output": "Drew a 7"}
"#;

    #[tokio::test]
    async fn test_watch_prints_timeline_and_summary() {
        let mut out = Vec::new();
        let summary = run(RUN.as_bytes(), &mut out, &EngineConfig::default(), OutputMode::Text)
            .await
            .unwrap();

        assert_eq!(summary.lines, 8);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failures, 0);
        assert_eq!(summary.headline, "Agent finished");
        assert_eq!(summary.steps.len(), 3);
        assert_eq!(summary.count(StepStatus::Completed), 3);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Thinking..."));
        assert!(text.contains("random_number("));
        assert!(text.contains("Task Completed"));
        assert!(text.trim_end().ends_with("── done ──"));
    }

    #[tokio::test]
    async fn test_watch_json_mode_emits_one_view_per_line() {
        let input = concat!(
            r#"{"event_type": "agent_started", "source": "Manager"}"#,
            "\n",
            r#"{"event_type": "agent_ended", "source": "Manager", "data": {"output": "ok"}}"#,
            "\n",
        );
        let mut out = Vec::new();
        let summary = run(input.as_bytes(), &mut out, &EngineConfig::default(), OutputMode::Json)
            .await
            .unwrap();
        assert_eq!(summary.events, 2);

        let text = String::from_utf8(out).unwrap();
        let views: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0]["title"], "Task Completed");
        assert_eq!(views[0]["final_marker"], true);
    }

    #[test]
    fn test_summary_describe() {
        let summary = WatchSummary {
            lines: 4,
            events: 3,
            skipped: 1,
            ..Default::default()
        };
        assert_eq!(
            summary.describe(),
            "0 steps: 0 completed, 0 failed, 0 running, 0 pending (3 events from 4 lines, 1 skipped)"
        );
    }
}
