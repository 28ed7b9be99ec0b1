//! Event-log subscriber: one `tracing` debug line per event.

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;
use stepwise_core::AgentEvent;

use crate::Subscriber;

const MAX_VALUE_CHARS: usize = 80;

/// Logs every event as `HH:MM:SS [source] event_type | key=value, ...`.
#[derive(Debug, Clone, Default)]
pub struct LoggingSubscriber;

impl LoggingSubscriber {
    pub fn format_event_line(event: &AgentEvent) -> String {
        let details = if event.data.is_empty() {
            "no payload".to_string()
        } else {
            event
                .data
                .iter()
                .map(|(key, value)| format!("{key}={}", preview(value)))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let timestamp = event.timestamp.with_timezone(&Local).format("%H:%M:%S");
        format!(
            "{timestamp} [{}] {} | {details}",
            event.source, event.event_type
        )
    }
}

fn preview(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > MAX_VALUE_CHARS {
        let cut: String = text.chars().take(MAX_VALUE_CHARS - 1).collect();
        format!("{cut}…")
    } else {
        text
    }
}

#[async_trait]
impl Subscriber for LoggingSubscriber {
    async fn on_event(&self, event: &AgentEvent) -> anyhow::Result<()> {
        tracing::debug!(
            target: "stepwise::events",
            span_id = event.span_id.as_deref().unwrap_or("-"),
            "{}",
            Self::format_event_line(event)
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "event-log"
    }
}
