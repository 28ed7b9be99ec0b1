//! Upstream → canonical event mapping.

use serde_json::Value;
use tracing::debug;

use stepwise_core::payload::{
    AgentEndPayload, CodeInterpreterPayload, HandoffPayload, LlmEndPayload, ToolCallPayload,
    ToolEndPayload, ToolStartPayload, WebSearchPayload, dedup_sources,
};
use stepwise_core::{AgentEvent, EventType, Result, Source, StepwiseError};

use crate::upstream::{Annotation, ModelResponse, OutputItem, UpstreamEvent};

/// Map one runtime callback onto the canonical events it implies.
pub fn translate(upstream: UpstreamEvent) -> Vec<AgentEvent> {
    match upstream {
        UpstreamEvent::AgentStart { agent } => vec![AgentEvent::new(EventType::AgentStarted, agent)],
        UpstreamEvent::AgentEnd { agent, output } => vec![
            AgentEvent::new(EventType::AgentEnded, agent).with_payload(&AgentEndPayload { output }),
        ],
        UpstreamEvent::Handoff { from, to } => {
            let payload = HandoffPayload {
                from_agent: Some(from.clone()),
                to_agent: Some(to),
            };
            vec![AgentEvent::new(EventType::AgentHandoff, from).with_payload(&payload)]
        }
        UpstreamEvent::LlmStart { agent } => vec![AgentEvent::new(EventType::LlmStarted, agent)],
        UpstreamEvent::LlmEnd { agent, response } => translate_response(&agent, response),
        UpstreamEvent::ToolStart {
            agent,
            tool,
            span_id,
        } => {
            let payload = ToolStartPayload {
                tool_name: tool.name().map(str::to_string),
                tool_type: tool.tool_type().map(str::to_string),
            };
            let event = AgentEvent::new(EventType::ToolStarted, agent).with_payload(&payload);
            vec![with_optional_span(event, span_id)]
        }
        UpstreamEvent::ToolEnd {
            agent,
            tool,
            result,
            is_error,
            span_id,
        } => {
            let payload = ToolEndPayload {
                tool_name: tool.name().map(str::to_string),
                result,
                is_error,
            };
            let event = AgentEvent::new(EventType::ToolEnded, agent).with_payload(&payload);
            vec![with_optional_span(event, span_id)]
        }
        UpstreamEvent::Custom {
            source,
            event_type,
            span_id,
            data,
        } => {
            let event = AgentEvent::new(event_type, source).with_data(Value::Object(data));
            vec![with_optional_span(event, span_id)]
        }
    }
}

/// Decode a JSON runtime callback and translate it.
pub fn translate_json(raw: &str) -> Result<Vec<AgentEvent>> {
    let upstream: UpstreamEvent =
        serde_json::from_str(raw).map_err(|e| StepwiseError::Translate(e.to_string()))?;
    Ok(translate(upstream))
}

/// Decode one line of a newline-delimited event stream.
///
/// A line is either a runtime callback (has `kind`) or a canonical event
/// (has `event_type`). Blank lines yield nothing.
pub fn decode_line(line: &str) -> Result<Vec<AgentEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(line)?;
    // Runtime `custom` callbacks also carry `event_type`, so check `kind` first.
    if value.get("kind").is_some() {
        let upstream: UpstreamEvent =
            serde_json::from_value(value).map_err(|e| StepwiseError::Translate(e.to_string()))?;
        return Ok(translate(upstream));
    }
    if value.get("event_type").is_some() {
        let event: AgentEvent = serde_json::from_value(value)?;
        return Ok(vec![event]);
    }

    Err(StepwiseError::Translate(
        "line is neither a canonical event nor a runtime callback".into(),
    ))
}

fn with_optional_span(event: AgentEvent, span_id: Option<String>) -> AgentEvent {
    match span_id {
        Some(span) => event.with_span(span),
        None => event,
    }
}

/// `llm_end` carries the whole model response. It becomes `llm_ended`
/// followed by one event per tool call the response contains, in order.
fn translate_response(agent: &str, response: ModelResponse) -> Vec<AgentEvent> {
    let ModelResponse { output, usage } = response;

    let mut texts = Vec::new();
    let mut reasoning = Vec::new();
    let mut citations = Vec::new();
    for item in &output {
        match item {
            OutputItem::Message { content } => {
                for part in content {
                    if let Some(text) = &part.text {
                        texts.push(text.clone());
                    }
                    for annotation in &part.annotations {
                        if let Annotation::UrlCitation { url, title } = annotation {
                            citations.push(Source {
                                url: url.clone(),
                                title: title.clone(),
                            });
                        }
                    }
                }
            }
            OutputItem::Reasoning { summary } => {
                reasoning.extend(summary.iter().map(|s| s.text.clone()));
            }
            _ => {}
        }
    }
    let citations = dedup_sources(citations);

    // Citations belong to the search that produced them: the last search call.
    let last_search = output
        .iter()
        .rposition(|item| matches!(item, OutputItem::WebSearchCall { .. }));

    let end = LlmEndPayload {
        text: (!texts.is_empty()).then(|| texts.join("\n")),
        reasoning: (!reasoning.is_empty()).then(|| reasoning.join("\n")),
        usage,
        citations: if last_search.is_none() {
            citations.clone()
        } else {
            Vec::new()
        },
    };
    let mut events = vec![AgentEvent::new(EventType::LlmEnded, agent).with_payload(&end)];

    for (index, item) in output.into_iter().enumerate() {
        match item {
            OutputItem::FunctionCall {
                name,
                arguments,
                call_id,
            } => {
                let payload = ToolCallPayload {
                    tool_name: Some(name),
                    arguments,
                    call_id,
                };
                events.push(
                    AgentEvent::new(EventType::ToolCallDetected, agent).with_payload(&payload),
                );
            }
            OutputItem::WebSearchCall { id, action } => {
                let action = action.unwrap_or_default();
                let mut sources: Vec<Source> =
                    action.sources.into_iter().map(Source::from).collect();
                if Some(index) == last_search {
                    sources.extend(citations.iter().cloned());
                }
                let payload = WebSearchPayload {
                    query: action.query,
                    sources: dedup_sources(sources),
                    call_id: id,
                };
                events.push(AgentEvent::new(EventType::ToolWebSearch, agent).with_payload(&payload));
            }
            OutputItem::CodeInterpreterCall {
                id,
                code,
                outputs,
                status,
            } => {
                let payload = CodeInterpreterPayload {
                    code,
                    outputs: outputs.into_iter().map(|o| o.into_value()).collect(),
                    call_id: id.clone(),
                    status,
                };
                let event =
                    AgentEvent::new(EventType::ToolCodeInterpreter, agent).with_payload(&payload);
                events.push(with_optional_span(event, id));
            }
            OutputItem::Unknown => debug!(agent, "Ignoring unknown response output item"),
            OutputItem::Message { .. } | OutputItem::Reasoning { .. } => {}
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn types(events: &[AgentEvent]) -> Vec<&str> {
        events.iter().map(|e| e.event_type.as_str()).collect()
    }

    #[test]
    fn test_lifecycle_maps_one_to_one() {
        let events = translate_json(r#"{"kind": "agent_start", "agent": "Manager"}"#).unwrap();
        assert_eq!(types(&events), vec!["agent_started"]);
        assert_eq!(events[0].source, "Manager");

        let events = translate_json(
            r#"{"kind": "agent_end", "agent": "Manager", "output": "All done"}"#,
        )
        .unwrap();
        assert_eq!(events[0].event_type, EventType::AgentEnded);
        assert_eq!(events[0].data["output"], "All done");
    }

    #[test]
    fn test_handoff_is_sourced_from_the_delegating_agent() {
        let events =
            translate_json(r#"{"kind": "handoff", "from": "Manager", "to": "Executor"}"#).unwrap();
        assert_eq!(events[0].source, "Manager");
        let payload: HandoffPayload = events[0].payload();
        assert_eq!(payload.to_agent.as_deref(), Some("Executor"));
    }

    #[test]
    fn test_tool_start_and_end_keep_span() {
        let start = translate(
            serde_json::from_value(json!({
                "kind": "tool_start",
                "agent": "Manager",
                "tool": "random_number",
                "span_id": "span_b"
            }))
            .unwrap(),
        );
        assert_eq!(start[0].span_id.as_deref(), Some("span_b"));
        assert_eq!(start[0].get_str("tool_name"), Some("random_number"));

        let end = translate(
            serde_json::from_value(json!({
                "kind": "tool_end",
                "agent": "Manager",
                "tool": {"name": "random_number"},
                "result": 7,
                "span_id": "span_b"
            }))
            .unwrap(),
        );
        let payload: ToolEndPayload = end[0].payload();
        assert_eq!(payload.result, Some(json!(7)));
        assert!(!payload.is_error);
        assert_eq!(end[0].span_id.as_deref(), Some("span_b"));
    }

    #[test]
    fn test_tool_start_without_span() {
        let events = translate_json(
            r#"{"kind": "tool_start", "agent": "Manager", "tool": {"name": "code_interpreter", "type": "code_interpreter"}}"#,
        )
        .unwrap();
        assert!(events[0].span_id.is_none());
        assert_eq!(events[0].get_str("tool_type"), Some("code_interpreter"));
    }

    #[test]
    fn test_llm_end_fans_out_tool_calls_in_order() {
        let events = translate_json(
            &json!({
                "kind": "llm_end",
                "agent": "Manager",
                "response": {
                    "output": [
                        {"type": "reasoning", "summary": [{"text": "Need a number"}]},
                        {"type": "function_call", "name": "random_number", "arguments": "{\"max\": 10}", "call_id": "call_1"},
                        {"type": "function_call", "name": "draft_plan", "arguments": "{}", "call_id": "call_2"}
                    ],
                    "usage": {"input_tokens": 12, "output_tokens": 30}
                }
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(
            types(&events),
            vec!["llm_ended", "tool_call_detected", "tool_call_detected"]
        );
        let end: LlmEndPayload = events[0].payload();
        assert_eq!(end.reasoning.as_deref(), Some("Need a number"));
        assert_eq!(end.usage.map(|u| u.output_tokens), Some(30));

        let call: ToolCallPayload = events[1].payload();
        assert_eq!(call.tool_name.as_deref(), Some("random_number"));
        assert_eq!(call.call_id.as_deref(), Some("call_1"));
        assert_eq!(events[2].get_str("tool_name"), Some("draft_plan"));
    }

    #[test]
    fn test_search_call_collects_deduplicated_citations() {
        let events = translate_json(
            &json!({
                "kind": "llm_end",
                "agent": "Researcher",
                "response": {
                    "output": [
                        {
                            "type": "web_search_call",
                            "id": "ws_1",
                            "action": {"query": "tokio join_all", "sources": [
                                {"url": "https://docs.rs/futures", "title": "futures"},
                                "https://tokio.rs"
                            ]}
                        },
                        {
                            "type": "message",
                            "content": [{
                                "text": "See the docs.",
                                "annotations": [
                                    {"type": "url_citation", "url": "https://tokio.rs", "title": "Tokio"},
                                    {"type": "url_citation", "url": "https://crates.io/crates/futures"},
                                    {"type": "file_citation", "file_id": "f1"},
                                    {"type": "url_citation", "url": "https://crates.io/crates/futures"}
                                ]
                            }]
                        }
                    ]
                }
            })
            .to_string(),
        )
        .unwrap();

        assert_eq!(types(&events), vec!["llm_ended", "tool_web_search"]);
        let end: LlmEndPayload = events[0].payload();
        assert_eq!(end.text.as_deref(), Some("See the docs."));
        assert!(end.citations.is_empty());

        let search: WebSearchPayload = events[1].payload();
        assert_eq!(search.query.as_deref(), Some("tokio join_all"));
        assert_eq!(search.call_id.as_deref(), Some("ws_1"));
        let urls: Vec<_> = search.sources.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://docs.rs/futures",
                "https://tokio.rs",
                "https://crates.io/crates/futures"
            ]
        );
        assert!(search.sources[1].title.is_none());
    }

    #[test]
    fn test_citations_without_search_stay_on_llm_ended() {
        let events = translate_json(
            &json!({
                "kind": "llm_end",
                "agent": "Manager",
                "response": {"output": [{
                    "type": "message",
                    "content": [{"text": "Answer", "annotations": [
                        {"type": "url_citation", "url": "https://example.com/a"}
                    ]}]
                }]}
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(events.len(), 1);
        let end: LlmEndPayload = events[0].payload();
        assert_eq!(end.citations, vec![Source::new("https://example.com/a")]);
    }

    #[test]
    fn test_code_interpreter_call() {
        let events = translate_json(
            &json!({
                "kind": "llm_end",
                "agent": "Analyst",
                "response": {"output": [{
                    "type": "code_interpreter_call",
                    "id": "ci_1",
                    "code": "print(6 * 7)",
                    "status": "completed",
                    "outputs": [
                        {"type": "logs", "logs": "42\n"},
                        {"type": "image", "url": "https://files.example/plot.png"}
                    ]
                }]}
            })
            .to_string(),
        )
        .unwrap();

        let ci = &events[1];
        assert_eq!(ci.event_type, EventType::ToolCodeInterpreter);
        assert_eq!(ci.span_id.as_deref(), Some("ci_1"));
        let payload: CodeInterpreterPayload = ci.payload();
        assert!(payload.is_completed());
        assert_eq!(payload.outputs[0], json!("42\n"));
        assert_eq!(payload.outputs[1]["type"], "image");
    }

    #[test]
    fn test_custom_events_pass_through() {
        let events = translate_json(
            r#"{"kind": "custom", "source": "Manager", "event_type": "tool_random_number_event", "data": {"value": 4}}"#,
        )
        .unwrap();
        assert_eq!(
            events[0].event_type,
            EventType::Other("tool_random_number_event".into())
        );
        assert_eq!(events[0].data["value"], 4);
    }

    #[test]
    fn test_unknown_kind_is_translate_error() {
        let err = translate_json(r#"{"kind": "guardrail_tripped"}"#).unwrap_err();
        assert!(matches!(err, StepwiseError::Translate(_)));
    }

    #[test]
    fn test_decode_line_accepts_both_shapes() {
        assert!(decode_line("   ").unwrap().is_empty());

        let canonical = decode_line(
            r#"{"event_type": "tool_started_stream_event", "source": "Manager", "span_id": "A", "data": {"tool_name": "search_web"}}"#,
        )
        .unwrap();
        assert_eq!(canonical[0].event_type, EventType::ToolStarted);
        assert_eq!(canonical[0].span_id.as_deref(), Some("A"));

        let upstream = decode_line(r#"{"kind": "llm_start", "agent": "Manager"}"#).unwrap();
        assert_eq!(upstream[0].event_type, EventType::LlmStarted);

        assert!(matches!(
            decode_line(r#"{"hello": "world"}"#),
            Err(StepwiseError::Translate(_))
        ));
        assert!(matches!(decode_line("not json"), Err(StepwiseError::Json(_))));
    }
}
