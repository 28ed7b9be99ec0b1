//! Presentation-neutral step views and a plain-text formatter.

use std::fmt::Write as _;

use serde::Serialize;
use stepwise_core::{StepId, StepStatus};

/// What a renderer decided to show for one step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub step_id: StepId,
    pub title: String,
    pub icon: &'static str,
    pub status: StepStatus,
    /// Set on the run's closing step.
    pub final_marker: bool,
    pub sections: Vec<ViewSection>,
}

impl StepView {
    pub fn new(step_id: StepId, title: impl Into<String>, icon: &'static str, status: StepStatus) -> Self {
        Self {
            step_id,
            title: title.into(),
            icon,
            status,
            final_marker: false,
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, label: impl Into<String>, body: SectionBody) -> Self {
        self.sections.push(ViewSection {
            label: label.into(),
            body,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSection {
    pub label: String,
    pub body: SectionBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionBody {
    Text { text: String },
    Code { language: Option<String>, text: String },
    Links { links: Vec<LinkView> },
}

impl SectionBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn code(language: Option<&str>, text: impl Into<String>) -> Self {
        Self::Code {
            language: language.map(str::to_string),
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkView {
    pub title: String,
    pub url: String,
    /// Host without a leading `www.`; empty for non-http URLs.
    pub domain: String,
}

impl LinkView {
    pub fn new(url: impl Into<String>, title: Option<&str>) -> Self {
        let url = url.into();
        Self {
            title: title.map_or_else(|| url.clone(), str::to_string),
            domain: domain_of(&url),
            url,
        }
    }
}

pub fn domain_of(raw: &str) -> String {
    let Ok(parsed) = url::Url::parse(raw) else {
        return String::new();
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return String::new();
    }
    let host = parsed.host_str().unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

fn status_mark(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "…",
        StepStatus::Running => "▸",
        StepStatus::Completed => "✓",
        StepStatus::Failed => "✗",
    }
}

/// Render a view as indented plain text for terminals.
pub fn format_view(view: &StepView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} [{}] {} {}",
        status_mark(view.status),
        view.step_id,
        view.icon,
        view.title
    );

    for section in &view.sections {
        let _ = writeln!(out, "    {}:", section.label);
        match &section.body {
            SectionBody::Text { text } | SectionBody::Code { text, .. } => {
                for line in text.lines() {
                    let _ = writeln!(out, "      {line}");
                }
            }
            SectionBody::Links { links } => {
                for link in links {
                    if link.domain.is_empty() {
                        let _ = writeln!(out, "      - {}", link.title);
                    } else {
                        let _ = writeln!(out, "      - {} ({})", link.title, link.domain);
                    }
                }
            }
        }
    }

    if view.final_marker {
        out.push_str("  ── done ──\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("https://www.rust-lang.org/learn"), "rust-lang.org");
        assert_eq!(domain_of("http://docs.rs/tokio"), "docs.rs");
        assert_eq!(domain_of("ftp://files.example/a"), "");
        assert_eq!(domain_of("not a url"), "");
    }

    #[test]
    fn test_link_title_defaults_to_url() {
        let link = LinkView::new("https://tokio.rs", None);
        assert_eq!(link.title, "https://tokio.rs");
        assert_eq!(link.domain, "tokio.rs");
    }

    #[test]
    fn test_format_view() {
        let view = StepView::new(StepId(2), "Searching the web", "search", StepStatus::Completed)
            .section("Query", SectionBody::text("rust event bus"))
            .section(
                "Sources",
                SectionBody::Links {
                    links: vec![LinkView::new("https://www.tokio.rs/blog", Some("Tokio blog"))],
                },
            );
        let text = format_view(&view);
        assert_eq!(
            text,
            "✓ [step_2] search Searching the web\n    Query:\n      rust event bus\n    Sources:\n      - Tokio blog (tokio.rs)\n"
        );
    }
}
