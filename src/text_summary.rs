//! Summaries for non-interactive output.
//!
//! Both builders go through the presenter so scripted runs report exactly what the TUI
//! would show.

use crate::model::{Language, RunState};
use crate::presenter::{present, View};
use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(
    language: Language,
    state: &RunState,
    elapsed: Duration,
    written: Option<&Path>,
) -> TextSummary {
    let mut lines = Vec::new();
    let view = present(state);

    lines.push(format!("Language: {}", language.label()));
    lines.push(format!("Elapsed: {}", format_elapsed(elapsed)));

    match &view {
        View::Image(img) => {
            lines.push(format!("{}: {}", view.title(), img.mime_type));
            lines.push(format!("Size: {} bytes", img.size_bytes));
            if let Some((w, h)) = img.dimensions {
                lines.push(format!("Dimensions: {w}x{h}"));
            }
        }
        View::Document(doc) => {
            lines.push(format!("{}: text/html", view.title()));
            lines.push(format!("Size: {} bytes", doc.markup_bytes));
            if written.is_none() {
                lines.push("Use --output <file.html> to save it as a sandboxed page.".into());
            }
        }
        View::Error(notice) => {
            lines.push(format!("Error: {}", notice.message));
        }
        View::Idle | View::Pending => {
            lines.push(format!("State: {}", state.label()));
        }
    }

    if let Some(p) = written {
        lines.push(format!("Output: {}", p.display()));
    }

    TextSummary { lines }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummary<'a> {
    pub language: Language,
    pub state: &'static str,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub view: View,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<&'a Path>,
}

pub(crate) fn build_json_summary(
    language: Language,
    state: &RunState,
    elapsed: Duration,
    written: Option<&Path>,
) -> Result<String> {
    let summary = JsonSummary {
        language,
        state: state.label(),
        elapsed_ms: elapsed.as_millis() as u64,
        view: present(state),
        output: written,
    };
    Ok(serde_json::to_string_pretty(&summary)?)
}

fn format_elapsed(elapsed: Duration) -> String {
    // Millisecond precision is plenty for a human-readable line.
    let trimmed = Duration::from_millis(elapsed.as_millis() as u64);
    humantime::format_duration(trimmed).to_string()
}
