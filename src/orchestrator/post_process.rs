//! Post-submission processing for non-interactive modes.
//!
//! Writes the settled artifact to the requested output path and collects status lines.

use crate::model::RunState;
use crate::storage;
use std::path::{Path, PathBuf};

/// Result of post-submission processing, ready for presentation layers.
pub(crate) struct ProcessedRun {
    pub written_path: Option<PathBuf>,
    pub messages: Vec<String>,
}

pub(crate) fn process_outcome(output: Option<&Path>, state: &RunState) -> ProcessedRun {
    let mut messages = Vec::new();
    let mut written_path = None;

    match (output, state) {
        (Some(path), RunState::Succeeded(artifact)) => {
            match storage::write_artifact(path, artifact) {
                Ok(()) => {
                    messages.push(format!("Wrote {}: {}", artifact.kind(), path.display()));
                    written_path = Some(path.to_path_buf());
                }
                Err(e) => messages.push(format!("Write failed: {e:#}")),
            }
        }
        (Some(path), _) => {
            messages.push(format!("Nothing written to {}: no artifact", path.display()));
        }
        (None, _) => {}
    }

    ProcessedRun {
        written_path,
        messages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, ErrorInfo, EXECUTION_FAILED_MESSAGE};

    #[test]
    fn writes_successful_artifact() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.html");
        let state = RunState::Succeeded(Artifact::Document {
            markup: "<p>x</p>".into(),
        });
        let processed = process_outcome(Some(&path), &state);
        assert_eq!(processed.written_path.as_deref(), Some(path.as_path()));
        assert!(processed.messages[0].starts_with("Wrote document:"));
        assert!(path.exists());
    }

    #[test]
    fn failed_state_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.png");
        let state = RunState::Failed(ErrorInfo::new(EXECUTION_FAILED_MESSAGE));
        let processed = process_outcome(Some(&path), &state);
        assert!(processed.written_path.is_none());
        assert!(!path.exists());
        assert_eq!(processed.messages.len(), 1);
    }

    #[test]
    fn no_output_path_is_silent() {
        let processed = process_outcome(None, &RunState::Idle);
        assert!(processed.written_path.is_none());
        assert!(processed.messages.is_empty());
    }
}
