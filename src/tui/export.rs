use crate::model::RunState;
use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Clipboard worker channel, created on first copy.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Save the current artifact under the save directory and report the path in `info`.
pub fn save_current_artifact(state: &mut UiState) {
    let artifact = match state.run_state() {
        RunState::Succeeded(artifact) => artifact.clone(),
        RunState::Pending => {
            state.info = "Still generating; nothing to save yet.".into();
            return;
        }
        RunState::Idle | RunState::Failed(_) => {
            state.info = "No visualization to save.".into();
            return;
        }
    };

    match crate::storage::save_artifact(&state.save_dir, &artifact) {
        Ok(path) => {
            state.info = format!("Saved: {} (Ctrl-Y to copy path)", path.display());
            state.last_saved_path = Some(path);
        }
        Err(e) => {
            let msg = format!("{e:#}");
            tracing::warn!(error = %msg, "saving artifact failed");
            state.info = format!("Save failed: {msg}");
        }
    }
}

/// Copy the last saved path to the clipboard.
pub fn copy_saved_path(state: &mut UiState) {
    let Some(path) = state.last_saved_path.as_ref() else {
        state.info = "Nothing saved yet. Press Ctrl-S first.".into();
        return;
    };
    let path = path.to_string_lossy().to_string();
    match copy_to_clipboard(&path) {
        Ok(()) => {
            let len = path.chars().count();
            let shown = if len > 60 {
                let tail: String = path.chars().skip(len - 57).collect();
                format!("...{tail}")
            } else {
                path
            };
            state.info = format!("Copied to clipboard: {shown}");
        }
        Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
    }
}

/// Start the clipboard worker thread if needed.
/// Each copy gets its own `Clipboard` that is kept alive briefly so clipboard managers
/// on Linux can read it before it is dropped.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                match Clipboard::new() {
                    Ok(mut clipboard) => {
                        if clipboard.set_text(&text).is_ok() {
                            std::thread::sleep(Duration::from_secs(2));
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "clipboard unavailable"),
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue text for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}
