use crate::model::{ExecutionRequest, Language, RunState};
use crate::presenter::{present, View};
use std::path::PathBuf;

/// Multi-line text buffer behind the code panel. Cursor column counts chars, not bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for CodeBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

fn byte_index(line: &str, col: usize) -> usize {
    line.char_indices()
        .nth(col)
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

impl CodeBuffer {
    /// Load text with the cursor at the end.
    pub fn from_text(text: &str) -> Self {
        let mut lines: Vec<String> = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        let row = lines.len() - 1;
        let col = lines[row].chars().count();
        Self { lines, row, col }
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    pub fn insert_char(&mut self, c: char) {
        let line = &mut self.lines[self.row];
        let at = byte_index(line, self.col);
        line.insert(at, c);
        self.col += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            if c == '\n' {
                self.insert_newline();
            } else {
                self.insert_char(c);
            }
        }
    }

    pub fn insert_newline(&mut self) {
        let line = &mut self.lines[self.row];
        let at = byte_index(line, self.col);
        let rest = line.split_off(at);
        self.row += 1;
        self.col = 0;
        self.lines.insert(self.row, rest);
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let line = &mut self.lines[self.row];
            let at = byte_index(line, self.col - 1);
            line.remove(at);
            self.col -= 1;
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&current);
        }
    }

    pub fn delete(&mut self) {
        if self.col < self.line_len(self.row) {
            let line = &mut self.lines[self.row];
            let at = byte_index(line, self.col);
            line.remove(at);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    pub fn home(&mut self) {
        self.col = 0;
    }

    pub fn end(&mut self) {
        self.col = self.line_len(self.row);
    }
}

pub struct UiState {
    pub language: Language,
    pub editor: CodeBuffer,
    pub wrap: bool,
    pub show_help: bool,
    pub info: String,
    pub endpoint: String,
    pub save_dir: PathBuf,
    pub last_saved_path: Option<PathBuf>,

    // Mirror of the controller's state cell; only `observe` writes it.
    run_state: RunState,
    view: View,
    // A submit command was sent but the controller's Pending has not been observed yet.
    submit_requested: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            language: Language::Python,
            editor: CodeBuffer::default(),
            wrap: false,
            show_help: false,
            info: String::new(),
            endpoint: String::new(),
            save_dir: PathBuf::from("."),
            last_saved_path: None,
            run_state: RunState::Idle,
            view: View::Idle,
            submit_requested: false,
        }
    }
}

impl UiState {
    pub fn run_state(&self) -> &RunState {
        &self.run_state
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    /// Take a new snapshot from the state cell and re-derive the view.
    pub fn observe(&mut self, run_state: RunState) {
        match &run_state {
            RunState::Pending => self.info = "Submitted…".into(),
            RunState::Succeeded(artifact) => {
                self.info = format!(
                    "Received {} ({} bytes)",
                    artifact.kind(),
                    artifact.size_bytes()
                )
            }
            RunState::Failed(_) => self.info.clear(),
            RunState::Idle => {}
        }
        self.view = present(&run_state);
        self.run_state = run_state;
        self.submit_requested = false;
    }

    pub fn request(&self) -> ExecutionRequest {
        ExecutionRequest::new(self.language, self.editor.text())
    }

    pub fn can_submit(&self) -> bool {
        !self.submit_requested && self.view.submit_enabled()
    }

    /// Build the request for a new submission, or `None` while one is still in flight.
    pub fn begin_submit(&mut self) -> Option<ExecutionRequest> {
        if !self.can_submit() {
            self.info = "Already generating; wait for the current result.".into();
            return None;
        }
        self.submit_requested = true;
        Some(self.request())
    }

    pub fn toggle_wrap(&mut self) {
        self.wrap = !self.wrap;
        self.info = if self.wrap {
            "Line wrap on".into()
        } else {
            "Line wrap off".into()
        };
    }

    pub fn cycle_language(&mut self) {
        self.language = self.language.next();
        self.info = format!("Language: {}", self.language.label());
    }
}
