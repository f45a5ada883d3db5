use bytes::Bytes;
use serde::{Deserialize, Serialize};

pub const EXECUTION_FAILED_MESSAGE: &str = "Execution failed. Please check your code.";
pub const UNSUPPORTED_RESPONSE_MESSAGE: &str = "Unsupported response type.";

pub const PNG_MIME: &str = "image/png";
pub const HTML_MIME: &str = "text/html";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Python,
    R,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Python, Language::R];

    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::R => "r",
        }
    }

    /// Human-readable label for selectors.
    pub fn label(self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::R => "R",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Language::Python => Language::R,
            Language::R => Language::Python,
        }
    }
}

impl std::str::FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "python" => Ok(Language::Python),
            "r" => Ok(Language::R),
            other => Err(anyhow::anyhow!(
                "unsupported language '{other}' (expected 'python' or 'r')"
            )),
        }
    }
}

/// Payload sent to the execution backend. `code` is forwarded as-is, even when empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionRequest {
    pub language: Language,
    pub code: String,
}

impl ExecutionRequest {
    pub fn new(language: Language, code: impl Into<String>) -> Self {
        Self {
            language,
            code: code.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Artifact {
    Image { bytes: Bytes, mime_type: String },
    Document { markup: String },
}

impl Artifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Artifact::Image { .. } => "image",
            Artifact::Document { .. } => "document",
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            Artifact::Image { bytes, .. } => bytes.len(),
            Artifact::Document { markup } => markup.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What the interface currently shows. Exactly one variant at a time; entering a new
/// state drops the previous artifact or message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Pending,
    Succeeded(Artifact),
    Failed(ErrorInfo),
}

impl RunState {
    pub fn is_pending(&self) -> bool {
        matches!(self, RunState::Pending)
    }

    #[cfg(test)]
    pub fn is_settled(&self) -> bool {
        matches!(self, RunState::Succeeded(_) | RunState::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Pending => "pending",
            RunState::Succeeded(_) => "succeeded",
            RunState::Failed(_) => "failed",
        }
    }
}
