use crate::model::{ErrorInfo, EXECUTION_FAILED_MESSAGE, UNSUPPORTED_RESPONSE_MESSAGE};
use reqwest::StatusCode;
use thiserror::Error;

/// Ways a single submission can fail. All of them are terminal for that submission.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("request to execution backend failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("execution backend answered {status}")]
    Status { status: StatusCode },

    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    #[error("response declared no readable content type")]
    MissingContentType,

    #[error("unsupported content type '{content_type}'")]
    UnsupportedContentType { content_type: String },
}

impl SubmissionError {
    /// Collapse to the message shown to the user.
    pub fn to_error_info(&self) -> ErrorInfo {
        match self {
            SubmissionError::UnsupportedContentType { .. } => {
                ErrorInfo::new(UNSUPPORTED_RESPONSE_MESSAGE)
            }
            SubmissionError::Transport(_)
            | SubmissionError::Status { .. }
            | SubmissionError::Body(_)
            | SubmissionError::MissingContentType => ErrorInfo::new(EXECUTION_FAILED_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_map_to_execution_failed() {
        let err = SubmissionError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        };
        assert_eq!(err.to_error_info().message, EXECUTION_FAILED_MESSAGE);
        assert_eq!(err.to_string(), "execution backend answered 500 Internal Server Error");
    }

    #[test]
    fn missing_content_type_is_an_execution_failure() {
        let err = SubmissionError::MissingContentType;
        assert_eq!(err.to_error_info().message, EXECUTION_FAILED_MESSAGE);
    }

    #[test]
    fn unsupported_content_type_has_its_own_message() {
        let err = SubmissionError::UnsupportedContentType {
            content_type: "application/json".into(),
        };
        assert_eq!(err.to_error_info().message, UNSUPPORTED_RESPONSE_MESSAGE);
    }
}
