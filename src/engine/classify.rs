//! Content-type dispatch for execution responses.

use crate::error::SubmissionError;
use crate::model::{Artifact, HTML_MIME, PNG_MIME};
use bytes::Bytes;

/// Closed set of outcomes for a declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Image,
    Document,
    Unsupported,
}

/// Classify by prefix so parameters after the type token (`; charset=...`) are ignored.
/// `image/png` wins over `text/html`.
pub fn classify_content_type(content_type: &str) -> ContentClass {
    if content_type.starts_with(PNG_MIME) {
        ContentClass::Image
    } else if content_type.starts_with(HTML_MIME) {
        ContentClass::Document
    } else {
        ContentClass::Unsupported
    }
}

/// Turn an opaque response body into an artifact. The body is only decoded as text once
/// it is known to be a document; image bytes are kept untouched.
pub fn classify(content_type: &str, body: Bytes) -> Result<Artifact, SubmissionError> {
    match classify_content_type(content_type) {
        ContentClass::Image => Ok(Artifact::Image {
            bytes: body,
            mime_type: PNG_MIME.to_string(),
        }),
        ContentClass::Document => Ok(Artifact::Document {
            markup: String::from_utf8_lossy(&body).into_owned(),
        }),
        ContentClass::Unsupported => Err(SubmissionError::UnsupportedContentType {
            content_type: content_type.to_string(),
        }),
    }
}
