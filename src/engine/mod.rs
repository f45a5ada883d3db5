mod classify;
mod http;

pub use classify::classify;
pub use http::HttpBackend;

use crate::error::SubmissionError;
use crate::model::{Artifact, ExecutionRequest};
use async_trait::async_trait;
use bytes::Bytes;

/// Response retained as opaque bytes until classified.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// Declared `Content-Type`; `None` when the header is absent or not visible ASCII.
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Remote execution service. Implementations return `Err` for anything that is not a
/// 2xx response with a readable body.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<RawResponse, SubmissionError>;
}

/// Issue one request and classify whatever comes back.
pub async fn run_request<B>(
    backend: &B,
    request: &ExecutionRequest,
) -> Result<Artifact, SubmissionError>
where
    B: ExecutionBackend + ?Sized,
{
    let raw = backend.execute(request).await?;
    tracing::debug!(
        content_type = ?raw.content_type,
        bytes = raw.body.len(),
        "execution response received"
    );
    // A response that declares no type cannot be dispatched at all.
    let content_type = raw.content_type.ok_or(SubmissionError::MissingContentType)?;
    classify(&content_type, raw.body)
}
