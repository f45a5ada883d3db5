use super::{ExecutionBackend, RawResponse};
use crate::error::SubmissionError;
use crate::model::ExecutionRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};

/// Longest slice of an error body that ends up in the debug log.
const ERROR_BODY_LOG_LIMIT: usize = 512;

/// reqwest-backed client for the execution endpoint.
///
/// No request timeout is configured: a call settles only when the transport does.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ExecutionBackend for HttpBackend {
    async fn execute(&self, request: &ExecutionRequest) -> Result<RawResponse, SubmissionError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, HeaderValue::from_static("image/png, text/html;q=0.9, */*;q=0.1"))
            .json(request)
            .send()
            .await
            .map_err(SubmissionError::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            // The backend's error body is never shown to the user; keep a bounded copy in the log.
            if let Ok(body) = resp.text().await {
                let end = body
                    .char_indices()
                    .nth(ERROR_BODY_LOG_LIMIT)
                    .map(|(i, _)| i)
                    .unwrap_or(body.len());
                tracing::debug!(%status, body = &body[..end], "execution backend error body");
            }
            return Err(SubmissionError::Status { status });
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = resp.bytes().await.map_err(SubmissionError::Body)?;

        Ok(RawResponse { content_type, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::run_request;
    use crate::model::{Artifact, Language, EXECUTION_FAILED_MESSAGE, UNSUPPORTED_RESPONSE_MESSAGE};
    use axum::{
        body::Body,
        extract::State,
        http::{header, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Json, Router,
    };
    use std::sync::Arc;
    use tokio::{net::TcpListener, sync::Mutex};

    const PNG_BYTES: &[u8] = &[0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xfe];

    #[derive(Clone, Default)]
    struct MockState {
        received: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    async fn png_handler(
        State(state): State<MockState>,
        Json(body): Json<serde_json::Value>,
    ) -> impl IntoResponse {
        state.received.lock().await.push(body);
        ([(header::CONTENT_TYPE, "image/png")], PNG_BYTES.to_vec())
    }

    async fn html_handler(Json(_body): Json<serde_json::Value>) -> impl IntoResponse {
        (
            [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
            "<html><body>plot</body></html>",
        )
    }

    async fn octet_handler() -> impl IntoResponse {
        (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            vec![1u8, 2, 3],
        )
    }

    async fn untyped_handler() -> Response {
        Response::new(Body::from(vec![1u8, 2, 3]))
    }

    async fn error_handler() -> impl IntoResponse {
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Only Python is supported for now" })),
        )
    }

    async fn spawn_mock_backend() -> anyhow::Result<(String, MockState)> {
        let state = MockState::default();
        let app = Router::new()
            .route("/png", post(png_handler))
            .route("/html", post(html_handler))
            .route("/octet", post(octet_handler))
            .route("/untyped", post(untyped_handler))
            .route("/error", post(error_handler))
            .with_state(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok((format!("http://{addr}"), state))
    }

    fn backend(url: String) -> HttpBackend {
        HttpBackend::new(url, "vizrun-test").expect("client")
    }

    #[tokio::test]
    async fn posts_json_payload_and_returns_png_bytes_untouched() {
        let (base, state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/png"));

        let request = ExecutionRequest::new(Language::Python, "print(1)");
        let raw = backend.execute(&request).await.expect("execute");

        assert_eq!(raw.content_type.as_deref(), Some("image/png"));
        assert_eq!(raw.body.as_ref(), PNG_BYTES);

        let received = state.received.lock().await;
        assert_eq!(
            received.as_slice(),
            &[serde_json::json!({ "language": "python", "code": "print(1)" })]
        );
    }

    #[tokio::test]
    async fn empty_code_is_forwarded() {
        let (base, state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/png"));

        backend
            .execute(&ExecutionRequest::new(Language::R, ""))
            .await
            .expect("execute");

        let received = state.received.lock().await;
        assert_eq!(received[0], serde_json::json!({ "language": "r", "code": "" }));
    }

    #[tokio::test]
    async fn html_response_becomes_document() {
        let (base, _state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/html"));

        let artifact = run_request(&backend, &ExecutionRequest::new(Language::R, "plot(1)"))
            .await
            .expect("artifact");
        assert_eq!(
            artifact,
            Artifact::Document {
                markup: "<html><body>plot</body></html>".into()
            }
        );
    }

    #[tokio::test]
    async fn octet_stream_is_unsupported() {
        let (base, _state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/octet"));

        let err = run_request(&backend, &ExecutionRequest::new(Language::Python, "x"))
            .await
            .unwrap_err();
        assert_eq!(err.to_error_info().message, UNSUPPORTED_RESPONSE_MESSAGE);
    }

    #[tokio::test]
    async fn response_without_content_type_is_execution_failure() {
        let (base, _state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/untyped"));

        let raw = backend
            .execute(&ExecutionRequest::new(Language::Python, "x"))
            .await
            .expect("execute");
        assert_eq!(raw.content_type, None);

        let err = run_request(&backend, &ExecutionRequest::new(Language::Python, "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::MissingContentType));
        assert_eq!(err.to_error_info().message, EXECUTION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn non_2xx_is_execution_failure_even_with_json_body() {
        let (base, _state) = spawn_mock_backend().await.expect("spawn server");
        let backend = backend(format!("{base}/error"));

        let err = backend
            .execute(&ExecutionRequest::new(Language::R, "plot(1)"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmissionError::Status { status } if status == reqwest::StatusCode::BAD_REQUEST
        ));
        assert_eq!(err.to_error_info().message, EXECUTION_FAILED_MESSAGE);
    }

    #[tokio::test]
    async fn connection_refused_is_transport_failure() {
        // Reserve a port, then release it so nothing is listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let backend = backend(format!("http://{addr}/run"));
        let err = backend
            .execute(&ExecutionRequest::new(Language::Python, "print(1)"))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmissionError::Transport(_)));
        assert_eq!(err.to_error_info().message, EXECUTION_FAILED_MESSAGE);
    }
}
