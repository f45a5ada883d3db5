//! Result presentation.
//!
//! [`present`] derives everything the UI shows from a `RunState` snapshot and keeps no
//! state of its own. At most one result region (image, document, error) is ever produced.
//!
//! Untrusted HTML is never shown directly: it is wrapped in a host page whose only
//! content is an `<iframe sandbox="allow-scripts" srcdoc=...>`. Without
//! `allow-same-origin` the frame runs in an opaque origin, so its scripts cannot reach
//! the host page, its storage or cookies, and cannot navigate the parent.

use crate::model::{Artifact, RunState};
use serde::Serialize;

/// Sandbox tokens granted to untrusted documents. Scripts only.
pub const DOCUMENT_SANDBOX: &str = "allow-scripts";

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

pub const SUBMIT_LABEL: &str = "Generate";
pub const SUBMIT_PENDING_LABEL: &str = "Generating...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    Idle,
    Pending,
    Image(ImageView),
    Document(DocumentView),
    Error(ErrorNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    pub mime_type: String,
    pub size_bytes: usize,
    /// Width and height from the PNG header, when the bytes carry one.
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentView {
    pub markup_bytes: usize,
    #[serde(skip)]
    pub host_page: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub message: String,
}

impl View {
    pub fn is_pending(&self) -> bool {
        matches!(self, View::Pending)
    }

    /// Label of the submit affordance. Disabled while a submission is in flight.
    pub fn submit_label(&self) -> &'static str {
        if self.is_pending() {
            SUBMIT_PENDING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    pub fn submit_enabled(&self) -> bool {
        !self.is_pending()
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Image(_) => "Static Visualization",
            View::Document(_) => "Interactive Visualization",
            View::Error(_) => "Error",
            View::Idle | View::Pending => "Result",
        }
    }
}

pub fn present(state: &RunState) -> View {
    match state {
        RunState::Idle => View::Idle,
        RunState::Pending => View::Pending,
        RunState::Succeeded(Artifact::Image { bytes, mime_type }) => View::Image(ImageView {
            mime_type: mime_type.clone(),
            size_bytes: bytes.len(),
            dimensions: png_dimensions(bytes),
        }),
        RunState::Succeeded(Artifact::Document { markup }) => View::Document(DocumentView {
            markup_bytes: markup.len(),
            host_page: sandboxed_host_page(markup),
        }),
        RunState::Failed(info) => View::Error(ErrorNotice {
            message: info.message.clone(),
        }),
    }
}

/// Read width/height from the IHDR chunk that must follow the PNG signature.
pub fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || bytes[..8] != PNG_SIGNATURE || &bytes[12..16] != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// Build the page that hosts an untrusted document in a sandboxed frame.
pub fn sandboxed_host_page(markup: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="referrer" content="no-referrer">
<title>Interactive Visualization</title>
</head>
<body style="margin:0;font-family:sans-serif">
<iframe title="visualization-output" sandbox="{sandbox}" referrerpolicy="no-referrer" style="width:100%;height:100vh;border:0" srcdoc="{srcdoc}"></iframe>
</body>
</html>
"#,
        sandbox = DOCUMENT_SANDBOX,
        srcdoc = escape_attribute(markup),
    )
}

fn escape_attribute(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + raw.len() / 8);
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorInfo, EXECUTION_FAILED_MESSAGE};
    use bytes::Bytes;

    fn png_header(width: u32, height: u32) -> Vec<u8> {
        let mut v = PNG_SIGNATURE.to_vec();
        v.extend_from_slice(&13u32.to_be_bytes());
        v.extend_from_slice(b"IHDR");
        v.extend_from_slice(&width.to_be_bytes());
        v.extend_from_slice(&height.to_be_bytes());
        v.extend_from_slice(&[8, 6, 0, 0, 0]);
        v
    }

    fn all_states() -> Vec<RunState> {
        vec![
            RunState::Idle,
            RunState::Pending,
            RunState::Succeeded(Artifact::Image {
                bytes: Bytes::from(png_header(640, 480)),
                mime_type: "image/png".into(),
            }),
            RunState::Succeeded(Artifact::Document {
                markup: "<html></html>".into(),
            }),
            RunState::Failed(ErrorInfo::new(EXECUTION_FAILED_MESSAGE)),
        ]
    }

    /// Image, document and error notice each occupy the result area.
    fn result_regions(view: &View) -> usize {
        match view {
            View::Image(_) | View::Document(_) | View::Error(_) => 1,
            View::Idle | View::Pending => 0,
        }
    }

    #[test]
    fn at_most_one_result_region() {
        for state in all_states() {
            let view = present(&state);
            assert!(result_regions(&view) <= 1, "{state:?}");
        }
        assert_eq!(result_regions(&present(&RunState::Idle)), 0);
        assert_eq!(result_regions(&present(&RunState::Pending)), 0);
    }

    #[test]
    fn submit_is_disabled_only_while_pending() {
        for state in all_states() {
            let view = present(&state);
            assert_eq!(view.submit_enabled(), !state.is_pending());
        }
        assert_eq!(present(&RunState::Pending).submit_label(), "Generating...");
        assert_eq!(present(&RunState::Idle).submit_label(), "Generate");
    }

    #[test]
    fn image_view_reads_png_dimensions() {
        let view = present(&all_states()[2]);
        match view {
            View::Image(img) => {
                assert_eq!(img.mime_type, "image/png");
                assert_eq!(img.dimensions, Some((640, 480)));
                assert_eq!(img.size_bytes, 29);
            }
            other => panic!("expected image view, got {other:?}"),
        }
    }

    #[test]
    fn truncated_or_foreign_bytes_have_no_dimensions() {
        assert_eq!(png_dimensions(&[0x89, b'P', b'N', b'G']), None);
        assert_eq!(png_dimensions(&[0u8; 32]), None);
    }

    #[test]
    fn error_view_carries_message_verbatim() {
        let view = present(&RunState::Failed(ErrorInfo::new("Unsupported response type.")));
        assert_eq!(
            view,
            View::Error(ErrorNotice {
                message: "Unsupported response type.".into()
            })
        );
    }

    #[test]
    fn document_is_framed_with_scripts_only_sandbox() {
        let page = sandboxed_host_page("<script>parent.document.body.innerHTML=''</script>");
        assert!(page.contains(r#"sandbox="allow-scripts""#));
        for forbidden in [
            "allow-same-origin",
            "allow-top-navigation",
            "allow-popups",
            "allow-forms",
            "allow-modals",
        ] {
            assert!(!page.contains(forbidden), "{forbidden}");
        }
        // The only live <script> would be one inside the frame document; none in the host.
        assert!(!page.contains("<script>"));
    }

    #[test]
    fn markup_cannot_escape_srcdoc_attribute() {
        let hostile = r#""></iframe><script>alert(document.cookie)</script><iframe src="x"#;
        let page = sandboxed_host_page(hostile);
        assert_eq!(page.matches("<iframe").count(), 1);
        assert_eq!(page.matches("</iframe>").count(), 1);
        assert!(page.contains("&quot;&gt;&lt;/iframe&gt;&lt;script&gt;"));
    }

    #[test]
    fn escaping_handles_ampersands_and_quotes() {
        assert_eq!(
            escape_attribute(r#"a & b "c" 'd' <e>"#),
            "a &amp; b &quot;c&quot; &#39;d&#39; &lt;e&gt;"
        );
    }

    #[test]
    fn document_view_wraps_markup() {
        let view = present(&RunState::Succeeded(Artifact::Document {
            markup: "<p>hi</p>".into(),
        }));
        match view {
            View::Document(doc) => {
                assert_eq!(doc.markup_bytes, 9);
                assert!(doc.host_page.contains("srcdoc=\"&lt;p&gt;hi&lt;/p&gt;\""));
            }
            other => panic!("expected document view, got {other:?}"),
        }
    }
}
