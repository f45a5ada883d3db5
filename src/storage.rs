//! Writing artifacts to disk.
//!
//! Images are written byte-for-byte. Documents are never written raw: the file is the
//! sandboxed host page so opening it in a browser keeps the isolation boundary.

use crate::model::Artifact;
use crate::presenter::sandboxed_host_page;
use anyhow::{Context, Result};
use rand::RngCore;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub fn file_extension(artifact: &Artifact) -> &'static str {
    match artifact {
        Artifact::Image { .. } => "png",
        Artifact::Document { .. } => "html",
    }
}

/// Bytes that end up on disk for an artifact.
pub fn file_contents(artifact: &Artifact) -> Cow<'_, [u8]> {
    match artifact {
        Artifact::Image { bytes, .. } => Cow::Borrowed(bytes.as_ref()),
        Artifact::Document { markup } => Cow::Owned(sandboxed_host_page(markup).into_bytes()),
    }
}

/// `vizrun-<utc timestamp>-<suffix>.<ext>`
pub fn default_file_name(artifact: &Artifact) -> String {
    let ts = time::OffsetDateTime::now_utc()
        .format(time::macros::format_description!(
            "[year]-[month]-[day]_[hour]-[minute]-[second]"
        ))
        .unwrap_or_else(|_| "now".into());
    let mut b = [0u8; 3];
    rand::thread_rng().fill_bytes(&mut b);
    let suffix: String = b.iter().map(|x| format!("{x:02x}")).collect();
    format!("vizrun-{ts}-{suffix}.{}", file_extension(artifact))
}

/// Write an artifact to an explicit path, creating parent directories.
pub fn write_artifact(path: &Path, artifact: &Artifact) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    std::fs::write(path, file_contents(artifact))
        .with_context(|| format!("write artifact to {}", path.display()))?;
    tracing::info!(path = %path.display(), kind = artifact.kind(), "artifact written");
    Ok(())
}

/// Save an artifact under `dir` with a generated name. Returns the absolute path.
pub fn save_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    let dir = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        std::env::current_dir()
            .context("get current directory")?
            .join(dir)
    };
    let path = dir.join(default_file_name(artifact));
    write_artifact(&path, artifact)?;
    Ok(path)
}
