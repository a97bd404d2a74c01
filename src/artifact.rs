//! Context artifact persistence.
//!
//! Generated context is handed to the hosted model by file path, so every
//! generation writes a fresh UTF-8 file under a dedicated temp subdirectory.
//! Filenames carry a random component, which keeps concurrent tool calls
//! from clobbering each other's context. Artifacts are never cleaned up
//! here; the host owns the temp directory lifecycle.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Body written when generation produced no renderable content.
pub const EMPTY_CONTEXT_NOTICE: &str =
    "# No context generated\n\nNo files were found or all files were excluded by the specified patterns.\n";

/// Subdirectory of the system temp dir that holds context artifacts.
const ARTIFACT_SUBDIR: &str = "code2prompt-mcp";

const ENOSPC: i32 = 28;

/// Writes context artifacts into a fixed directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a writer targeting `dir`, or the default temp subdirectory
    /// when none is given.
    pub fn new(dir: Option<PathBuf>) -> Self {
        let dir = dir.unwrap_or_else(|| std::env::temp_dir().join(ARTIFACT_SUBDIR));
        Self { dir }
    }

    /// Directory artifacts are written into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persists `content` to a new uniquely named artifact and returns its
    /// absolute path. Empty or whitespace-only content is replaced by
    /// [`EMPTY_CONTEXT_NOTICE`] so downstream readers always find a
    /// well-formed file.
    #[instrument(skip(self, content), level = "debug")]
    pub async fn persist(&self, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("context_{}.txt", Uuid::new_v4().simple()));

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| map_write_error(path.clone(), e))?;

        let body = if content.trim().is_empty() {
            EMPTY_CONTEXT_NOTICE
        } else {
            content
        };

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| map_write_error(path.clone(), e))?;

        // Canonicalize after the write so the returned path is absolute and
        // symlink-free even when the configured dir is relative.
        let absolute = tokio::fs::canonicalize(&path)
            .await
            .map_err(|e| Error::ArtifactUnexpected {
                path: path.clone(),
                message: e.to_string(),
            })?;

        debug!(path = %absolute.display(), bytes = body.len(), "context artifact written");
        Ok(absolute)
    }
}

/// Reads a previously persisted artifact back as UTF-8.
pub async fn read_artifact(path: &Path) -> Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::ArtifactMissing {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(Error::ArtifactRead {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn map_write_error(path: PathBuf, source: std::io::Error) -> Error {
    if source.kind() == ErrorKind::PermissionDenied {
        return Error::ArtifactPermission { path, source };
    }
    if source.kind() == ErrorKind::StorageFull || source.raw_os_error() == Some(ENOSPC) {
        return Error::ArtifactOutOfSpace { path };
    }
    Error::ArtifactWrite { path, source }
}
