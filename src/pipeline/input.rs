//! Input resolution: turn user-supplied paths into [`UploadedFile`]s.
//!
//! The library itself works on in-memory blobs (that is what an upload widget
//! hands over). This stage is the CLI's stand-in for the widget: it reads each
//! path, declares a MIME type from the extension and maps I/O failures onto
//! the errors a user can act on.

use crate::error::AuditError;
use crate::output::UploadedFile;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read a local file into an [`UploadedFile`].
///
/// The display name is the file's base name, which is what the model will
/// be asked to cite.
pub async fn load_file(path: impl AsRef<Path>) -> Result<UploadedFile, AuditError> {
    let path = path.as_ref();

    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AuditError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => AuditError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AuditError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let name = display_name(path);
    let file = UploadedFile::from_name(name, bytes);
    debug!(
        "Loaded {} ({}, {} bytes)",
        path.display(),
        file.mime_type,
        file.bytes.len()
    );
    Ok(file)
}

/// Read every path in order. The first failure aborts the whole set.
pub async fn load_files(paths: &[PathBuf]) -> Result<Vec<UploadedFile>, AuditError> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(load_file(path).await?);
    }
    Ok(files)
}

/// Check the `%PDF` magic bytes of a blob declared as PDF.
pub fn ensure_pdf_magic(file: &UploadedFile) -> Result<(), AuditError> {
    if file.bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(AuditError::NotAPdf {
            name: file.name.clone(),
            magic: file.bytes.iter().take(4).copied().collect(),
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
