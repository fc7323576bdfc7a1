//! Error types for the legaliscan library.
//!
//! An audit is all-or-nothing: one unreadable file, one failed upload or one
//! rejected model call aborts the whole request and no partial report is ever
//! produced. That is why there is a single fatal error type, [`AuditError`],
//! returned from every top-level `audit*` function. The binary shows its
//! `Display` text to the user verbatim, so every message says what went wrong
//! and, where it helps, what to do about it.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the legaliscan library.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// An audit was triggered with an empty data room.
    #[error("No files were provided.\nUpload at least one PDF contract or site-plan image.")]
    NoFiles,

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The path exists but could not be read (a directory, an I/O fault).
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The declared MIME type is neither a PDF nor a supported image.
    #[error("Unsupported file type '{mime_type}' for '{name}'\nAccepted: PDF, PNG, JPEG.")]
    UnsupportedFileType { name: String, mime_type: String },

    /// The file was declared as a PDF but does not carry the `%PDF` header.
    #[error("File is not a valid PDF: '{name}'\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// An image upload could not be decoded.
    #[error("Could not decode image '{name}': {detail}")]
    ImageDecodeFailed { name: String, detail: String },

    /// Could not persist an uploaded PDF to a temporary location.
    #[error("Failed to stage '{name}' for upload: {source}")]
    StagingFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    // ── Remote errors ─────────────────────────────────────────────────────
    /// No API key was configured. Raised at the first remote call.
    #[error("GEMINI_API_KEY is not set.\nGet a key from https://ai.google.dev/ and export it (or put it in .env).")]
    ApiKeyMissing,

    /// The File API rejected or failed an upload.
    #[error("Upload of '{name}' failed: {detail}")]
    UploadFailed { name: String, detail: String },

    /// The model API returned a non-success status or an error body.
    #[error("Model API error ({status}): {message}")]
    ModelApi { status: u16, message: String },

    /// The request never produced an HTTP response (DNS, TLS, timeout…).
    #[error("Model request failed: {0}")]
    Transport(String),

    /// The model refused to answer the prompt.
    #[error("The model blocked the request: {reason}")]
    Blocked { reason: String },

    /// The model answered but returned no text.
    #[error("The model returned an empty response")]
    EmptyResponse,

    // ── Export errors ─────────────────────────────────────────────────────
    /// PDF serialisation failed.
    #[error("PDF export failed: {0}")]
    PdfExport(String),

    /// Could not create or write the exported report file.
    #[error("Failed to write report file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AuditError {
    fn from(e: reqwest::Error) -> Self {
        // Strip the URL: it carries nothing the user needs and may be long.
        AuditError::Transport(e.without_url().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_files_display() {
        let msg = AuditError::NoFiles.to_string();
        assert!(msg.contains("No files"), "got: {msg}");
    }

    #[test]
    fn read_failed_keeps_the_io_cause() {
        let e = AuditError::ReadFailed {
            path: PathBuf::from("/data/room"),
            source: std::io::Error::other("Is a directory"),
        };
        assert!(e.to_string().contains("/data/room"));
        assert!(e.to_string().contains("Is a directory"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn unsupported_type_display() {
        let e = AuditError::UnsupportedFileType {
            name: "notes.docx".into(),
            mime_type: "application/msword".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("notes.docx"));
        assert!(msg.contains("application/msword"));
    }

    #[test]
    fn model_api_display() {
        let e = AuditError::ModelApi {
            status: 403,
            message: "API key not valid".into(),
        };
        assert!(e.to_string().contains("403"));
        assert!(e.to_string().contains("API key not valid"));
    }

    #[test]
    fn api_key_missing_mentions_variable() {
        assert!(AuditError::ApiKeyMissing.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn blocked_display() {
        let e = AuditError::Blocked {
            reason: "SAFETY".into(),
        };
        assert!(e.to_string().contains("SAFETY"));
    }
}
