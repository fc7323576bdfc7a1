//! Data types flowing into and out of an audit.

use crate::error::AuditError;
use crate::pipeline::{postprocess, render};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Fixed name of the exported report.
pub const REPORT_FILENAME: &str = "Due_Diligence_Report.pdf";

/// MIME type of the exported report.
pub const PDF_MIME: &str = "application/pdf";

/// How a file travels to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Uploaded through the File API and referenced by handle.
    Pdf,
    /// Decoded locally and sent inline.
    Image,
}

impl FileKind {
    /// Classify a declared MIME type. `None` for anything we don't forward.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(FileKind::Pdf),
            "image/png" | "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(FileKind::Image),
            _ => None,
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Pdf => f.write_str("pdf"),
            FileKind::Image => f.write_str("image"),
        }
    }
}

/// A named binary blob with a declared MIME type.
///
/// Consumed once per audit request and not retained afterwards.
#[derive(Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Declare the MIME type from the file name's extension.
    ///
    /// Unknown extensions get `application/octet-stream`, which
    /// [`UploadedFile::kind`] then rejects.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self::new(name, mime_type, bytes)
    }

    /// How this file will be forwarded, or `UnsupportedFileType`.
    pub fn kind(&self) -> Result<FileKind, AuditError> {
        FileKind::from_mime(&self.mime_type).ok_or_else(|| AuditError::UnsupportedFileType {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// The model's plain-text answer. Immutable once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditReport {
    text: String,
}

impl AuditReport {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The text exactly as the model returned it.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text tidied for on-screen display.
    pub fn display_text(&self) -> String {
        postprocess::tidy_report(&self.text)
    }

    /// Render the display text into a single-font PDF.
    ///
    /// This is the only way to obtain a [`ReportPdf`], so an export can never
    /// exist without a report.
    pub fn to_pdf(&self) -> Result<ReportPdf, AuditError> {
        let bytes = render::render_report_pdf(&self.display_text())?;
        Ok(ReportPdf {
            filename: REPORT_FILENAME.to_string(),
            mime_type: PDF_MIME.to_string(),
            bytes,
        })
    }
}

impl fmt::Display for AuditReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A downloadable PDF export of an [`AuditReport`].
///
/// Read-only outside the crate: the fields are private, so an export can only
/// come from [`AuditReport::to_pdf`].
///
/// ```compile_fail
/// use legaliscan::ReportPdf;
///
/// let pdf = ReportPdf {
///     filename: "Due_Diligence_Report.pdf".into(),
///     mime_type: "application/pdf".into(),
///     bytes: Vec::new(),
/// };
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ReportPdf {
    filename: String,
    mime_type: String,
    #[serde(rename = "size_bytes", serialize_with = "serialize_len")]
    bytes: Vec<u8>,
}

fn serialize_len<S: serde::Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(bytes.len() as u64)
}

impl ReportPdf {
    /// Always [`REPORT_FILENAME`].
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Always [`PDF_MIME`].
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// The rendered PDF document.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write the export into `dir` under its fixed filename.
    ///
    /// Uses atomic write (temp file + rename) to prevent partial files.
    pub async fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, AuditError> {
        let dir = dir.as_ref();
        let path = dir.join(&self.filename);
        let write_err = |source| AuditError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(write_err)?;

        let tmp_path = path.with_extension("pdf.tmp");
        tokio::fs::write(&tmp_path, &self.bytes)
            .await
            .map_err(write_err)?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(write_err)?;

        Ok(path)
    }
}

/// Timing and size statistics for one audit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_files: usize,
    pub pdf_files: usize,
    pub image_files: usize,
    pub model: String,
    pub report_chars: usize,
    pub collect_duration_ms: u64,
    pub model_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful audit produces.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutput {
    pub report: AuditReport,
    /// Present when [`crate::config::AuditConfig::export_pdf`] is set.
    pub pdf: Option<ReportPdf>,
    pub stats: AuditStats,
}
