//! The Input Collector: data room → ordered model input list.
//!
//! ## Contract
//!
//! Given a non-empty set of files, produce `[instruction, file₁, …, fileₙ]`
//! in upload order. PDFs are written to a private staging directory and
//! pushed through [`AuditModel::upload_file`]; images are decoded in memory.
//! The first failure of any kind aborts the whole collection. Nothing is
//! retried and no partial list escapes.
//!
//! Every file is classified before anything is staged or uploaded, so an
//! unsupported file never causes a wasted upload of its neighbours.

use crate::error::AuditError;
use crate::output::{FileKind, UploadedFile};
use crate::pipeline::input::ensure_pdf_magic;
use crate::pipeline::model::{AuditModel, DecodedImage, ModelInputList};
use crate::progress::ProgressCallback;
use std::path::PathBuf;
use tempfile::TempDir;
use tracing::{debug, info};

/// Result of a successful collection.
#[derive(Debug)]
pub struct CollectedInputs {
    pub inputs: ModelInputList,
    pub pdf_files: usize,
    pub image_files: usize,
}

/// Build the model input list for a data room.
///
/// # Errors
/// - [`AuditError::NoFiles`] for an empty set (the model is never touched)
/// - [`AuditError::UnsupportedFileType`] / [`AuditError::NotAPdf`] for bad input
/// - [`AuditError::StagingFailed`] if a PDF cannot be written for upload
/// - [`AuditError::ImageDecodeFailed`] for a corrupt image
/// - whatever [`AuditModel::upload_file`] returns
pub async fn collect_inputs(
    files: &[UploadedFile],
    instruction: &str,
    model: &dyn AuditModel,
    progress: Option<&ProgressCallback>,
) -> Result<CollectedInputs, AuditError> {
    if files.is_empty() {
        return Err(AuditError::NoFiles);
    }

    let kinds = files
        .iter()
        .map(UploadedFile::kind)
        .collect::<Result<Vec<_>, _>>()?;

    let total = files.len();
    let mut inputs = ModelInputList::new(instruction);
    let staging = TempDir::new().map_err(|source| AuditError::StagingFailed {
        name: "staging directory".to_string(),
        source,
    })?;
    let (mut pdf_files, mut image_files) = (0, 0);

    for (i, (file, kind)) in files.iter().zip(kinds).enumerate() {
        match kind {
            FileKind::Pdf => {
                ensure_pdf_magic(file)?;
                let path = stage_pdf(&staging, i, file).await?;
                let handle = model.upload_file(&path, &file.name, &file.mime_type).await?;
                info!("Uploaded {} as {}", file.name, handle.name);
                inputs.push_file(handle);
                pdf_files += 1;
            }
            FileKind::Image => {
                let image = decode_image(file).await?;
                inputs.push_image(image);
                image_files += 1;
            }
        }

        if let Some(cb) = progress {
            cb.on_file_prepared(i + 1, total, &file.name, kind);
        }
    }

    debug!(
        "Collected {} inputs ({} pdf, {} image)",
        inputs.len(),
        pdf_files,
        image_files
    );

    Ok(CollectedInputs {
        inputs,
        pdf_files,
        image_files,
    })
}

/// Write a PDF into the staging directory under a collision-free name.
async fn stage_pdf(dir: &TempDir, index: usize, file: &UploadedFile) -> Result<PathBuf, AuditError> {
    let path = dir
        .path()
        .join(format!("{:03}-{}", index + 1, sanitise_file_name(&file.name)));
    tokio::fs::write(&path, &file.bytes)
        .await
        .map_err(|source| AuditError::StagingFailed {
            name: file.name.clone(),
            source,
        })?;
    debug!("Staged {} at {}", file.name, path.display());
    Ok(path)
}

/// Decode an image off the async executor; decoding is CPU-bound.
async fn decode_image(file: &UploadedFile) -> Result<DecodedImage, AuditError> {
    let name = file.name.clone();
    let bytes = file.bytes.clone();

    let task_name = name.clone();
    let decoded = tokio::task::spawn_blocking(move || DecodedImage::decode(task_name, bytes))
        .await
        .map_err(|e| AuditError::Internal(format!("Decode task panicked: {}", e)))?
        .map_err(|e| AuditError::ImageDecodeFailed {
            name: name.clone(),
            detail: e.to_string(),
        })?;

    debug!(
        "Decoded {} ({}×{})",
        name,
        decoded.image.width(),
        decoded.image.height()
    );
    Ok(decoded)
}

/// Keep ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
fn sanitise_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "upload.pdf".to_string()
    } else {
        cleaned
    }
}
