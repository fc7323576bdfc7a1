//! The audit request handler.
//!
//! One flow covers both "show the report" and "show the report and offer the
//! PDF": [`AuditConfig::export_pdf`] decides whether the renderer runs. The
//! flow drives the [`AuditState`] machine through the configured
//! [`crate::progress::AuditProgressCallback`] and always ends back in
//! [`AuditState::Idle`], whether it succeeded or not.

use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::output::{AuditOutput, AuditReport, AuditStats, UploadedFile};
use crate::pipeline::collect::collect_inputs;
use crate::pipeline::gemini::GeminiClient;
use crate::pipeline::input;
use crate::pipeline::model::AuditModel;
use crate::progress::AuditState;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Run a due-diligence audit over a data room.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `files`: the data room, in the order it should be presented to the model
/// * `config`: audit configuration
///
/// # Errors
/// Any failure aborts the request and no partial report is returned:
/// - [`AuditError::NoFiles`] for an empty data room (the model is never called)
/// - input errors from classification, staging or image decoding
/// - upload and model errors from the remote call
/// - [`AuditError::PdfExport`] if the export was requested and failed
pub async fn audit(
    files: &[UploadedFile],
    config: &AuditConfig,
) -> Result<AuditOutput, AuditError> {
    let result = run(files, config).await;

    if let Some(ref cb) = config.progress_callback {
        if let Err(ref e) = result {
            cb.on_state_change(AuditState::Failed);
            cb.on_error(&e.to_string());
        }
        cb.on_state_change(AuditState::Idle);
    }
    if let Err(ref e) = result {
        warn!("Audit failed: {}", e);
    }

    result
}

/// Read `paths` from disk, then [`audit`] them.
pub async fn audit_paths(
    paths: &[PathBuf],
    config: &AuditConfig,
) -> Result<AuditOutput, AuditError> {
    let files = input::load_files(paths).await?;
    audit(&files, config).await
}

/// Run an audit and write the PDF export into `dir`.
///
/// The export is produced regardless of [`AuditConfig::export_pdf`]. Returns
/// the output together with the path of the written file.
pub async fn audit_to_dir(
    files: &[UploadedFile],
    dir: impl AsRef<Path>,
    config: &AuditConfig,
) -> Result<(AuditOutput, PathBuf), AuditError> {
    let config = AuditConfig {
        export_pdf: true,
        ..config.clone()
    };
    let output = audit(files, &config).await?;
    let pdf = output
        .pdf
        .as_ref()
        .ok_or_else(|| AuditError::Internal("export requested but not produced".into()))?;
    let path = pdf.write_to_dir(dir).await?;
    info!("Report written to {}", path.display());
    Ok((output, path))
}

/// Synchronous wrapper around [`audit`].
///
/// Creates a temporary tokio runtime internally.
pub fn audit_sync(files: &[UploadedFile], config: &AuditConfig) -> Result<AuditOutput, AuditError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AuditError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(audit(files, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(files: &[UploadedFile], config: &AuditConfig) -> Result<AuditOutput, AuditError> {
    let total_start = Instant::now();
    let notify = |state| {
        if let Some(ref cb) = config.progress_callback {
            cb.on_state_change(state);
        }
    };

    // ── Step 1: Collect inputs ───────────────────────────────────────────
    notify(AuditState::CollectingInputs);
    if files.is_empty() {
        return Err(AuditError::NoFiles);
    }
    info!("Starting audit of {} file(s)", files.len());

    let model = resolve_model(config)?;
    let collect_start = Instant::now();
    let collected = collect_inputs(
        files,
        config.instruction(),
        model.as_ref(),
        config.progress_callback.as_ref(),
    )
    .await?;
    let collect_duration_ms = collect_start.elapsed().as_millis() as u64;

    // ── Step 2: Remote call ──────────────────────────────────────────────
    notify(AuditState::AwaitingModelResponse);
    let model_start = Instant::now();
    let text = model.generate(&collected.inputs).await?;
    let model_duration_ms = model_start.elapsed().as_millis() as u64;
    debug!("Model returned {} chars in {}ms", text.len(), model_duration_ms);
    let report = AuditReport::new(text);

    // ── Step 3: Export ───────────────────────────────────────────────────
    let pdf = if config.export_pdf {
        Some(report.to_pdf()?)
    } else {
        None
    };
    notify(AuditState::Rendered);

    let stats = AuditStats {
        total_files: files.len(),
        pdf_files: collected.pdf_files,
        image_files: collected.image_files,
        model: model.model_name().to_string(),
        report_chars: report.text().chars().count(),
        collect_duration_ms,
        model_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Audit complete: {} file(s), {}ms total",
        stats.total_files, stats.total_duration_ms
    );

    Ok(AuditOutput { report, pdf, stats })
}

/// A pre-built client wins; otherwise build a Gemini client from the config.
fn resolve_model(config: &AuditConfig) -> Result<Arc<dyn AuditModel>, AuditError> {
    if let Some(ref client) = config.model_client {
        return Ok(Arc::clone(client));
    }
    Ok(Arc::new(GeminiClient::from_config(config)?))
}
