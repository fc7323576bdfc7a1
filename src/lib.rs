//! # legaliscan
//!
//! Run a due-diligence audit over a data room of contracts and site plans
//! with a multimodal model, and export the answer as a PDF.
//!
//! ## What it does
//!
//! A reviewer uploads PDFs (contracts, leases, permits) and images (site
//! plans, photos). The whole set goes to Gemini in one request, together with
//! a fixed instruction: cross-reference conflicting clauses such as Change of
//! Control terms, match the images against the contract text, highlight
//! invisible risks like handwritten notes or missing signatures, and finish
//! with a Liability Heatmap citing page numbers and file names. The plain-text
//! answer is shown as-is and can be downloaded as `Due_Diligence_Report.pdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! files
//!  │
//!  ├─ 1. Input    read paths, declare MIME from the extension
//!  ├─ 2. Collect  PDFs → File API upload, images → in-memory decode
//!  ├─ 3. Model    one generateContent call: [instruction, file₁, …, fileₙ]
//!  ├─ 4. Tidy     strip fences, normalise whitespace
//!  └─ 5. Render   single-font Helvetica PDF (optional)
//! ```
//!
//! Any failure aborts the request. There are no retries and no partial
//! reports.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use legaliscan::{audit, AuditConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GEMINI_API_KEY
//!     let config = AuditConfig::from_env();
//!     let files = vec![
//!         UploadedFile::from_name("contract.pdf", std::fs::read("contract.pdf")?),
//!         UploadedFile::from_name("site.png", std::fs::read("site.png")?),
//!     ];
//!     let output = audit(&files, &config).await?;
//!     println!("{}", output.report.display_text());
//!     if let Some(pdf) = output.pdf {
//!         pdf.write_to_dir(".").await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `legaliscan` binary (clap + anyhow + indicatif + tracing-subscriber + dotenvy) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! legaliscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{audit, audit_paths, audit_sync, audit_to_dir};
pub use config::{AuditConfig, AuditConfigBuilder};
pub use error::AuditError;
pub use output::{AuditOutput, AuditReport, AuditStats, FileKind, ReportPdf, UploadedFile};
pub use pipeline::gemini::GeminiClient;
pub use pipeline::model::{AuditModel, FileHandle, ModelInput, ModelInputList};
pub use progress::{AuditProgressCallback, AuditState, NoopProgressCallback, ProgressCallback};
