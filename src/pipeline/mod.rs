//! Pipeline stages for a due-diligence audit.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the remote model can be swapped without touching rendering.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ collect ──▶ model ──▶ postprocess ──▶ render
//! (paths)   (upload /   (Gemini)  (tidy text)     (PDF bytes)
//!            decode)
//! ```
//!
//! 1. [`input`]: read user-supplied paths into [`crate::UploadedFile`]s
//! 2. [`collect`]: the Input Collector: upload PDFs, decode images and
//!    assemble the ordered model input list
//! 3. [`encode`]: PNG-encode and base64-wrap decoded images for the wire
//! 4. [`model`]: the [`model::AuditModel`] seam; [`gemini`] is the REST
//!    implementation and the only stage with network I/O
//! 5. [`postprocess`]: deterministic cleanup of the model's text
//! 6. [`render`]: the Report Renderer: single-font PDF via `lopdf`,
//!    with [`transcode`] handling the lossy WinAnsi conversion

pub mod collect;
pub mod encode;
pub mod gemini;
pub mod input;
pub mod model;
pub mod postprocess;
pub mod render;
pub mod transcode;
