//! Progress-callback trait for audit lifecycle events.
//!
//! Inject an [`Arc<dyn AuditProgressCallback>`] via
//! [`crate::config::AuditConfigBuilder::progress_callback`] to follow a request
//! through its state machine:
//!
//! ```text
//! Idle ──▶ CollectingInputs ──▶ AwaitingModelResponse ──▶ Rendered ──▶ Idle
//!                 │                        │
//!                 └──────────┬─────────────┘
//!                            ▼
//!                          Failed ──▶ Idle
//! ```
//!
//! The CLI drives its spinner from these events; a test can count them.
//!
//! # Example
//!
//! ```rust
//! use legaliscan::{AuditConfig, AuditProgressCallback, AuditState};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Recorder {
//!     states: Mutex<Vec<AuditState>>,
//! }
//!
//! impl AuditProgressCallback for Recorder {
//!     fn on_state_change(&self, state: AuditState) {
//!         self.states.lock().unwrap().push(state);
//!     }
//! }
//!
//! let config = AuditConfig::builder()
//!     .progress_callback(Arc::new(Recorder::default()) as Arc<dyn AuditProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::FileKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where a single audit request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditState {
    Idle,
    CollectingInputs,
    AwaitingModelResponse,
    Rendered,
    Failed,
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuditState::Idle => "idle",
            AuditState::CollectingInputs => "collecting inputs",
            AuditState::AwaitingModelResponse => "awaiting model response",
            AuditState::Rendered => "rendered",
            AuditState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Called by the audit flow as it moves through its states.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// config holding them is shared with spawned blocking tasks.
pub trait AuditProgressCallback: Send + Sync {
    /// Called on every state transition, including the final return to
    /// [`AuditState::Idle`].
    fn on_state_change(&self, state: AuditState) {
        let _ = state;
    }

    /// Called after a file has been uploaded (PDF) or decoded (image).
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the data room
    /// * `total`: number of files in the data room
    /// * `name`: the file's display name
    /// * `kind`: how it was forwarded
    fn on_file_prepared(&self, index: usize, total: usize, name: &str, kind: FileKind) {
        let _ = (index, total, name, kind);
    }

    /// Called once when the request fails, before the transition back to idle.
    fn on_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AuditProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AuditConfig`].
pub type ProgressCallback = Arc<dyn AuditProgressCallback>;
