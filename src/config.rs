//! Configuration for a due-diligence audit.
//!
//! Everything an audit needs from the outside world lives in one
//! [`AuditConfig`]: the API credential, the model name, the instruction and
//! the export switch. It is built once at startup (from flags, the
//! environment or the builder) and then only ever passed by reference to the
//! request handler, so nothing about an audit depends on ambient global state.

use crate::error::AuditError;
use crate::pipeline::model::AuditModel;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default Gemini model. Long context and native PDF understanding.
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Default REST endpoint for the Gemini API.
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Environment variable holding the API credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration for an audit request.
///
/// Built via [`AuditConfig::builder()`], [`AuditConfig::from_env()`] or
/// [`AuditConfig::default()`].
///
/// # Example
/// ```rust
/// use legaliscan::AuditConfig;
///
/// let config = AuditConfig::builder()
///     .api_key("my-key")
///     .model("gemini-1.5-flash")
///     .export_pdf(false)
///     .build()
///     .unwrap();
/// assert_eq!(config.model, "gemini-1.5-flash");
/// ```
#[derive(Clone)]
pub struct AuditConfig {
    /// API credential. `None` is accepted here; the remote call then fails
    /// with [`AuditError::ApiKeyMissing`].
    pub api_key: Option<String>,

    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Base URL of the REST API. Default: [`DEFAULT_API_BASE`].
    pub api_base_url: String,

    /// Replacement for [`crate::prompts::AUDIT_INSTRUCTION`].
    pub instruction: Option<String>,

    /// Sampling temperature. `None` leaves the model default in place.
    pub temperature: Option<f32>,

    /// Output token cap. `None` leaves the model default in place.
    pub max_output_tokens: Option<u32>,

    /// Timeout for each HTTP request in seconds. Default: 300.
    ///
    /// A whole data room can take minutes to analyse.
    pub request_timeout_secs: u64,

    /// Produce a PDF export alongside the report. Default: true.
    pub export_pdf: bool,

    /// Pre-constructed model client. Takes precedence over the Gemini settings.
    pub model_client: Option<Arc<dyn AuditModel>>,

    /// Optional observer for state transitions and per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            instruction: None,
            temperature: None,
            max_output_tokens: None,
            request_timeout_secs: 300,
            export_pdf: true,
            model_client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("instruction", &self.instruction.as_ref().map(|s| s.len()))
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("export_pdf", &self.export_pdf)
            .field(
                "model_client",
                &self.model_client.as_ref().map(|_| "<dyn AuditModel>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AuditProgressCallback>"),
            )
            .finish()
    }
}

impl AuditConfig {
    /// Create a new builder for `AuditConfig`.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults overlaid with `GEMINI_API_KEY`, `LEGALISCAN_MODEL` and
    /// `LEGALISCAN_API_BASE`. Empty variables are treated as unset.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let mut config = Self {
            api_key: var(API_KEY_ENV),
            ..Self::default()
        };
        if let Some(model) = var("LEGALISCAN_MODEL") {
            config.model = model;
        }
        if let Some(base) = var("LEGALISCAN_API_BASE") {
            config.api_base_url = base;
        }
        config
    }

    /// The instruction actually sent to the model.
    pub fn instruction(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(crate::prompts::AUDIT_INSTRUCTION)
    }
}

/// Builder for [`AuditConfig`].
#[derive(Debug)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into();
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.config.instruction = Some(instruction.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_output_tokens(mut self, n: u32) -> Self {
        self.config.max_output_tokens = Some(n);
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn export_pdf(mut self, v: bool) -> Self {
        self.config.export_pdf = v;
        self
    }

    pub fn model_client(mut self, client: Arc<dyn AuditModel>) -> Self {
        self.config.model_client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditConfig, AuditError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AuditError::InvalidConfig("model must not be empty".into()));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(AuditError::InvalidConfig(format!(
                "API base URL must be http(s), got '{}'",
                c.api_base_url
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(AuditError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if matches!(c.instruction.as_deref(), Some(s) if s.trim().is_empty()) {
            return Err(AuditError::InvalidConfig(
                "instruction must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}
