//! The remote-model seam: input types and the [`AuditModel`] trait.
//!
//! Everything the audit flow knows about the remote model is in this file.
//! The model is an opaque capability with two operations: accept a local PDF
//! and hand back a handle, and turn an ordered input list into text.
//! [`crate::pipeline::gemini::GeminiClient`] is the production implementation;
//! tests substitute their own.

use crate::error::AuditError;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Opaque reference to a file already uploaded to the model provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHandle {
    /// Provider-side resource name, e.g. `files/abc123`.
    pub name: String,
    /// URI to cite in a request.
    pub uri: String,
    pub mime_type: String,
    /// The name the user uploaded the file under.
    pub display_name: String,
}

/// An image decoded into memory, ready to be sent inline.
///
/// Decoding validates the upload. When the upload is already PNG or JPEG its
/// original bytes are kept in `passthrough` and sent unchanged; otherwise the
/// decoded pixels are re-encoded at send time.
#[derive(Clone)]
pub struct DecodedImage {
    pub name: String,
    pub image: DynamicImage,
    /// Uploaded bytes and their MIME type, when they can go on the wire as-is.
    pub passthrough: Option<(&'static str, Vec<u8>)>,
}

impl DecodedImage {
    /// Sniff the format, decode, and keep PNG/JPEG bytes for passthrough.
    pub fn decode(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, image::ImageError> {
        let format = image::guess_format(&bytes)?;
        let image = image::load_from_memory_with_format(&bytes, format)?;
        let passthrough = match format {
            ImageFormat::Png => Some(("image/png", bytes)),
            ImageFormat::Jpeg => Some(("image/jpeg", bytes)),
            _ => None,
        };
        Ok(Self {
            name: name.into(),
            image,
            passthrough,
        })
    }

    /// Wrap pixels that have no uploaded encoding.
    pub fn from_image(name: impl Into<String>, image: DynamicImage) -> Self {
        Self {
            name: name.into(),
            image,
            passthrough: None,
        }
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("name", &self.name)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field(
                "passthrough",
                &self.passthrough.as_ref().map(|(mime, b)| (mime, b.len())),
            )
            .finish()
    }
}

/// One element of a [`ModelInputList`].
#[derive(Debug, Clone)]
pub enum ModelInput {
    Instruction(String),
    File(FileHandle),
    Image(DecodedImage),
}

/// Ordered model input: exactly one instruction, then one entry per file.
///
/// The instruction can only be set at construction, so it is always first
/// and never repeated.
#[derive(Debug, Clone)]
pub struct ModelInputList {
    inputs: Vec<ModelInput>,
}

impl ModelInputList {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            inputs: vec![ModelInput::Instruction(instruction.into())],
        }
    }

    pub fn push_file(&mut self, handle: FileHandle) {
        self.inputs.push(ModelInput::File(handle));
    }

    pub fn push_image(&mut self, image: DecodedImage) {
        self.inputs.push(ModelInput::Image(image));
    }

    /// Total entries, instruction included.
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Always false: the instruction is always present.
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Number of per-file entries.
    pub fn file_count(&self) -> usize {
        self.inputs.len() - 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ModelInput> {
        self.inputs.iter()
    }

    pub fn as_slice(&self) -> &[ModelInput] {
        &self.inputs
    }
}

impl<'a> IntoIterator for &'a ModelInputList {
    type Item = &'a ModelInput;
    type IntoIter = std::slice::Iter<'a, ModelInput>;

    fn into_iter(self) -> Self::IntoIter {
        self.inputs.iter()
    }
}

/// A hosted multimodal model able to audit a data room.
#[async_trait]
pub trait AuditModel: Send + Sync {
    /// Model identifier, for logs and stats.
    fn model_name(&self) -> &str;

    /// Upload a local file and return a handle usable as model input.
    async fn upload_file(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<FileHandle, AuditError>;

    /// Run one inference call over the ordered inputs and return its text.
    async fn generate(&self, inputs: &ModelInputList) -> Result<String, AuditError>;
}
