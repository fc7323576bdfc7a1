//! Google Gemini REST backend for [`AuditModel`].
//!
//! Two endpoints are used:
//!
//! * **File API** (`upload/v1beta/files`, resumable protocol) for PDFs. Large
//!   contracts would blow the inline request size, and an uploaded file gets
//!   the model's long-context PDF handling.
//! * **`generateContent`** with a single user turn whose parts mirror the
//!   [`ModelInputList`] order: `text`, `file_data`, `inline_data`.
//!
//! The key travels in the `x-goog-api-key` header so it never ends up in a
//! URL, a log line or an error message. There is no retry loop: a failed call
//! fails the audit.

use crate::config::{AuditConfig, DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::error::AuditError;
use crate::pipeline::encode::encode_inline;
use crate::pipeline::model::{AuditModel, FileHandle, ModelInput, ModelInputList};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Gemini client: one `reqwest::Client` plus the request settings.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
}

// ── Wire types: generateContent request ──────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    FileData { file_data: FileData },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

// ── Wire types: responses ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedResource,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadedResource {
    name: String,
    uri: String,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    /// Client with default model, endpoint and a 300 s timeout.
    pub fn new(api_key: Option<String>) -> Result<Self, AuditError> {
        Self::from_config(&AuditConfig {
            api_key,
            ..AuditConfig::default()
        })
    }

    /// Client configured from an [`AuditConfig`].
    pub fn from_config(config: &AuditConfig) -> Result<Self, AuditError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AuditError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn api_key(&self) -> Result<&str, AuditError> {
        self.api_key.as_deref().ok_or(AuditError::ApiKeyMissing)
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.temperature.is_none() && self.max_output_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        })
    }

    /// Translate the input list into request parts, order preserved.
    fn build_request(&self, inputs: &ModelInputList) -> Result<GenerateRequest, AuditError> {
        let parts = inputs
            .iter()
            .map(|input| match input {
                ModelInput::Instruction(text) => Ok(Part::Text { text: text.clone() }),
                ModelInput::File(handle) => Ok(Part::FileData {
                    file_data: FileData {
                        mime_type: handle.mime_type.clone(),
                        file_uri: handle.uri.clone(),
                    },
                }),
                ModelInput::Image(img) => {
                    let inline = encode_inline(img).map_err(|e| AuditError::ImageDecodeFailed {
                        name: img.name.clone(),
                        detail: format!("re-encoding failed: {}", e),
                    })?;
                    Ok(Part::InlineData {
                        inline_data: InlineData {
                            mime_type: inline.mime_type,
                            data: inline.data,
                        },
                    })
                }
            })
            .collect::<Result<Vec<_>, AuditError>>()?;

        Ok(GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
            generation_config: self.generation_config(),
        })
    }
}

impl Default for GeminiClient {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_API_BASE.to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

#[async_trait]
impl AuditModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn upload_file(
        &self,
        path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<FileHandle, AuditError> {
        let key = self.api_key()?;
        let upload_failed = |detail: String| AuditError::UploadFailed {
            name: display_name.to_string(),
            detail,
        };

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| upload_failed(format!("cannot read staged file: {}", e)))?;

        // Step 1: open a resumable session.
        let start = self
            .http
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header(API_KEY_HEADER, key)
            .header("x-goog-upload-protocol", "resumable")
            .header("x-goog-upload-command", "start")
            .header("x-goog-upload-header-content-length", bytes.len().to_string())
            .header("x-goog-upload-header-content-type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;

        if !start.status().is_success() {
            let status = start.status().as_u16();
            let message = error_message(start).await;
            return Err(upload_failed(format!("HTTP {}: {}", status, message)));
        }

        let session_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
            .ok_or_else(|| upload_failed("no upload URL in response".to_string()))?;

        // Step 2: send the bytes and finalise.
        let size = bytes.len();
        let finish = self
            .http
            .post(&session_url)
            .header(API_KEY_HEADER, key)
            .header("x-goog-upload-offset", "0")
            .header("x-goog-upload-command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        if !finish.status().is_success() {
            let status = finish.status().as_u16();
            let message = error_message(finish).await;
            return Err(upload_failed(format!("HTTP {}: {}", status, message)));
        }

        let uploaded: UploadResponse = finish
            .json()
            .await
            .map_err(|e| upload_failed(format!("unreadable response: {}", e)))?;

        debug!(
            "Uploaded {} ({} bytes) → {}",
            display_name, size, uploaded.file.uri
        );

        Ok(FileHandle {
            name: uploaded.file.name,
            uri: uploaded.file.uri,
            mime_type: uploaded
                .file
                .mime_type
                .unwrap_or_else(|| mime_type.to_string()),
            display_name: display_name.to_string(),
        })
    }

    async fn generate(&self, inputs: &ModelInputList) -> Result<String, AuditError> {
        let key = self.api_key()?;
        let request = self.build_request(inputs)?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        info!("Calling {} with {} inputs", self.model, inputs.len());
        let start = Instant::now();

        let response = self
            .http
            .post(&url)
            .header(API_KEY_HEADER, key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            warn!("{} returned HTTP {}", self.model, status.as_u16());
            return Err(AuditError::ModelApi {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| AuditError::ModelApi {
            status: status.as_u16(),
            message: format!("unreadable response body: {}", e),
        })?;

        debug!("{} answered in {:?}", self.model, start.elapsed());
        response_text(status.as_u16(), body)
    }
}

/// Join the text parts of the first candidate.
///
/// An `error` object in a 2xx body fails the call like an HTTP error would.
fn response_text(status: u16, body: GenerateResponse) -> Result<String, AuditError> {
    if let Some(error) = body.error {
        return Err(AuditError::ModelApi {
            status,
            message: error.message,
        });
    }

    let blocked = body.prompt_feedback.and_then(|f| f.block_reason);

    let Some(candidate) = body.candidates.into_iter().next() else {
        return Err(match blocked {
            Some(reason) => AuditError::Blocked { reason },
            None => AuditError::EmptyResponse,
        });
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match candidate.finish_reason.as_deref() {
        Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
            Err(AuditError::Blocked {
                reason: reason.to_string(),
            })
        }
        _ => Err(AuditError::EmptyResponse),
    }
}

/// Best-effort extraction of a human-readable message from an error response.
async fn error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(env) => env.error.message,
        Err(_) if body.trim().is_empty() => "empty response body".to_string(),
        Err(_) => body.chars().take(300).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::model::DecodedImage;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use image::{DynamicImage, RgbImage};
    use mockito::Matcher;

    fn client(base: &str, key: Option<&str>) -> GeminiClient {
        let mut builder = AuditConfig::builder().api_base_url(base);
        if let Some(k) = key {
            builder = builder.api_key(k);
        }
        GeminiClient::from_config(&builder.build().unwrap()).unwrap()
    }

    fn handle() -> FileHandle {
        FileHandle {
            name: "files/abc".into(),
            uri: "https://files.test/abc".into(),
            mime_type: "application/pdf".into(),
            display_name: "contract.pdf".into(),
        }
    }

    const GENERATE_PATH: &str = "/v1beta/models/gemini-1.5-pro:generateContent";

    #[tokio::test]
    async fn upload_runs_resumable_protocol() {
        let mut server = mockito::Server::new_async().await;
        let session_url = format!("{}/upload/session-1", server.url());

        let start = server
            .mock("POST", "/upload/v1beta/files")
            .match_header("x-goog-api-key", "test-key")
            .match_header("x-goog-upload-command", "start")
            .match_header("x-goog-upload-header-content-type", "application/pdf")
            .match_body(Matcher::Regex("contract.pdf".into()))
            .with_status(200)
            .with_header("x-goog-upload-url", &session_url)
            .create_async()
            .await;

        let finish = server
            .mock("POST", "/upload/session-1")
            .match_header("x-goog-upload-command", "upload, finalize")
            .match_body("%PDF-1.4 test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"file":{"name":"files/abc","uri":"https://files.test/abc","mimeType":"application/pdf","state":"ACTIVE"}}"#,
            )
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("001-contract.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let got = client(&server.url(), Some("test-key"))
            .upload_file(&path, "contract.pdf", "application/pdf")
            .await
            .unwrap();

        start.assert_async().await;
        finish.assert_async().await;
        assert_eq!(got, handle());
    }

    #[tokio::test]
    async fn upload_without_session_url_fails() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/v1beta/files")
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("c.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let err = client(&server.url(), Some("k"))
            .upload_file(&path, "c.pdf", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::UploadFailed { ref name, .. } if name == "c.pdf"));
    }

    #[tokio::test]
    async fn generate_sends_parts_in_order_and_joins_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", GENERATE_PATH)
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#""role":"user""#.into()),
                Matcher::Regex(
                    r#""text":"audit".*"file_uri":"https://files.test/abc".*"inline_data":\{"mime_type":"image/png""#
                        .into(),
                ),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"No conflicts "},{"text":"found."}]},"finishReason":"STOP"}]}"#,
            )
            .create_async()
            .await;

        let mut inputs = ModelInputList::new("audit");
        inputs.push_file(handle());
        inputs.push_image(DecodedImage::from_image(
            "site.png",
            DynamicImage::ImageRgb8(RgbImage::new(3, 3)),
        ));

        let text = client(&server.url(), Some("test-key"))
            .generate(&inputs)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "No conflicts found.");
    }

    #[tokio::test]
    async fn missing_key_never_reaches_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client(&server.url(), None)
            .generate(&ModelInputList::new("audit"))
            .await
            .unwrap_err();

        assert!(matches!(err, AuditError::ApiKeyMissing));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_surfaces_api_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GENERATE_PATH)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key.","status":"INVALID_ARGUMENT"}}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Some("bad"))
            .generate(&ModelInputList::new("audit"))
            .await
            .unwrap_err();

        match err {
            AuditError::ModelApi { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("API key not valid"));
            }
            other => panic!("expected ModelApi, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blocked_prompt_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GENERATE_PATH)
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Some("k"))
            .generate(&ModelInputList::new("audit"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Blocked { ref reason } if reason == "SAFETY"));
    }

    #[tokio::test]
    async fn error_object_in_ok_body_is_a_model_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GENERATE_PATH)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Some("k"))
            .generate(&ModelInputList::new("audit"))
            .await
            .unwrap_err();

        match err {
            AuditError::ModelApi { status, message } => {
                assert_eq!(status, 200);
                assert_eq!(message, "Quota exceeded");
            }
            other => panic!("expected ModelApi, got {other:?}"),
        }
    }

    #[test]
    fn jpeg_image_is_sent_as_jpeg() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(32, 32, |x, y| {
            image::Rgb([(x * 8) as u8, (y * 8) as u8, 40])
        }));
        let mut jpeg = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let mut inputs = ModelInputList::new("audit");
        inputs.push_image(DecodedImage::decode("site.jpg", jpeg.clone()).unwrap());

        let json = serde_json::to_value(GeminiClient::default().build_request(&inputs).unwrap())
            .unwrap();
        let inline = &json["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "image/jpeg");
        assert_eq!(inline["data"], STANDARD.encode(&jpeg));
    }

    #[test]
    fn empty_candidate_text_is_empty_response() {
        let body: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  "}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert!(matches!(response_text(200, body), Err(AuditError::EmptyResponse)));
    }

    #[test]
    fn safety_finish_reason_is_blocked() {
        let body: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(matches!(response_text(200, body), Err(AuditError::Blocked { .. })));
    }

    #[test]
    fn generation_config_omitted_when_unset() {
        let c = GeminiClient::default();
        let req = c.build_request(&ModelInputList::new("audit")).unwrap();
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("generationConfig").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "audit");
    }

    #[test]
    fn generation_config_carries_overrides() {
        let config = AuditConfig::builder()
            .temperature(0.2)
            .max_output_tokens(2048)
            .build()
            .unwrap();
        let c = GeminiClient::from_config(&config).unwrap();
        let json = serde_json::to_value(c.build_request(&ModelInputList::new("x")).unwrap()).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
        assert!(json["generationConfig"]["temperature"].is_number());
    }
}
