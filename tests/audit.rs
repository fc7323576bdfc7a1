//! Integration tests for the audit flow.
//!
//! The offline tests run the real [`GeminiClient`] against a local `mockito`
//! server, or swap the model out entirely through [`AuditModel`]. The live
//! test at the bottom talks to the real Gemini API and is gated behind
//! `E2E_ENABLED` and `GEMINI_API_KEY`.
//!
//! Run with:
//!   cargo test --test audit -- --nocapture

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use legaliscan::{
    audit, audit_paths, AuditConfig, AuditError, AuditModel, AuditProgressCallback, AuditState,
    FileHandle, FileKind, ModelInput, ModelInputList, UploadedFile,
};
use legaliscan::output::REPORT_FILENAME;
use mockito::Matcher;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

// ── Test helpers ─────────────────────────────────────────────────────────────

static TRACING: Once = Once::new();

/// Route library logs to the test output when `RUST_LOG` is set.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn png_bytes() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 6, Rgb([200, 40, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

fn data_room() -> Vec<UploadedFile> {
    vec![
        UploadedFile::from_name("contract.pdf", b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n".to_vec()),
        UploadedFile::from_name("site.png", png_bytes()),
    ]
}

fn pdf_text(bytes: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(bytes).expect("export must be a readable PDF");
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).expect("text extraction")
}

/// Model double that counts calls and records what it was given.
struct ScriptedModel {
    answer: String,
    uploads: AtomicUsize,
    generate_calls: AtomicUsize,
    seen_inputs: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(answer: &str) -> Arc<Self> {
        Arc::new(Self {
            answer: answer.to_string(),
            uploads: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            seen_inputs: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl AuditModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn upload_file(
        &self,
        _path: &Path,
        display_name: &str,
        mime_type: &str,
    ) -> Result<FileHandle, AuditError> {
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FileHandle {
            name: format!("files/{n}"),
            uri: format!("https://files.test/{n}"),
            mime_type: mime_type.to_string(),
            display_name: display_name.to_string(),
        })
    }

    async fn generate(&self, inputs: &ModelInputList) -> Result<String, AuditError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        let kinds = inputs
            .iter()
            .map(|i| match i {
                ModelInput::Instruction(_) => "instruction".to_string(),
                ModelInput::File(h) => format!("file:{}", h.display_name),
                ModelInput::Image(img) => format!("image:{}", img.name),
            })
            .collect();
        *self.seen_inputs.lock().unwrap() = kinds;
        Ok(self.answer.clone())
    }
}

#[derive(Default)]
struct Recorder {
    states: Mutex<Vec<AuditState>>,
    prepared: Mutex<Vec<(usize, usize, String, FileKind)>>,
}

impl AuditProgressCallback for Recorder {
    fn on_state_change(&self, state: AuditState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_file_prepared(&self, index: usize, total: usize, name: &str, kind: FileKind) {
        self.prepared
            .lock()
            .unwrap()
            .push((index, total, name.to_string(), kind));
    }
}

// ── Offline tests ────────────────────────────────────────────────────────────

#[tokio::test]
async fn contract_and_site_plan_against_mock_gemini() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;
    let session_url = format!("{}/upload/session-7", server.url());

    let start = server
        .mock("POST", "/upload/v1beta/files")
        .match_header("x-goog-api-key", "test-key")
        .match_header("x-goog-upload-protocol", "resumable")
        .with_status(200)
        .with_header("x-goog-upload-url", &session_url)
        .expect(1)
        .create_async()
        .await;
    let finish = server
        .mock("POST", "/upload/session-7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"file":{"name":"files/c1","uri":"https://files.test/c1","mimeType":"application/pdf"}}"#)
        .expect(1)
        .create_async()
        .await;
    let generate = server
        .mock("POST", "/v1beta/models/gemini-1.5-pro:generateContent")
        .match_body(Matcher::Regex(
            r#"Senior M&A Legal Auditor.*"file_uri":"https://files.test/c1".*"inline_data""#.into(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"No conflicts found."}]},"finishReason":"STOP"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let config = AuditConfig::builder()
        .api_key("test-key")
        .api_base_url(server.url())
        .build()
        .unwrap();

    let output = audit(&data_room(), &config).await.unwrap();

    start.assert_async().await;
    finish.assert_async().await;
    generate.assert_async().await;

    assert_eq!(output.report.display_text(), "No conflicts found.");
    let pdf = output.pdf.expect("export is on by default");
    assert_eq!(pdf.filename(), REPORT_FILENAME);
    assert_eq!(pdf.mime_type(), "application/pdf");
    assert_eq!(pdf_text(pdf.bytes()).trim(), "No conflicts found.");
    assert_eq!(output.stats.pdf_files, 1);
    assert_eq!(output.stats.image_files, 1);
    assert_eq!(output.stats.model, "gemini-1.5-pro");
}

#[tokio::test]
async fn model_sees_instruction_then_files_in_order() {
    let model = ScriptedModel::new("ok");
    let config = AuditConfig::builder()
        .model_client(Arc::clone(&model) as Arc<dyn AuditModel>)
        .build()
        .unwrap();

    let mut files = data_room();
    files.push(UploadedFile::from_name("lease.pdf", b"%PDF-1.7".to_vec()));
    audit(&files, &config).await.unwrap();

    assert_eq!(
        *model.seen_inputs.lock().unwrap(),
        vec!["instruction", "file:contract.pdf", "image:site.png", "file:lease.pdf"]
    );
    assert_eq!(model.uploads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn empty_data_room_never_reaches_the_model() {
    let model = ScriptedModel::new("unused");
    let config = AuditConfig::builder()
        .model_client(Arc::clone(&model) as Arc<dyn AuditModel>)
        .build()
        .unwrap();

    let err = audit(&[], &config).await.unwrap_err();

    assert!(matches!(err, AuditError::NoFiles));
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(model.uploads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_data_room_enters_collecting_before_failing() {
    let recorder = Arc::new(Recorder::default());
    let config = AuditConfig::builder()
        .model_client(ScriptedModel::new("unused") as Arc<dyn AuditModel>)
        .progress_callback(Arc::clone(&recorder) as Arc<dyn AuditProgressCallback>)
        .build()
        .unwrap();

    audit(&[], &config).await.unwrap_err();

    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![
            AuditState::CollectingInputs,
            AuditState::Failed,
            AuditState::Idle,
        ]
    );
}

#[tokio::test]
async fn unsupported_file_aborts_before_the_model() {
    let model = ScriptedModel::new("unused");
    let config = AuditConfig::builder()
        .model_client(Arc::clone(&model) as Arc<dyn AuditModel>)
        .build()
        .unwrap();

    let mut files = data_room();
    files.push(UploadedFile::from_name("minutes.docx", b"PK\x03\x04".to_vec()));
    let err = audit(&files, &config).await.unwrap_err();

    assert!(matches!(err, AuditError::UnsupportedFileType { ref name, .. } if name == "minutes.docx"));
    assert_eq!(model.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_follows_the_state_machine() {
    let recorder = Arc::new(Recorder::default());
    let config = AuditConfig::builder()
        .model_client(ScriptedModel::new("Heatmap: low") as Arc<dyn AuditModel>)
        .progress_callback(Arc::clone(&recorder) as Arc<dyn AuditProgressCallback>)
        .build()
        .unwrap();

    audit(&data_room(), &config).await.unwrap();

    assert_eq!(
        *recorder.states.lock().unwrap(),
        vec![
            AuditState::CollectingInputs,
            AuditState::AwaitingModelResponse,
            AuditState::Rendered,
            AuditState::Idle,
        ]
    );
    assert_eq!(
        *recorder.prepared.lock().unwrap(),
        vec![
            (1, 2, "contract.pdf".to_string(), FileKind::Pdf),
            (2, 2, "site.png".to_string(), FileKind::Image),
        ]
    );
}

#[tokio::test]
async fn report_with_foreign_script_still_exports() {
    let config = AuditConfig::builder()
        .model_client(ScriptedModel::new("Seller: 株式会社 → risk 🔥") as Arc<dyn AuditModel>)
        .build()
        .unwrap();

    let output = audit(&data_room(), &config).await.unwrap();

    let text = pdf_text(output.pdf.unwrap().bytes());
    assert!(text.contains("Seller: ???? ? risk ?"), "got: {text:?}");
}

#[tokio::test]
async fn export_is_deterministic_across_requests() {
    let config = AuditConfig::builder()
        .model_client(ScriptedModel::new("## Findings\n\n- Clause 4 vs Clause 9") as Arc<dyn AuditModel>)
        .build()
        .unwrap();

    let a = audit(&data_room(), &config).await.unwrap();
    let b = audit(&data_room(), &config).await.unwrap();
    assert_eq!(a.pdf.unwrap().bytes(), b.pdf.unwrap().bytes());
}

#[tokio::test]
async fn audit_paths_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let contract = dir.path().join("contract.pdf");
    let site = dir.path().join("site.png");
    std::fs::write(&contract, b"%PDF-1.4\n%%EOF\n").unwrap();
    std::fs::write(&site, png_bytes()).unwrap();

    let model = ScriptedModel::new("No conflicts found.");
    let config = AuditConfig::builder()
        .model_client(Arc::clone(&model) as Arc<dyn AuditModel>)
        .export_pdf(false)
        .build()
        .unwrap();

    let output = audit_paths(&[contract, site], &config).await.unwrap();
    assert_eq!(output.report.text(), "No conflicts found.");
    assert!(output.pdf.is_none());
    assert_eq!(
        *model.seen_inputs.lock().unwrap(),
        vec!["instruction", "file:contract.pdf", "image:site.png"]
    );
}

#[tokio::test]
async fn audit_paths_missing_file() {
    let config = AuditConfig::builder()
        .model_client(ScriptedModel::new("unused") as Arc<dyn AuditModel>)
        .build()
        .unwrap();
    let err = audit_paths(&["/nonexistent/contract.pdf".into()], &config)
        .await
        .unwrap_err();
    assert!(matches!(err, AuditError::FileNotFound { .. }));
}

// ── Live API test (opt-in) ───────────────────────────────────────────────────

#[tokio::test]
async fn live_gemini_audit() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
        return;
    }
    let config = AuditConfig::from_env();
    if config.api_key.is_none() {
        println!("SKIP — GEMINI_API_KEY not set");
        return;
    }
    init_tracing();

    let output = audit(&data_room(), &config)
        .await
        .expect("live audit should succeed");

    let report = output.report.display_text();
    assert!(!report.trim().is_empty());
    assert!(pdf_text(output.pdf.unwrap().bytes()).len() > 10);
    println!("{report}");
    println!("stats: {:?}", output.stats);
}
