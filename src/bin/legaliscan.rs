//! CLI binary for legaliscan.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AuditConfig`, runs one audit and prints the report.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use legaliscan::pipeline::input;
use legaliscan::{
    audit, AuditConfig, AuditError, AuditOutput, AuditProgressCallback, AuditState, FileKind,
    ProgressCallback,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows the audit state machine.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        Arc::new(Self { bar })
    }
}

impl AuditProgressCallback for CliProgressCallback {
    fn on_state_change(&self, state: AuditState) {
        match state {
            AuditState::CollectingInputs => {
                self.bar.set_prefix("Preparing");
                self.bar.set_message("Uploading the data room…");
                self.bar.enable_steady_tick(Duration::from_millis(80));
            }
            AuditState::AwaitingModelResponse => {
                self.bar.set_prefix("Auditing");
                self.bar.set_message("Gemini is analyzing the data room…");
            }
            AuditState::Rendered | AuditState::Failed => self.bar.finish_and_clear(),
            AuditState::Idle => {}
        }
    }

    fn on_file_prepared(&self, index: usize, total: usize, name: &str, kind: FileKind) {
        let how = match kind {
            FileKind::Pdf => "uploaded",
            FileKind::Image => "decoded",
        };
        self.bar.println(format!(
            "  {} {:>2}/{:<2}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(how)
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Audit a contract and a site plan; writes ./Due_Diligence_Report.pdf
  legaliscan contract.pdf site.png

  # Write the report somewhere else
  legaliscan data-room/*.pdf data-room/*.jpg -o reports/

  # Terminal only, no PDF
  legaliscan --no-pdf lease.pdf

  # Use a faster model
  legaliscan --model gemini-1.5-flash contract.pdf

  # Machine-readable output
  legaliscan --json contract.pdf site.png > audit.json

ACCEPTED FILES:
  PDF (.pdf)             uploaded through the Gemini File API
  PNG / JPEG (.png .jpg) decoded locally and sent inline

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (required)
  LEGALISCAN_MODEL        Override model ID (default: gemini-1.5-pro)
  LEGALISCAN_OUTPUT_DIR   Directory for Due_Diligence_Report.pdf
  LEGALISCAN_API_BASE     Override the Gemini REST endpoint

  A .env file in the working directory is loaded at startup.
"#;

/// Audit a data room of contracts and site plans with Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "legaliscan",
    version,
    about = "Due-diligence audit of contracts and site plans with Gemini",
    long_about = "Upload PDF contracts and site-plan images to a Gemini model acting as a \
Senior M&A Legal Auditor. The model cross-references clauses that conflict across documents \
(such as Change of Control terms), matches the images against the contract text, highlights \
invisible risks like handwritten notes or missing signatures, and ends with a Liability Heatmap \
citing page numbers and file names. The report is printed and exported as \
Due_Diligence_Report.pdf.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF and image files making up the data room.
    files: Vec<PathBuf>,

    /// Directory to write Due_Diligence_Report.pdf into.
    #[arg(short, long, env = "LEGALISCAN_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Do not export a PDF; print the report only.
    #[arg(long, env = "LEGALISCAN_NO_PDF")]
    no_pdf: bool,

    /// Gemini model ID.
    #[arg(long, env = "LEGALISCAN_MODEL", default_value = legaliscan::config::DEFAULT_MODEL)]
    model: String,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST endpoint.
    #[arg(long, env = "LEGALISCAN_API_BASE", default_value = legaliscan::config::DEFAULT_API_BASE)]
    api_base: String,

    /// Path to a text file replacing the built-in audit instruction.
    #[arg(long, env = "LEGALISCAN_INSTRUCTION_FILE")]
    instruction_file: Option<PathBuf>,

    /// Sampling temperature (0.0–2.0). Model default when unset.
    #[arg(long, env = "LEGALISCAN_TEMPERATURE")]
    temperature: Option<f32>,

    /// Max output tokens for the report. Model default when unset.
    #[arg(long, env = "LEGALISCAN_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long, env = "LEGALISCAN_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Output structured JSON (AuditOutput) instead of the report text.
    #[arg(long, env = "LEGALISCAN_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "LEGALISCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LEGALISCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except the report and errors.
    #[arg(short, long, env = "LEGALISCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env before clap reads its env fallbacks.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides all the feedback that matters while it runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    if cli.files.is_empty() {
        println!("Please provide files to begin.");
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AuditProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    // ── Run audit ────────────────────────────────────────────────────────
    match run(&cli, &config).await {
        Ok((output, written)) => print_output(&cli, &output, written.as_ref()),
        Err(e) => {
            eprintln!("{} {}", red("Error:"), e);
            std::process::exit(1);
        }
    }
}

/// Load the files, audit them and write the export.
async fn run(
    cli: &Cli,
    config: &AuditConfig,
) -> Result<(AuditOutput, Option<PathBuf>), AuditError> {
    let files = input::load_files(&cli.files).await?;
    let output = audit(&files, config).await?;
    let written = match output.pdf {
        Some(ref pdf) => Some(pdf.write_to_dir(&cli.output_dir).await?),
        None => None,
    };
    Ok((output, written))
}

fn print_output(cli: &Cli, output: &AuditOutput, written: Option<&PathBuf>) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    // Decoration goes to stderr; stdout carries only the report.
    if !cli.quiet {
        eprintln!("{}", green(&bold("Audit Complete!")));
        eprintln!("{}", "─".repeat(72));
    }

    let report = output.report.display_text();
    write_report(&mut io::stdout().lock(), &report).context("Failed to write to stdout")?;

    if !cli.quiet {
        if let Some(path) = written {
            eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
        }
        eprintln!(
            "   {} file(s)  /  {} chars  —  {}ms total",
            output.stats.total_files,
            dim(&output.stats.report_chars.to_string()),
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}

/// Write the report text, newline-terminated, and nothing else.
fn write_report(out: &mut impl Write, report: &str) -> io::Result<()> {
    out.write_all(report.as_bytes())?;
    if !report.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Map CLI args to `AuditConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AuditConfig> {
    let mut builder = AuditConfig::builder()
        .model(&cli.model)
        .api_base_url(&cli.api_base)
        .request_timeout_secs(cli.timeout)
        .export_pdf(!cli.no_pdf);

    if let Some(ref key) = cli.api_key {
        if !key.trim().is_empty() {
            builder = builder.api_key(key.trim());
        }
    }
    if let Some(ref path) = cli.instruction_file {
        let instruction = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction from {:?}", path))?;
        builder = builder.instruction(instruction);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_output_tokens(n);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
