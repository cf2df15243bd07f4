//! CLI binary for cardscan.
//!
//! A thin shim over the library crate that maps CLI flags to `ScanConfig`,
//! acquires the card image (camera or file/URL) and prints the contact.

use anyhow::{Context, Result};
use cardscan::{
    CameraDevice, CapturedImage, CommandCamera, ContactField, ContactInfo, Facing, ImageSource,
    ScanConfig, ScanProgressCallback, Scanner, UploadMode,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that follows the scan stages and
/// prints the failure notification when a scan fails.
struct CliProgressCallback {
    bar: Option<ProgressBar>,
    failed: AtomicBool,
}

impl CliProgressCallback {
    fn new(show_spinner: bool) -> Arc<Self> {
        let bar = show_spinner.then(|| {
            let bar = ProgressBar::new_spinner();
            bar.set_style(
                ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner())
                    .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
            );
            bar.set_prefix("Preparing");
            bar.set_message("reading image…");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        Arc::new(Self {
            bar,
            failed: AtomicBool::new(false),
        })
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
    }
}

impl ScanProgressCallback for CliProgressCallback {
    fn on_scan_start(&self, bytes: usize) {
        if let Some(ref bar) = self.bar {
            bar.set_prefix("Uploading");
            bar.set_message(format!("{} KiB", bytes.div_ceil(1024)));
        }
    }

    fn on_submitted(&self, _operation_location: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_prefix("Analysing");
            bar.set_message("job accepted");
        }
    }

    fn on_poll(&self, attempt: u32, max_attempts: u32, status: &str) {
        if let Some(ref bar) = self.bar {
            bar.set_message(format!("{status} ({attempt}/{max_attempts})"));
        }
    }

    fn on_scan_complete(&self, contact: &ContactInfo) {
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        eprintln!(
            "{} {} of 7 fields extracted",
            green("✔"),
            bold(&contact.filled_count().to_string())
        );
    }

    fn on_scan_error(&self, message: &str, detail: &str) {
        self.failed.store(true, Ordering::SeqCst);
        if let Some(ref bar) = self.bar {
            bar.finish_and_clear();
        }
        eprintln!("{} {}", red("✘"), bold(message));
        eprintln!("  {}", dim(detail));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scan a photo of a card
  cardscan card.jpg

  # Scan an image hosted somewhere
  cardscan https://example.com/cards/alex.png

  # Grab a frame from the rear camera, fall back to the file if that fails
  cardscan --camera --device /dev/video2 card.jpg

  # Machine-readable output
  cardscan --json card.jpg > contact.json

  # Full scan report (poll count, upload size, timings)
  cardscan --report card.jpg

ENVIRONMENT VARIABLES:
  CARDSCAN_ENDPOINT       Document-analysis resource URL
  CARDSCAN_API_KEY        Subscription key (Ocp-Apim-Subscription-Key)
  CARDSCAN_MODEL          Model id (default: prebuilt-businessCard)
  RUST_LOG                Overrides the log filter (e.g. cardscan=debug)

SETUP:
  1. export CARDSCAN_ENDPOINT=https://<resource>.cognitiveservices.azure.com
  2. export CARDSCAN_API_KEY=<key>
  3. cardscan card.jpg
"#;

/// Extract contact details from business-card photos.
#[derive(Parser, Debug)]
#[command(
    name = "cardscan",
    version,
    about = "Extract contact details from business-card photos",
    long_about = "Send a business-card photo (camera frame, local file or URL) to a \
document-analysis service and print the extracted name, title, company, email, phone, \
website and address.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path (JPEG/PNG) or HTTP/HTTPS URL.
    input: Option<String>,

    /// Capture the card from the camera instead of (or before) reading INPUT.
    #[arg(long)]
    camera: bool,

    /// Video device node used with --camera.
    #[arg(long, env = "CARDSCAN_DEVICE", default_value = "/dev/video0")]
    device: PathBuf,

    /// Still-capture command for --camera; `{device}` is replaced by the device path.
    #[arg(long, env = "CARDSCAN_CAPTURE_COMMAND")]
    capture_command: Option<String>,

    /// Treat --device as the front (user-facing) camera.
    #[arg(long, requires = "camera")]
    front: bool,

    /// Document-analysis endpoint URL.
    #[arg(long, env = "CARDSCAN_ENDPOINT", hide_env_values = true)]
    endpoint: String,

    /// Subscription key.
    #[arg(long, env = "CARDSCAN_API_KEY", hide_env_values = true)]
    key: String,

    /// Document model id.
    #[arg(long, env = "CARDSCAN_MODEL", default_value = cardscan::config::DEFAULT_MODEL_ID)]
    model: String,

    /// Send the image as a multipart form field instead of a raw body.
    #[arg(long)]
    multipart: bool,

    /// Downscale images whose longer edge exceeds this many pixels.
    #[arg(long, env = "CARDSCAN_MAX_EDGE", default_value_t = 1200)]
    max_edge: u32,

    /// Delay between status polls, in milliseconds.
    #[arg(long, env = "CARDSCAN_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Maximum number of status polls.
    #[arg(long, env = "CARDSCAN_MAX_ATTEMPTS", default_value_t = 30,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Per-request timeout in seconds.
    #[arg(long, env = "CARDSCAN_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "CARDSCAN_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Print the contact as JSON.
    #[arg(long)]
    json: bool,

    /// Print the full scan report as JSON.
    #[arg(long, conflicts_with = "json")]
    report: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CARDSCAN_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CARDSCAN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "CARDSCAN_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already shows stage progress, so INFO logs are only
    // useful when it is off.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.verbose;
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

    let progress = CliProgressCallback::new(show_progress);
    let config = build_config(&cli, Arc::clone(&progress))?;
    let scanner = Scanner::new(config).context("Failed to create scanner")?;

    // Ctrl-C releases the camera and abandons polling.
    let token = scanner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    let image = match acquire(&cli, &scanner).await {
        Ok(image) => image,
        Err(e) => {
            progress.finish();
            return Err(e);
        }
    };

    if cli.report {
        let report = scanner.try_extract(image).await;
        progress.finish();
        let report = report.context("Scan failed")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    let contact = scanner.extract_contact_from_image(image).await;
    progress.finish();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&contact).context("Failed to serialise contact")?
        );
    } else if !progress.failed() {
        print_contact(&contact);
    }

    if progress.failed() {
        std::process::exit(1);
    }
    Ok(())
}

/// Get the card image from the camera or the positional input.
///
/// A camera failure falls back to INPUT when one was given.
async fn acquire(cli: &Cli, scanner: &Scanner) -> Result<CapturedImage> {
    let camera = cli.camera.then(|| build_camera(cli));
    let image = scanner
        .acquire(
            camera.as_ref().map(|c| c as &dyn CameraDevice),
            cli.input.as_deref(),
        )
        .await
        .context("Failed to acquire the card image")?;

    if cli.camera && !cli.quiet && !matches!(image.source, ImageSource::Camera { .. }) {
        eprintln!("{} Camera unavailable, using {}", cyan("⚠"), image.source);
    }
    Ok(image)
}

fn build_camera(cli: &Cli) -> CommandCamera {
    let camera = CommandCamera::v4l2(&cli.device).with_facing(facing(cli));
    match cli.capture_command.as_deref().map(str::split_whitespace) {
        Some(mut parts) => match parts.next() {
            Some(program) => camera.with_command(program, parts.map(str::to_string).collect()),
            None => camera,
        },
        None => camera,
    }
}

fn facing(cli: &Cli) -> Facing {
    if cli.front {
        Facing::User
    } else {
        Facing::Environment
    }
}

/// Map CLI args to `ScanConfig`.
fn build_config(cli: &Cli, progress: Arc<CliProgressCallback>) -> Result<ScanConfig> {
    let upload_mode = if cli.multipart {
        UploadMode::Multipart
    } else {
        UploadMode::OctetStream
    };

    ScanConfig::builder()
        .endpoint(&cli.endpoint)
        .api_key(&cli.key)
        .model_id(&cli.model)
        .upload_mode(upload_mode)
        .max_image_edge(cli.max_edge)
        .poll_interval_ms(cli.poll_interval_ms)
        .max_poll_attempts(cli.max_attempts)
        .request_timeout_secs(cli.request_timeout)
        .download_timeout_secs(cli.download_timeout)
        .camera_facing(facing(cli))
        .progress_callback(progress as Arc<dyn ScanProgressCallback>)
        .build()
        .context("Invalid configuration")
}

fn print_contact(contact: &ContactInfo) {
    for field in ContactField::ALL {
        let value = contact.get(field);
        let shown = if value.is_empty() {
            dim("Not detected")
        } else {
            value.to_string()
        };
        println!("{:<9} {}", format!("{}:", field.label()), shown);
    }
}
