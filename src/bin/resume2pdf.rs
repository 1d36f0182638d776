//! CLI binary for resume2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `RenderConfig`, prints a status line on success, and prints manual
//! print-to-PDF instructions on failure.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use resume2pdf::{
    convert, convert_to_file, default_output_path, describe_engine, inspect, Html2PdfError,
    ManualFallback, Margins, PaperFormat, ProgressCallback, RenderConfig, RenderProgressCallback,
    RenderStage, RenderStats,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: a spinner that names the current stage, switching to
/// a byte-counting bar while headless Chrome downloads.
struct CliProgressCallback {
    bar: ProgressBar,
    downloading: AtomicBool,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(Self::spinner_style());
        bar.set_prefix("resume2pdf");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            downloading: AtomicBool::new(false),
        })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS)
    }

    fn download_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl RenderProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: RenderStage) {
        if stage == RenderStage::InstallingEngine {
            self.downloading.store(true, Ordering::SeqCst);
            self.bar.set_style(Self::download_style());
            self.bar.set_prefix("Chrome");
            self.bar.set_position(0);
        } else if self.downloading.swap(false, Ordering::SeqCst) {
            self.bar.set_style(Self::spinner_style());
            self.bar.set_prefix("resume2pdf");
        }
        self.bar.set_message(stage.label());
    }

    fn on_engine_download(&self, downloaded: u64, total: Option<u64>) {
        if let Some(t) = total {
            if self.bar.length() != Some(t) {
                self.bar.set_length(t);
            }
        }
        self.bar.set_position(downloaded);
    }

    fn on_engine_retry(&self, reason: &str) {
        self.bar.println(format!(
            "{} Installed browser failed to start ({}); installing headless Chrome and retrying once",
            yellow("⚠"),
            dim(reason.lines().next().unwrap_or(reason)),
        ));
    }

    fn on_complete(&self, _pdf_bytes: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert ./resume.html to ./resume.pdf
  resume2pdf

  # Name the output
  resume2pdf resume.html -o Jane_Doe_Resume.pdf

  # US Letter, narrower margins
  resume2pdf --format letter --margin "0.4in 0.6in" resume.html

  # Let the stylesheet's @page rule decide the paper size
  resume2pdf --prefer-css-page-size resume.html

  # First page only, PDF to stdout
  resume2pdf --pages 1 resume.html -o - > page1.pdf

  # Inspect the HTML without starting a browser
  resume2pdf --inspect-only resume.html

  # Inside a container running as root
  resume2pdf --no-sandbox resume.html

PAPER FORMATS:
  a3, a4 (default), a5, letter, legal, tabloid, or WIDTHxHEIGHT such as
  210mmx297mm or 8.5x11 (inches). Units: in, cm, mm, px, pt.

ENVIRONMENT VARIABLES:
  CHROME_PATH             Path to an existing Chrome/Chromium — skips discovery
  CHROME_AUTO_CACHE_DIR   Override the headless Chrome cache directory
  RUST_LOG                Log filter, e.g. resume2pdf=debug

SETUP:
  An installed Google Chrome, Chromium or Microsoft Edge is used when
  present. Otherwise chrome-headless-shell (~100 MB) is downloaded on first
  run and cached in ~/.cache/resume2pdf/. Use --no-install to forbid that.

  If rendering fails, resume2pdf prints instructions for printing the page
  to PDF from your own browser instead.
"#;

/// Render an HTML resume to PDF with headless Chrome.
#[derive(Parser, Debug)]
#[command(
    name = "resume2pdf",
    version,
    about = "Render an HTML resume (or any HTML page) to PDF with headless Chrome",
    long_about = "Render an HTML file or URL to PDF using a headless Chromium browser. \
An installed Chrome, Chromium or Edge is used when available; otherwise a pinned \
chrome-headless-shell build is downloaded once and cached.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file path or HTTP/HTTPS URL.
    #[arg(default_value = "resume.html", env = "RESUME2PDF_INPUT")]
    input: String,

    /// Write the PDF here ("-" for stdout). Default: input name with .pdf.
    #[arg(short, long, env = "RESUME2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Paper format: a4, letter, legal, … or WxH (e.g. 210mmx297mm).
    #[arg(long, env = "RESUME2PDF_FORMAT", default_value = "a4",
          value_parser = parse_paper)]
    format: PaperFormat,

    /// Margins in CSS shorthand: "0.5in", "10mm 15mm", or four values.
    #[arg(long, env = "RESUME2PDF_MARGIN", default_value = "0.5in",
          value_parser = parse_margins)]
    margin: Margins,

    /// Landscape orientation.
    #[arg(long, env = "RESUME2PDF_LANDSCAPE")]
    landscape: bool,

    /// Do not print CSS backgrounds.
    #[arg(long, env = "RESUME2PDF_NO_BACKGROUND")]
    no_background: bool,

    /// Rendering scale (0.1–2.0).
    #[arg(long, env = "RESUME2PDF_SCALE", default_value_t = 1.0)]
    scale: f64,

    /// Pages to print, e.g. 1-2,4.
    #[arg(long, env = "RESUME2PDF_PAGES")]
    pages: Option<String>,

    /// Use the document's @page size instead of --format.
    #[arg(long, env = "RESUME2PDF_PREFER_CSS_PAGE_SIZE")]
    prefer_css_page_size: bool,

    /// HTML file used as the print header template.
    #[arg(long, env = "RESUME2PDF_HEADER_TEMPLATE")]
    header_template: Option<PathBuf>,

    /// HTML file used as the print footer template.
    #[arg(long, env = "RESUME2PDF_FOOTER_TEMPLATE")]
    footer_template: Option<PathBuf>,

    /// Page-load timeout in seconds.
    #[arg(long, env = "RESUME2PDF_TIMEOUT", default_value_t = 60,
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Pause after load before printing, in milliseconds.
    #[arg(long, env = "RESUME2PDF_SETTLE_MS", default_value_t = 250)]
    settle_ms: u64,

    /// Do not wait for web fonts before printing.
    #[arg(long, env = "RESUME2PDF_NO_FONT_WAIT")]
    no_font_wait: bool,

    /// Browser executable to use.
    #[arg(long, env = "RESUME2PDF_CHROME")]
    chrome: Option<PathBuf>,

    /// Never download headless Chrome.
    #[arg(long, env = "RESUME2PDF_NO_INSTALL")]
    no_install: bool,

    /// Run the browser without its sandbox (needed as root in containers).
    #[arg(long, env = "RESUME2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    /// Print facts about the HTML and the browser that would be used; no render.
    #[arg(long, env = "RESUME2PDF_INSPECT_ONLY")]
    inspect_only: bool,

    /// Print results as JSON (on stderr when the PDF goes to stdout).
    #[arg(long, env = "RESUME2PDF_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "RESUME2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "RESUME2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "RESUME2PDF_QUIET")]
    quiet: bool,
}

impl Cli {
    fn pdf_to_stdout(&self) -> bool {
        self.output.as_deref() == Some(Path::new("-"))
    }
}

fn parse_paper(s: &str) -> Result<PaperFormat, String> {
    s.parse().map_err(|e: Html2PdfError| e.to_string())
}

fn parse_margins(s: &str) -> Result<Margins, String> {
    Margins::parse(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level progress; keep library logs quiet
    // unless asked for.
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

    match run(&cli, show_progress).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(&cli, &e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, show_progress: bool) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect(&cli.input).await.context("Failed to inspect HTML")?;
        let config = build_config(cli, None).await?;
        let engine = describe_engine(&config);

        if cli.json {
            let value = serde_json::json!({ "document": info, "engine": engine });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialise")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref l) = info.lang {
                println!("Language:     {}", l);
            }
            println!("Size:         {} bytes", info.byte_size);
            println!("Stylesheets:  {}", info.stylesheet_count);
            println!("Images:       {}", info.image_count);
            println!("Print CSS:    {}", info.has_print_styles);
            println!("@page rule:   {}", info.has_page_rule);
            println!("Browser:      {}", engine);
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress: Option<Arc<CliProgressCallback>> = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        cli,
        progress.clone().map(|p| p as Arc<dyn RenderProgressCallback>),
    )
    .await?;

    // ── Render ───────────────────────────────────────────────────────────
    let result = if cli.pdf_to_stdout() {
        render_to_stdout(cli, &config).await
    } else {
        render_to_file(cli, &config).await
    };
    if let Some(p) = progress {
        p.bar.finish_and_clear();
    }
    let (stats, written) = result?;

    if cli.json {
        let value = serde_json::json!({ "output": written, "stats": stats });
        let json = serde_json::to_string_pretty(&value).context("Failed to serialise stats")?;
        // stdout already carries the PDF
        if cli.pdf_to_stdout() {
            eprintln!("{json}");
        } else {
            println!("{json}");
        }
    } else if !cli.quiet {
        if let Some(ref path) = written {
            eprintln!(
                "{} PDF generated successfully: {}",
                green("✅"),
                bold(&path.display().to_string())
            );
        }
        eprintln!(
            "   {}",
            dim(&format!(
                "{} page(s), {} bytes, {}ms{}",
                stats.page_count,
                stats.pdf_bytes,
                stats.total_duration_ms,
                if stats.engine_retried {
                    " (after installing headless Chrome)"
                } else {
                    ""
                }
            ))
        );
    }

    Ok(())
}

async fn render_to_file(cli: &Cli, config: &RenderConfig) -> Result<(RenderStats, Option<PathBuf>)> {
    let output_path = match cli.output {
        Some(ref p) => p.clone(),
        None => default_output_path(&cli.input).context("Cannot derive output path")?,
    };
    let stats = convert_to_file(&cli.input, &output_path, config)
        .await
        .context("Rendering failed")?;
    Ok((stats, Some(output_path)))
}

async fn render_to_stdout(cli: &Cli, config: &RenderConfig) -> Result<(RenderStats, Option<PathBuf>)> {
    let output = convert(&cli.input, config)
        .await
        .context("Rendering failed")?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(&output.pdf)
        .and_then(|_| handle.flush())
        .context("Failed to write to stdout")?;
    Ok((output.stats, None))
}

/// Print the error and, when a browser could still do the job, the manual
/// print-to-PDF steps.
fn report_failure(cli: &Cli, e: &anyhow::Error) {
    eprintln!("{} {:#}", red("❌ Error:"), e);

    if !offers_manual_fallback(e) {
        return;
    }

    let output = match cli.output {
        Some(ref p) if p != Path::new("-") => p.clone(),
        _ => default_output_path(&cli.input).unwrap_or_else(|_| PathBuf::from("resume.pdf")),
    };
    eprintln!("\n📝 {}", ManualFallback::new(cli.input.clone(), &output));
}

/// Engine and rendering failures get the manual steps; bad input or flags
/// would fail in a browser too.
fn offers_manual_fallback(e: &anyhow::Error) -> bool {
    e.downcast_ref::<Html2PdfError>()
        .is_some_and(Html2PdfError::needs_manual_fallback)
}

/// Map CLI args to `RenderConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RenderConfig> {
    let mut builder = RenderConfig::builder()
        .paper(cli.format)
        .margins(cli.margin)
        .landscape(cli.landscape)
        .print_background(!cli.no_background)
        .scale(cli.scale)
        .prefer_css_page_size(cli.prefer_css_page_size)
        .navigation_timeout_secs(cli.timeout)
        .settle_delay_ms(cli.settle_ms)
        .wait_for_fonts(!cli.no_font_wait)
        .auto_install(!cli.no_install)
        .sandbox(!cli.no_sandbox);

    if let Some(ref pages) = cli.pages {
        builder = builder.page_ranges(pages.clone());
    }
    if let Some(ref path) = cli.header_template {
        builder = builder.header_template(read_template(path).await?);
    }
    if let Some(ref path) = cli.footer_template {
        builder = builder.footer_template(read_template(path).await?);
    }
    if let Some(ref chrome) = cli.chrome {
        builder = builder.chrome_path(chrome.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_template(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read template from {:?}", path))
}
