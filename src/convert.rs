//! Conversion entry points.
//!
//! [`convert`] returns the PDF in memory; [`convert_to_file`] writes it
//! atomically. Both resolve the input before touching the browser, so a
//! missing file fails fast without a browser start-up or a download.

use crate::config::RenderConfig;
use crate::error::Html2PdfError;
use crate::output::{count_pdf_pages, DocumentInfo, RenderOutput, RenderStats};
use crate::pipeline::{input, inspect as html_inspect, render};
use crate::progress::RenderStage;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Render an HTML file or URL to PDF.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local HTML file path or HTTP/HTTPS URL
/// * `config` — Render configuration
///
/// # Errors
/// - Input not found, unreadable, or not HTML
/// - No browser available and automatic installation disabled or failed
/// - The page failed to load or print
pub async fn convert(
    input_str: impl AsRef<str>,
    config: &RenderConfig,
) -> Result<RenderOutput, Html2PdfError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting render: {}", input_str);

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str)?;

    if let Some(path) = resolved.local_path() {
        if let Ok(doc) = html_inspect::inspect_file(path).await {
            debug!(?doc, "document facts");
            if doc.has_page_rule && !config.prefer_css_page_size {
                debug!("Document has an @page rule but prefer_css_page_size is off");
            }
        }
    }

    // ── Step 2: Engine, load, print ──────────────────────────────────────
    let rendered = render::render_document(resolved.url(), config).await?;

    // ── Step 3: Stats ────────────────────────────────────────────────────
    let stats = RenderStats {
        pdf_bytes: rendered.pdf.len(),
        page_count: count_pdf_pages(&rendered.pdf),
        engine: rendered.engine,
        engine_retried: rendered.engine_retried,
        engine_duration_ms: rendered.engine_duration_ms,
        load_duration_ms: rendered.load_duration_ms,
        print_duration_ms: rendered.print_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Render complete: {} pages, {} bytes, {}ms total",
        stats.page_count, stats.pdf_bytes, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_complete(stats.pdf_bytes);
    }

    Ok(RenderOutput {
        pdf: rendered.pdf,
        source_url: resolved.url().to_string(),
        stats,
    })
}

/// Render a document and write the PDF directly to a file.
///
/// Uses atomic write (temp file + rename) so a failed render never leaves
/// a truncated PDF behind.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &RenderConfig,
) -> Result<RenderStats, Html2PdfError> {
    let output = convert(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(RenderStage::Writing);
    }
    write_atomic(path, &output.pdf).await?;
    info!("Wrote {}", path.display());

    Ok(output.stats)
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), Html2PdfError> {
    let write_err = |e: std::io::Error| Html2PdfError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }
    Ok(())
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input_str: impl AsRef<str>,
    config: &RenderConfig,
) -> Result<RenderOutput, Html2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Html2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input_str, config))
}

/// Render HTML source held in memory.
///
/// The markup is written to a managed [`tempfile`] that is removed on
/// return. Relative URLs in the markup resolve against the temp directory,
/// so inline your CSS or use absolute URLs.
///
/// # Example
/// ```rust,no_run
/// use resume2pdf::{convert_from_html, RenderConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let html = "<h1>Jane Doe</h1><p>Rust engineer</p>";
/// let output = convert_from_html(html, &RenderConfig::default()).await?;
/// std::fs::write("jane.pdf", &output.pdf)?;
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_html(
    html: &str,
    config: &RenderConfig,
) -> Result<RenderOutput, Html2PdfError> {
    let mut tmp = tempfile::Builder::new()
        .prefix("resume2pdf-")
        .suffix(".html")
        .tempfile()
        .map_err(|e| Html2PdfError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(html.as_bytes())
        .map_err(|e| Html2PdfError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `convert` returns
    convert(&path, config).await
}

/// Read static facts about a local HTML file. Does not start a browser.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentInfo, Html2PdfError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str)?;
    let path = resolved
        .local_path()
        .ok_or_else(|| Html2PdfError::InvalidInput {
            input: input_str.to_string(),
            reason: "inspection needs a local file".into(),
        })?;
    html_inspect::inspect_file(path).await
}

/// The output path used when the caller does not name one: the input's
/// stem with a `.pdf` extension.
pub fn default_output_path(input_str: impl AsRef<str>) -> Result<PathBuf, Html2PdfError> {
    let resolved = input::resolve_input(input_str.as_ref())?;
    Ok(input::default_output_path(&resolved))
}
