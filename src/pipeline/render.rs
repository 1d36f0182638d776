//! Printing: load the document in headless Chrome and call `Page.printToPDF`.
//!
//! ## Why spawn_blocking?
//!
//! `headless_chrome` drives the browser over a synchronous websocket client
//! and blocks the calling thread while waiting for DevTools events.
//! `tokio::task::spawn_blocking` moves that work onto the blocking pool so
//! the async workers stay free.
//!
//! ## Waiting for the page to settle
//!
//! `wait_until_navigated` returns on the load event. Web fonts can still be
//! swapping in at that point, which shifts line breaks in the PDF, so we
//! also await `document.fonts.ready` and then pause for a short settle delay
//! to let late scripts finish.

use crate::config::RenderConfig;
use crate::error::Html2PdfError;
use crate::output::EngineSource;
use crate::pipeline::engine;
use crate::progress::RenderStage;
use headless_chrome::types::PrintToPdfOptions;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// An empty template suppresses Chrome's default date/title header when
/// only the other band was configured.
const BLANK_TEMPLATE: &str = "<span></span>";

/// Raw result of one print.
#[derive(Debug)]
pub struct RenderedPdf {
    pub pdf: Vec<u8>,
    pub engine: EngineSource,
    pub engine_retried: bool,
    pub engine_duration_ms: u64,
    pub load_duration_ms: u64,
    pub print_duration_ms: u64,
}

/// Render the document at `url` to PDF bytes.
pub async fn render_document(
    url: &Url,
    config: &RenderConfig,
) -> Result<RenderedPdf, Html2PdfError> {
    let url = url.to_string();
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_blocking(&url, &config))
        .await
        .map_err(|e| Html2PdfError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of the render.
fn render_blocking(url: &str, config: &RenderConfig) -> Result<RenderedPdf, Html2PdfError> {
    let engine_start = Instant::now();
    let engine = engine::start_engine(config)?;
    let engine_duration_ms = engine_start.elapsed().as_millis() as u64;
    debug!("Browser ready in {}ms", engine_duration_ms);

    // ── Load ─────────────────────────────────────────────────────────────
    notify(config, RenderStage::LoadingDocument);
    let load_start = Instant::now();
    let timeout_secs = config.navigation_timeout_secs;

    let tab = engine
        .browser
        .new_tab()
        .map_err(|e| navigation_error(url, timeout_secs, e))?;
    tab.set_default_timeout(Duration::from_secs(timeout_secs));

    tab.navigate_to(url)
        .and_then(|t| t.wait_until_navigated())
        .map_err(|e| navigation_error(url, timeout_secs, e))?;

    if config.wait_for_fonts {
        // A page that blocks font loading still prints; just with fallbacks.
        if let Err(e) = tab.evaluate("document.fonts.ready.then(() => true)", true) {
            warn!("Waiting for web fonts failed, printing anyway: {}", e);
        }
    }
    if config.settle_delay_ms > 0 {
        std::thread::sleep(Duration::from_millis(config.settle_delay_ms));
    }
    let load_duration_ms = load_start.elapsed().as_millis() as u64;
    info!("Loaded {} in {}ms", url, load_duration_ms);

    // ── Print ────────────────────────────────────────────────────────────
    notify(config, RenderStage::Printing);
    let print_start = Instant::now();
    let pdf = tab
        .print_to_pdf(Some(print_options(config)))
        .map_err(|e| Html2PdfError::PrintFailed(e.to_string()))?;
    let print_duration_ms = print_start.elapsed().as_millis() as u64;

    ensure_pdf(&pdf)?;
    info!("Printed {} bytes in {}ms", pdf.len(), print_duration_ms);

    Ok(RenderedPdf {
        pdf,
        engine: engine.source,
        engine_retried: engine.retried,
        engine_duration_ms,
        load_duration_ms,
        print_duration_ms,
    })
}

/// Translate the render configuration into DevTools print options.
pub fn print_options(config: &RenderConfig) -> PrintToPdfOptions {
    // Chrome applies `landscape` itself, so pass portrait dimensions.
    let (paper_width, paper_height) = config.paper.dimensions_in(false);
    let header_footer = config.displays_header_footer();
    let template = |t: &Option<String>| {
        header_footer.then(|| t.clone().unwrap_or_else(|| BLANK_TEMPLATE.to_string()))
    };

    PrintToPdfOptions {
        landscape: Some(config.landscape),
        display_header_footer: Some(header_footer),
        print_background: Some(config.print_background),
        scale: Some(config.scale),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(config.margins.top),
        margin_bottom: Some(config.margins.bottom),
        margin_left: Some(config.margins.left),
        margin_right: Some(config.margins.right),
        page_ranges: config.page_ranges.clone(),
        header_template: template(&config.header_template),
        footer_template: template(&config.footer_template),
        prefer_css_page_size: Some(config.prefer_css_page_size),
        ..Default::default()
    }
}

/// Reject engine output that is not a PDF.
pub fn ensure_pdf(bytes: &[u8]) -> Result<(), Html2PdfError> {
    if bytes.starts_with(b"%PDF-") {
        Ok(())
    } else {
        Err(Html2PdfError::InvalidPdfOutput {
            magic: bytes.iter().take(8).copied().collect(),
        })
    }
}

fn navigation_error(url: &str, secs: u64, e: impl std::fmt::Display) -> Html2PdfError {
    let reason = e.to_string();
    if is_timeout(&reason) {
        Html2PdfError::NavigationTimeout {
            url: url.to_string(),
            secs,
        }
    } else {
        Html2PdfError::NavigationFailed {
            url: url.to_string(),
            reason,
        }
    }
}

/// `headless_chrome` reports timeouts as "The event waited for never came".
fn is_timeout(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    lower.contains("never came") || lower.contains("timed out") || lower.contains("timeout")
}

fn notify(config: &RenderConfig, stage: RenderStage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}
