//! Result types returned by the conversion entry points.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::Serialize;

/// A finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutput {
    /// The PDF document.
    #[serde(skip)]
    pub pdf: Vec<u8>,
    /// The document URL the engine loaded.
    pub source_url: String,
    /// Timings and sizes.
    pub stats: RenderStats,
}

/// Statistics for one render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderStats {
    /// Size of the PDF in bytes.
    pub pdf_bytes: usize,
    /// Best-effort page count from the PDF's page objects.
    pub page_count: usize,
    /// Where the browser came from.
    pub engine: EngineSource,
    /// Whether the render needed the install-and-retry path.
    pub engine_retried: bool,
    /// Time spent finding, installing and starting the browser.
    pub engine_duration_ms: u64,
    /// Time spent loading and settling the document.
    pub load_duration_ms: u64,
    /// Time spent in print-to-PDF.
    pub print_duration_ms: u64,
    /// Wall-clock time for the whole render.
    pub total_duration_ms: u64,
}

/// How the browser executable was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EngineSource {
    /// Passed explicitly through the configuration.
    #[default]
    Explicit,
    /// `CHROME_PATH`.
    EnvOverride,
    /// Installed on the system.
    System,
    /// Downloaded earlier and found in the cache.
    Cached,
    /// Downloaded during this render.
    Downloaded,
}

impl From<chrome_auto::ChromeSource> for EngineSource {
    fn from(s: chrome_auto::ChromeSource) -> Self {
        match s {
            chrome_auto::ChromeSource::EnvOverride => EngineSource::EnvOverride,
            chrome_auto::ChromeSource::System => EngineSource::System,
            chrome_auto::ChromeSource::Cached => EngineSource::Cached,
        }
    }
}

/// Static facts about an HTML document, gathered without a browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    /// Contents of `<title>`, whitespace-collapsed.
    pub title: Option<String>,
    /// The `lang` attribute of `<html>`.
    pub lang: Option<String>,
    /// File size in bytes.
    pub byte_size: u64,
    /// `<link rel="stylesheet">` plus inline `<style>` blocks.
    pub stylesheet_count: usize,
    /// `<img>` elements.
    pub image_count: usize,
    /// `@media print` rules or `media="print"` stylesheets are present.
    pub has_print_styles: bool,
    /// An `@page` rule is present.
    pub has_page_rule: bool,
}

static PAGE_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/Type\s*/Page\b").unwrap());

/// Count `/Type /Page` objects in an uncompressed PDF object table.
///
/// Chrome writes page dictionaries uncompressed, so this is exact for its
/// output; other producers using object streams yield 0.
pub fn count_pdf_pages(pdf: &[u8]) -> usize {
    PAGE_OBJECT.find_iter(pdf).count()
}
