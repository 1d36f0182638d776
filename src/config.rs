//! Configuration types for HTML-to-PDF rendering.
//!
//! All rendering behaviour is controlled through [`RenderConfig`], built via
//! its [`RenderConfigBuilder`]. Lengths are stored in inches because that is
//! the unit Chrome's `Page.printToPDF` expects; [`parse_length`] converts the
//! CSS units people actually type.

use crate::error::Html2PdfError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Configuration for one HTML-to-PDF render.
///
/// Built via [`RenderConfig::builder()`] or using [`RenderConfig::default()`].
///
/// # Example
/// ```rust
/// use resume2pdf::{Margins, PaperFormat, RenderConfig};
///
/// let config = RenderConfig::builder()
///     .paper(PaperFormat::Letter)
///     .margins(Margins::uniform(0.75))
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RenderConfig {
    /// Paper size. Default: A4.
    pub paper: PaperFormat,

    /// Page margins in inches. Default: 0.5in on every side.
    pub margins: Margins,

    /// Rotate the paper. Default: false.
    pub landscape: bool,

    /// Print CSS background colours and images. Default: true.
    ///
    /// Resumes lean on coloured sidebars and header bands; browsers drop
    /// those when printing unless told otherwise.
    pub print_background: bool,

    /// Rendering scale, 0.1–2.0. Default: 1.0.
    pub scale: f64,

    /// Use the document's `@page { size: … }` over [`Self::paper`]. Default: false.
    pub prefer_css_page_size: bool,

    /// Pages to print, e.g. `"1-2, 4"`. `None` prints everything.
    pub page_ranges: Option<String>,

    /// HTML template for the print header. Setting either template turns
    /// header/footer display on.
    pub header_template: Option<String>,

    /// HTML template for the print footer.
    pub footer_template: Option<String>,

    /// Page-load timeout in seconds. Default: 60.
    pub navigation_timeout_secs: u64,

    /// Pause after load before printing, in milliseconds. Default: 250.
    ///
    /// Gives late scripts and CSS transitions a moment to finish; the
    /// DevTools protocol has no direct "network idle" signal.
    pub settle_delay_ms: u64,

    /// Wait for `document.fonts.ready` before printing. Default: true.
    pub wait_for_fonts: bool,

    /// Download a headless browser when none is installed, and retry a
    /// failed launch once with it. Default: true.
    pub auto_install: bool,

    /// Explicit browser executable. Skips discovery when set.
    pub chrome_path: Option<PathBuf>,

    /// Run the browser sandboxed. Default: true.
    pub sandbox: bool,

    /// Receives stage and download events while rendering.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            paper: PaperFormat::default(),
            margins: Margins::default(),
            landscape: false,
            print_background: true,
            scale: 1.0,
            prefer_css_page_size: false,
            page_ranges: None,
            header_template: None,
            footer_template: None,
            navigation_timeout_secs: 60,
            settle_delay_ms: 250,
            wait_for_fonts: true,
            auto_install: true,
            chrome_path: None,
            sandbox: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RenderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderConfig")
            .field("paper", &self.paper)
            .field("margins", &self.margins)
            .field("landscape", &self.landscape)
            .field("print_background", &self.print_background)
            .field("scale", &self.scale)
            .field("prefer_css_page_size", &self.prefer_css_page_size)
            .field("page_ranges", &self.page_ranges)
            .field("header_template", &self.header_template)
            .field("footer_template", &self.footer_template)
            .field("navigation_timeout_secs", &self.navigation_timeout_secs)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("wait_for_fonts", &self.wait_for_fonts)
            .field("auto_install", &self.auto_install)
            .field("chrome_path", &self.chrome_path)
            .field("sandbox", &self.sandbox)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn RenderProgressCallback>"),
            )
            .finish()
    }
}

impl RenderConfig {
    /// Create a new builder for `RenderConfig`.
    pub fn builder() -> RenderConfigBuilder {
        RenderConfigBuilder {
            config: Self::default(),
        }
    }

    /// Paper `(width, height)` in inches after applying orientation.
    pub fn paper_size_in(&self) -> (f64, f64) {
        self.paper.dimensions_in(self.landscape)
    }

    /// Whether the header/footer band should be printed.
    pub fn displays_header_footer(&self) -> bool {
        self.header_template.is_some() || self.footer_template.is_some()
    }
}

/// Builder for [`RenderConfig`].
#[derive(Debug)]
pub struct RenderConfigBuilder {
    config: RenderConfig,
}

impl RenderConfigBuilder {
    pub fn paper(mut self, paper: PaperFormat) -> Self {
        self.config.paper = paper;
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.config.margins = margins;
        self
    }

    pub fn landscape(mut self, v: bool) -> Self {
        self.config.landscape = v;
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.config.print_background = v;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.config.scale = scale.clamp(0.1, 2.0);
        self
    }

    pub fn prefer_css_page_size(mut self, v: bool) -> Self {
        self.config.prefer_css_page_size = v;
        self
    }

    pub fn page_ranges(mut self, ranges: impl Into<String>) -> Self {
        self.config.page_ranges = Some(ranges.into());
        self
    }

    pub fn header_template(mut self, html: impl Into<String>) -> Self {
        self.config.header_template = Some(html.into());
        self
    }

    pub fn footer_template(mut self, html: impl Into<String>) -> Self {
        self.config.footer_template = Some(html.into());
        self
    }

    pub fn navigation_timeout_secs(mut self, secs: u64) -> Self {
        self.config.navigation_timeout_secs = secs;
        self
    }

    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.config.settle_delay_ms = ms;
        self
    }

    pub fn wait_for_fonts(mut self, v: bool) -> Self {
        self.config.wait_for_fonts = v;
        self
    }

    pub fn auto_install(mut self, v: bool) -> Self {
        self.config.auto_install = v;
        self
    }

    pub fn chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_path = Some(path.into());
        self
    }

    pub fn sandbox(mut self, v: bool) -> Self {
        self.config.sandbox = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RenderConfig, Html2PdfError> {
        let c = &self.config;

        if let PaperFormat::Custom { width_in, height_in } = c.paper {
            if !(width_in > 0.0 && height_in > 0.0) {
                return Err(Html2PdfError::InvalidConfig(format!(
                    "Paper dimensions must be positive, got {width_in}in × {height_in}in"
                )));
            }
        }

        if !(0.1..=2.0).contains(&c.scale) {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Scale must be 0.1–2.0, got {}",
                c.scale
            )));
        }

        let m = &c.margins;
        if [m.top, m.right, m.bottom, m.left].iter().any(|v| *v < 0.0 || !v.is_finite()) {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Margins must be non-negative, got {m}"
            )));
        }

        let (width, height) = c.paper_size_in();
        if m.left + m.right >= width || m.top + m.bottom >= height {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Margins {m} leave no printable area on {width:.2}in × {height:.2}in paper"
            )));
        }

        if c.navigation_timeout_secs == 0 {
            return Err(Html2PdfError::InvalidConfig(
                "Navigation timeout must be ≥ 1 second".into(),
            ));
        }

        if let Some(ref ranges) = c.page_ranges {
            validate_page_ranges(ranges)?;
        }

        Ok(self.config)
    }
}

// ── Paper ────────────────────────────────────────────────────────────────

/// Paper size for the printed document.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PaperFormat {
    A3,
    /// 210 × 297 mm. (default)
    #[default]
    A4,
    A5,
    /// 8.5 × 11 in.
    Letter,
    /// 8.5 × 14 in.
    Legal,
    /// 11 × 17 in.
    Tabloid,
    /// Arbitrary size in inches, portrait orientation.
    Custom { width_in: f64, height_in: f64 },
}

impl PaperFormat {
    /// `(width, height)` in inches; swapped when `landscape`.
    pub fn dimensions_in(&self, landscape: bool) -> (f64, f64) {
        let (w, h) = match *self {
            PaperFormat::A3 => (11.69, 16.54),
            PaperFormat::A4 => (8.27, 11.69),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Custom { width_in, height_in } => (width_in, height_in),
        };
        if landscape {
            (h, w)
        } else {
            (w, h)
        }
    }
}

impl FromStr for PaperFormat {
    type Err = Html2PdfError;

    /// Accepts a format name (`a4`, `letter`, …) or `WIDTHxHEIGHT` with
    /// units, e.g. `210mmx297mm` or `8.5x11`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "a3" => return Ok(PaperFormat::A3),
            "a4" => return Ok(PaperFormat::A4),
            "a5" => return Ok(PaperFormat::A5),
            "letter" => return Ok(PaperFormat::Letter),
            "legal" => return Ok(PaperFormat::Legal),
            "tabloid" => return Ok(PaperFormat::Tabloid),
            _ => {}
        }

        let (w, h) = lower.split_once('x').ok_or_else(|| {
            Html2PdfError::InvalidConfig(format!(
                "Unknown paper format '{s}' (expected a3, a4, a5, letter, legal, tabloid or WxH)"
            ))
        })?;

        Ok(PaperFormat::Custom {
            width_in: parse_length(w)?,
            height_in: parse_length(h)?,
        })
    }
}

// ── Margins ──────────────────────────────────────────────────────────────

/// Page margins in inches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(0.5)
    }
}

impl fmt::Display for Margins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}in {}in {}in {}in",
            self.top, self.right, self.bottom, self.left
        )
    }
}

impl Margins {
    /// The same margin on every side.
    pub fn uniform(inches: f64) -> Self {
        Self {
            top: inches,
            right: inches,
            bottom: inches,
            left: inches,
        }
    }

    /// Parse CSS margin shorthand: `"0.5in"`, `"10mm 15mm"`, or
    /// `"1cm 2cm 1cm 2cm"` (top right bottom left).
    pub fn parse(s: &str) -> Result<Self, Html2PdfError> {
        let values = s
            .split_whitespace()
            .map(parse_length)
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [all] => Ok(Self::uniform(*all)),
            [vertical, horizontal] => Ok(Self {
                top: *vertical,
                right: *horizontal,
                bottom: *vertical,
                left: *horizontal,
            }),
            [top, right, bottom, left] => Ok(Self {
                top: *top,
                right: *right,
                bottom: *bottom,
                left: *left,
            }),
            _ => Err(Html2PdfError::InvalidConfig(format!(
                "Margin '{s}' must have 1, 2 or 4 values"
            ))),
        }
    }
}

/// Parse a CSS-style length into inches.
///
/// Units: `in`, `cm`, `mm`, `px` (1/96 in), `pt` (1/72 in). A bare number
/// is taken as inches.
pub fn parse_length(s: &str) -> Result<f64, Html2PdfError> {
    let s = s.trim().to_lowercase();
    let split = s
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(s.len());
    let (number, unit) = s.split_at(split);

    let value: f64 = number.trim().parse().map_err(|_| {
        Html2PdfError::InvalidConfig(format!("Invalid length '{s}'"))
    })?;

    let inches = match unit.trim() {
        "" | "in" => value,
        "cm" => value / 2.54,
        "mm" => value / 25.4,
        "px" => value / 96.0,
        "pt" => value / 72.0,
        other => {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Unknown length unit '{other}' in '{s}' (use in, cm, mm, px or pt)"
            )))
        }
    };

    if !inches.is_finite() {
        return Err(Html2PdfError::InvalidConfig(format!("Invalid length '{s}'")));
    }
    Ok(inches)
}

/// Check a page-range expression like `"1-3, 5"` before handing it to
/// the engine, which otherwise reports only a generic protocol error.
fn validate_page_ranges(ranges: &str) -> Result<(), Html2PdfError> {
    let invalid = |part: &str| {
        Html2PdfError::InvalidConfig(format!(
            "Invalid page range '{part}' in '{ranges}' (pages are 1-indexed, e.g. 1-3,5)"
        ))
    };

    if ranges.trim().is_empty() {
        return Err(invalid(ranges));
    }

    for part in ranges.split(',').map(str::trim) {
        let (start, end) = match part.split_once('-') {
            Some((s, e)) => (s.trim(), e.trim()),
            None => (part, part),
        };
        let start: usize = start.parse().map_err(|_| invalid(part))?;
        let end: usize = end.parse().map_err(|_| invalid(part))?;
        if start < 1 || start > end {
            return Err(invalid(part));
        }
    }
    Ok(())
}
