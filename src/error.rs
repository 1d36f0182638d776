//! Error types for the resume2pdf library.
//!
//! Every failure is fatal for the render it belongs to and is returned as
//! `Err(Html2PdfError)` from the top-level `convert*` functions. Two failure
//! kinds matter to callers:
//!
//! * **Missing engine** ([`Html2PdfError::is_engine_missing`]): no usable
//!   browser could be found or installed. The library already attempted an
//!   automatic install and a single retry when `auto_install` is on.
//!
//! * **Everything else**: the engine ran but the page could not be loaded,
//!   printed, or written. [`Html2PdfError::needs_manual_fallback`] tells the
//!   caller whether printing from a regular browser is a sensible workaround.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the resume2pdf library.
#[derive(Debug, Error)]
pub enum Html2PdfError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("HTML file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable file path or URL.
    #[error("Invalid input '{input}': {reason}")]
    InvalidInput { input: String, reason: String },

    /// The file exists but does not look like an HTML document.
    #[error("File does not look like HTML: '{path}'\nExpected a .html/.htm file or markup starting with '<'.")]
    NotHtml { path: PathBuf },

    // ── Engine errors ─────────────────────────────────────────────────────
    /// No browser is installed and automatic installation is disabled.
    #[error("No headless browser is available.\n{hint}")]
    EngineUnavailable { hint: String },

    /// Automatic installation of the headless browser failed.
    #[error(
        "Failed to install headless Chrome: {0}\n\n\
Headless Chrome is normally downloaded automatically on first run.\n\
If the download failed, you can:\n\
  • Check your internet connection and try again.\n\
  • Install Google Chrome or Chromium through your package manager.\n\
  • Set CHROME_PATH=/path/to/chrome to use an existing copy.\n"
    )]
    EngineInstallFailed(String),

    /// The browser executable exists but could not be started.
    #[error("Failed to launch browser '{path}': {reason}\nIn containers running as root, try --no-sandbox.")]
    EngineLaunchFailed { path: PathBuf, reason: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The browser could not open the document.
    #[error("Failed to load '{url}': {reason}")]
    NavigationFailed { url: String, reason: String },

    /// Page load exceeded the configured timeout.
    #[error("Loading '{url}' timed out after {secs}s\nIncrease --timeout.")]
    NavigationTimeout { url: String, secs: u64 },

    /// The print-to-PDF call itself failed.
    #[error("Print to PDF failed: {0}")]
    PrintFailed(String),

    /// The engine returned bytes that are not a PDF.
    #[error("Engine output is not a PDF (first bytes: {magic:?})")]
    InvalidPdfOutput { magic: Vec<u8> },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Html2PdfError {
    /// True when the failure is the missing-dependency kind: no browser
    /// could be found, installed, or started.
    pub fn is_engine_missing(&self) -> bool {
        matches!(
            self,
            Html2PdfError::EngineUnavailable { .. }
                | Html2PdfError::EngineInstallFailed(_)
                | Html2PdfError::EngineLaunchFailed { .. }
        )
    }

    /// True when printing the document from a regular browser could still
    /// produce the PDF. Input and configuration mistakes are excluded: a
    /// browser would not fix those either.
    pub fn needs_manual_fallback(&self) -> bool {
        !matches!(
            self,
            Html2PdfError::FileNotFound { .. }
                | Html2PdfError::PermissionDenied { .. }
                | Html2PdfError::InvalidInput { .. }
                | Html2PdfError::NotHtml { .. }
                | Html2PdfError::InvalidConfig(_)
        )
    }
}

impl From<chrome_auto::ChromeAutoError> for Html2PdfError {
    fn from(e: chrome_auto::ChromeAutoError) -> Self {
        match e {
            chrome_auto::ChromeAutoError::Launch { path, reason } => {
                Html2PdfError::EngineLaunchFailed { path, reason }
            }
            other => Html2PdfError::EngineInstallFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_timeout_display() {
        let e = Html2PdfError::NavigationTimeout {
            url: "file:///tmp/resume.html".into(),
            secs: 30,
        };
        let msg = e.to_string();
        assert!(msg.contains("30s"), "got: {msg}");
        assert!(msg.contains("resume.html"), "got: {msg}");
    }

    #[test]
    fn engine_errors_are_missing_kind() {
        assert!(Html2PdfError::EngineUnavailable { hint: "x".into() }.is_engine_missing());
        assert!(Html2PdfError::EngineInstallFailed("offline".into()).is_engine_missing());
        assert!(!Html2PdfError::PrintFailed("boom".into()).is_engine_missing());
    }

    #[test]
    fn input_errors_skip_manual_fallback() {
        let e = Html2PdfError::FileNotFound {
            path: PathBuf::from("resume.html"),
        };
        assert!(!e.needs_manual_fallback());
        assert!(!Html2PdfError::InvalidConfig("scale".into()).needs_manual_fallback());
    }

    #[test]
    fn render_errors_offer_manual_fallback() {
        assert!(Html2PdfError::PrintFailed("boom".into()).needs_manual_fallback());
        assert!(Html2PdfError::EngineInstallFailed("offline".into()).needs_manual_fallback());
    }

    #[test]
    fn launch_error_converts_to_engine_launch_failed() {
        let e: Html2PdfError = chrome_auto::ChromeAutoError::Launch {
            path: PathBuf::from("/usr/bin/chromium"),
            reason: "exit status 1".into(),
        }
        .into();
        assert!(matches!(e, Html2PdfError::EngineLaunchFailed { .. }));
        assert!(e.to_string().contains("--no-sandbox"));
    }

    #[test]
    fn download_error_converts_to_install_failed() {
        let e: Html2PdfError = chrome_auto::ChromeAutoError::Download("HTTP 404".into()).into();
        assert!(matches!(e, Html2PdfError::EngineInstallFailed(_)));
        assert!(e.to_string().contains("CHROME_PATH"));
    }
}
