//! # resume2pdf
//!
//! Render an HTML resume (or any HTML page) to PDF with headless Chrome.
//!
//! ## Why a browser?
//!
//! A resume is laid out with modern CSS: grid sidebars, web fonts, print
//! media queries. Only a real browser engine prints that faithfully, so
//! this crate drives one over the DevTools protocol instead of shipping its
//! own layout engine. When no browser is installed, a pinned
//! `chrome-headless-shell` build is downloaded once and cached.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML
//!  │
//!  ├─ 1. Input   resolve local file (→ file:// URL) or HTTP(S) URL
//!  ├─ 2. Engine  find Chrome, or install headless shell; retry launch once
//!  ├─ 3. Load    navigate, wait for load + web fonts, settle
//!  ├─ 4. Print   Page.printToPDF (A4, 0.5in margins, backgrounds on)
//!  └─ 5. Output  PDF bytes + timings, optionally written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resume2pdf::{convert_to_file, RenderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RenderConfig::default();
//!     let stats = convert_to_file("resume.html", "resume.pdf", &config).await?;
//!     eprintln!("{} pages, {} bytes", stats.page_count, stats.pdf_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `resume2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! resume2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod fallback;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{parse_length, Margins, PaperFormat, RenderConfig, RenderConfigBuilder};
pub use convert::{
    convert, convert_from_html, convert_sync, convert_to_file, default_output_path, inspect,
};
pub use error::Html2PdfError;
pub use fallback::ManualFallback;
pub use output::{DocumentInfo, EngineSource, RenderOutput, RenderStats};
pub use pipeline::engine::describe_engine;
pub use progress::{NoopProgressCallback, ProgressCallback, RenderProgressCallback, RenderStage};
