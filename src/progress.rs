//! Progress-callback trait for render events.
//!
//! Inject an [`Arc<dyn RenderProgressCallback>`] via
//! [`crate::config::RenderConfigBuilder::progress_callback`] to receive
//! events as the pipeline resolves the engine, loads the page and prints it.
//!
//! # Example
//!
//! ```rust
//! use resume2pdf::{RenderConfig, RenderProgressCallback, RenderStage};
//! use std::sync::Arc;
//!
//! struct StageLogger;
//!
//! impl RenderProgressCallback for StageLogger {
//!     fn on_stage(&self, stage: RenderStage) {
//!         eprintln!("{}", stage.label());
//!     }
//! }
//!
//! let config = RenderConfig::builder()
//!     .progress_callback(Arc::new(StageLogger) as Arc<dyn RenderProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::sync::Arc;

/// The phases of a single render, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RenderStage {
    /// Looking for an installed browser.
    ResolvingEngine,
    /// Downloading a headless browser.
    InstallingEngine,
    /// Starting the browser process.
    LaunchingEngine,
    /// Navigating to the document and waiting for it to settle.
    LoadingDocument,
    /// Running print-to-PDF.
    Printing,
    /// Writing the PDF to disk.
    Writing,
}

impl RenderStage {
    /// Short human-readable description.
    pub fn label(&self) -> &'static str {
        match self {
            RenderStage::ResolvingEngine => "Looking for a browser…",
            RenderStage::InstallingEngine => "Installing headless Chrome…",
            RenderStage::LaunchingEngine => "Starting browser…",
            RenderStage::LoadingDocument => "Loading document…",
            RenderStage::Printing => "Printing to PDF…",
            RenderStage::Writing => "Writing PDF…",
        }
    }
}

/// Called by the render pipeline as it progresses.
///
/// Implementations must be `Send + Sync`: events fire from the blocking
/// thread that drives the browser. All methods default to no-ops.
pub trait RenderProgressCallback: Send + Sync {
    /// Called when the pipeline enters a new stage.
    fn on_stage(&self, stage: RenderStage) {
        let _ = stage;
    }

    /// Called repeatedly while the engine downloads.
    ///
    /// # Arguments
    /// * `downloaded` — bytes received so far
    /// * `total`      — content length, when the server sent one
    fn on_engine_download(&self, downloaded: u64, total: Option<u64>) {
        let _ = (downloaded, total);
    }

    /// Called when an installed browser failed to start and the pipeline
    /// is about to retry with a freshly downloaded one.
    fn on_engine_retry(&self, reason: &str) {
        let _ = reason;
    }

    /// Called once after the PDF bytes were produced.
    fn on_complete(&self, pdf_bytes: usize) {
        let _ = pdf_bytes;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RenderProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RenderConfig`].
pub type ProgressCallback = Arc<dyn RenderProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        stages: Mutex<Vec<RenderStage>>,
        retries: Mutex<Vec<String>>,
    }

    impl RenderProgressCallback for Recorder {
        fn on_stage(&self, stage: RenderStage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_engine_retry(&self, reason: &str) {
            self.retries.lock().unwrap().push(reason.to_string());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage(RenderStage::Printing);
        cb.on_engine_download(10, Some(100));
        cb.on_engine_retry("exit 1");
        cb.on_complete(4096);
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Arc::new(Recorder::default());
        let cb: ProgressCallback = rec.clone();

        cb.on_stage(RenderStage::ResolvingEngine);
        cb.on_stage(RenderStage::LaunchingEngine);
        cb.on_engine_retry("sandbox");
        cb.on_stage(RenderStage::Printing);

        assert_eq!(
            *rec.stages.lock().unwrap(),
            vec![
                RenderStage::ResolvingEngine,
                RenderStage::LaunchingEngine,
                RenderStage::Printing
            ]
        );
        assert_eq!(*rec.retries.lock().unwrap(), vec!["sandbox".to_string()]);
    }

    #[test]
    fn every_stage_has_a_label() {
        for stage in [
            RenderStage::ResolvingEngine,
            RenderStage::InstallingEngine,
            RenderStage::LaunchingEngine,
            RenderStage::LoadingDocument,
            RenderStage::Printing,
            RenderStage::Writing,
        ] {
            assert!(stage.label().ends_with('…'));
        }
    }
}
