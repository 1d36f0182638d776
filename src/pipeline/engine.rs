//! Engine provisioning: find a browser, install one when missing, and
//! retry a failed launch once with a freshly installed build.
//!
//! Resolution order:
//!
//! 1. `RenderConfig::chrome_path`, used as-is.
//! 2. An installed browser (`CHROME_PATH`, system Chrome/Chromium/Edge, or
//!    a previous download), via [`chrome_auto::find_installed_chrome`].
//! 3. With `auto_install`, the pinned headless shell from
//!    [`chrome_auto::download_chrome`].
//!
//! When a system browser refuses to start (snap confinement, a broken
//! profile, a version too old for the protocol) and `auto_install` is on,
//! the pinned build is installed and the launch is retried exactly once.
//! An explicit `chrome_path` is never second-guessed.
//!
//! Everything here blocks; call it from `spawn_blocking`.

use crate::config::RenderConfig;
use crate::error::Html2PdfError;
use crate::output::EngineSource;
use crate::progress::RenderStage;
use chrome_auto::{ChromeAutoError, LaunchSettings, ResolvedChrome};
use headless_chrome::Browser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

const NO_ENGINE_HINT: &str = "Install Google Chrome or Chromium, set CHROME_PATH=/path/to/chrome, \
or allow the automatic download (drop --no-install).";

/// A running browser and how it was obtained.
pub struct Engine<B = Browser> {
    pub browser: B,
    pub source: EngineSource,
    /// The first launch failed and this browser came from the retry.
    pub retried: bool,
}

/// The three side effects of engine provisioning. [`ChromeProvisioner`]
/// is the real one; tests substitute their own.
pub trait Provisioner {
    type Browser;

    /// Look for an installed browser without touching the network.
    fn find(&self) -> Option<ResolvedChrome>;

    /// Install the pinned build, reporting download progress.
    fn install(
        &self,
        on_progress: &dyn Fn(u64, Option<u64>),
    ) -> Result<(PathBuf, EngineSource), Html2PdfError>;

    fn launch(&self, path: &Path, settings: &LaunchSettings)
        -> Result<Self::Browser, ChromeAutoError>;
}

/// Provisioning through `chrome-auto` and `headless_chrome`.
pub struct ChromeProvisioner;

impl Provisioner for ChromeProvisioner {
    type Browser = Browser;

    fn find(&self) -> Option<ResolvedChrome> {
        chrome_auto::find_installed_chrome()
    }

    fn install(
        &self,
        on_progress: &dyn Fn(u64, Option<u64>),
    ) -> Result<(PathBuf, EngineSource), Html2PdfError> {
        let already_cached = chrome_auto::cached_chrome_path().is_some();
        let path = chrome_auto::download_chrome(Some(on_progress))
            .map_err(|e| Html2PdfError::EngineInstallFailed(e.to_string()))?;
        let source = if already_cached {
            EngineSource::Cached
        } else {
            EngineSource::Downloaded
        };
        Ok((path, source))
    }

    fn launch(&self, path: &Path, settings: &LaunchSettings) -> Result<Browser, ChromeAutoError> {
        chrome_auto::launch_chrome(path, settings)
    }
}

/// Launch settings derived from the render configuration.
pub fn launch_settings(config: &RenderConfig) -> LaunchSettings {
    LaunchSettings {
        sandbox: config.sandbox,
        // Outlive the slowest permitted page load with room for printing.
        idle_timeout: Duration::from_secs(config.navigation_timeout_secs.saturating_mul(2).max(60)),
    }
}

/// Resolve, install if needed, and launch the browser.
pub fn start_engine(config: &RenderConfig) -> Result<Engine, Html2PdfError> {
    start_engine_with(config, &ChromeProvisioner)
}

/// [`start_engine`] over an arbitrary [`Provisioner`].
pub fn start_engine_with<P: Provisioner>(
    config: &RenderConfig,
    provisioner: &P,
) -> Result<Engine<P::Browser>, Html2PdfError> {
    stage(config, RenderStage::ResolvingEngine);
    let settings = launch_settings(config);

    if let Some(ref path) = config.chrome_path {
        if !path.exists() {
            return Err(Html2PdfError::EngineUnavailable {
                hint: format!("Browser executable '{}' does not exist.", path.display()),
            });
        }
        stage(config, RenderStage::LaunchingEngine);
        let browser = provisioner.launch(path, &settings)?;
        return Ok(Engine {
            browser,
            source: EngineSource::Explicit,
            retried: false,
        });
    }

    let (path, source) = match provisioner.find() {
        Some(found) => (found.path, EngineSource::from(found.source)),
        None if config.auto_install => {
            info!("No browser found; installing headless Chrome {}", chrome_auto::CHROME_VERSION);
            install(config, provisioner)?
        }
        None => {
            return Err(Html2PdfError::EngineUnavailable {
                hint: NO_ENGINE_HINT.to_string(),
            })
        }
    };

    info!(path = %path.display(), source = ?source, "using browser");
    stage(config, RenderStage::LaunchingEngine);

    match provisioner.launch(&path, &settings) {
        Ok(browser) => Ok(Engine {
            browser,
            source,
            retried: false,
        }),
        Err(first) if config.auto_install && is_retryable(source) => {
            warn!("Browser at {} failed to start: {}", path.display(), first);
            if let Some(ref cb) = config.progress_callback {
                cb.on_engine_retry(&first.to_string());
            }

            let (fresh, fresh_source) = install(config, provisioner)?;
            stage(config, RenderStage::LaunchingEngine);
            let browser = provisioner.launch(&fresh, &settings)?;
            Ok(Engine {
                browser,
                source: fresh_source,
                retried: true,
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Only browsers we did not install ourselves are worth replacing.
fn is_retryable(source: EngineSource) -> bool {
    matches!(source, EngineSource::System | EngineSource::EnvOverride)
}

fn install<P: Provisioner>(
    config: &RenderConfig,
    provisioner: &P,
) -> Result<(PathBuf, EngineSource), Html2PdfError> {
    stage(config, RenderStage::InstallingEngine);
    let cb = config.progress_callback.clone();
    provisioner.install(&|downloaded: u64, total: Option<u64>| {
        if let Some(ref cb) = cb {
            cb.on_engine_download(downloaded, total);
        }
    })
}

fn stage(config: &RenderConfig, stage: RenderStage) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}

/// Human-readable description of the browser that would be used, without
/// launching or downloading anything.
pub fn describe_engine(config: &RenderConfig) -> String {
    let describe = |path: &Path, what: &str| format!("{what} ({})", path.display());

    if let Some(ref path) = config.chrome_path {
        return describe(path, "explicit");
    }
    match chrome_auto::find_installed_chrome() {
        Some(found) => {
            let what = match EngineSource::from(found.source) {
                EngineSource::EnvOverride => "CHROME_PATH",
                EngineSource::Cached => "cached headless shell",
                _ => "system browser",
            };
            describe(&found.path, what)
        }
        None if config.auto_install => format!(
            "none installed; headless Chrome {} will be downloaded on first render",
            chrome_auto::CHROME_VERSION
        ),
        None => "none installed".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::RenderProgressCallback;
    use chrome_auto::ChromeSource;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const CACHED_SHELL: &str = "/cache/chrome-headless-shell";

    /// Scripted provisioner: the first `failing_launches` launches fail.
    struct FakeProvisioner {
        found: Option<ResolvedChrome>,
        failing_launches: usize,
        launches: Cell<usize>,
        installs: Cell<usize>,
    }

    impl FakeProvisioner {
        fn new(found: Option<(&str, ChromeSource)>, failing_launches: usize) -> Self {
            Self {
                found: found.map(|(path, source)| ResolvedChrome {
                    path: PathBuf::from(path),
                    source,
                }),
                failing_launches,
                launches: Cell::new(0),
                installs: Cell::new(0),
            }
        }
    }

    impl Provisioner for FakeProvisioner {
        type Browser = PathBuf;

        fn find(&self) -> Option<ResolvedChrome> {
            self.found.clone()
        }

        fn install(
            &self,
            on_progress: &dyn Fn(u64, Option<u64>),
        ) -> Result<(PathBuf, EngineSource), Html2PdfError> {
            self.installs.set(self.installs.get() + 1);
            on_progress(512, Some(1024));
            on_progress(1024, Some(1024));
            Ok((PathBuf::from(CACHED_SHELL), EngineSource::Downloaded))
        }

        fn launch(&self, path: &Path, _: &LaunchSettings) -> Result<PathBuf, ChromeAutoError> {
            let n = self.launches.get();
            self.launches.set(n + 1);
            if n < self.failing_launches {
                Err(ChromeAutoError::Launch {
                    path: path.to_path_buf(),
                    reason: "exited before DevTools was ready".into(),
                })
            } else {
                Ok(path.to_path_buf())
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        retries: AtomicUsize,
        downloads: AtomicUsize,
    }

    impl RenderProgressCallback for Recorder {
        fn on_engine_retry(&self, _reason: &str) {
            self.retries.fetch_add(1, Ordering::SeqCst);
        }

        fn on_engine_download(&self, _downloaded: u64, _total: Option<u64>) {
            self.downloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn config_with(recorder: &Arc<Recorder>, auto_install: bool) -> RenderConfig {
        RenderConfig::builder()
            .auto_install(auto_install)
            .progress_callback(recorder.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn failed_system_browser_is_replaced_once() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(Some(("/usr/bin/chromium", ChromeSource::System)), 1);

        let engine = start_engine_with(&config_with(&recorder, true), &fake).unwrap();

        assert_eq!(engine.browser, PathBuf::from(CACHED_SHELL));
        assert_eq!(engine.source, EngineSource::Downloaded);
        assert!(engine.retried);
        assert_eq!(fake.launches.get(), 2);
        assert_eq!(fake.installs.get(), 1);
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 1);
        assert_eq!(recorder.downloads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn retry_runs_at_most_once() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(Some(("/opt/chrome/chrome", ChromeSource::EnvOverride)), 5);

        let err = start_engine_with(&config_with(&recorder, true), &fake)
            .err()
            .expect("second launch fails too");

        match err {
            Html2PdfError::EngineLaunchFailed { path, .. } => {
                assert_eq!(path, PathBuf::from(CACHED_SHELL))
            }
            other => panic!("unexpected: {other}"),
        }
        assert_eq!(fake.launches.get(), 2);
        assert_eq!(fake.installs.get(), 1);
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_retry_without_auto_install() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(Some(("/usr/bin/chromium", ChromeSource::System)), 1);

        let err = start_engine_with(&config_with(&recorder, false), &fake)
            .err()
            .expect("launch failure surfaces");

        assert!(matches!(err, Html2PdfError::EngineLaunchFailed { .. }));
        assert_eq!(fake.launches.get(), 1);
        assert_eq!(fake.installs.get(), 0);
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cached_browser_failure_is_not_retried() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(Some((CACHED_SHELL, ChromeSource::Cached)), 1);

        assert!(start_engine_with(&config_with(&recorder, true), &fake).is_err());
        assert_eq!(fake.launches.get(), 1);
        assert_eq!(fake.installs.get(), 0);
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_browser_is_installed_then_launched() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(None, 0);

        let engine = start_engine_with(&config_with(&recorder, true), &fake).unwrap();

        assert_eq!(engine.source, EngineSource::Downloaded);
        assert!(!engine.retried);
        assert_eq!(fake.installs.get(), 1);
        assert_eq!(fake.launches.get(), 1);
        assert_eq!(recorder.retries.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_browser_without_auto_install_is_unavailable() {
        let recorder = Arc::new(Recorder::default());
        let fake = FakeProvisioner::new(None, 0);

        let err = start_engine_with(&config_with(&recorder, false), &fake)
            .err()
            .expect("no browser, no install");

        assert!(matches!(err, Html2PdfError::EngineUnavailable { .. }));
        assert!(err.needs_manual_fallback());
        assert_eq!(fake.installs.get(), 0);
        assert_eq!(fake.launches.get(), 0);
    }

    #[test]
    fn launch_idle_timeout_exceeds_navigation_timeout() {
        let config = RenderConfig::builder()
            .navigation_timeout_secs(90)
            .build()
            .unwrap();
        assert_eq!(launch_settings(&config).idle_timeout, Duration::from_secs(180));

        let short = RenderConfig::builder()
            .navigation_timeout_secs(5)
            .build()
            .unwrap();
        assert_eq!(launch_settings(&short).idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn sandbox_flag_is_forwarded() {
        let config = RenderConfig::builder().sandbox(false).build().unwrap();
        assert!(!launch_settings(&config).sandbox);
    }

    #[test]
    fn only_foreign_browsers_are_retried() {
        assert!(is_retryable(EngineSource::System));
        assert!(is_retryable(EngineSource::EnvOverride));
        assert!(!is_retryable(EngineSource::Cached));
        assert!(!is_retryable(EngineSource::Downloaded));
        assert!(!is_retryable(EngineSource::Explicit));
    }

    #[test]
    fn missing_explicit_browser_is_unavailable() {
        let config = RenderConfig::builder()
            .chrome_path("/definitely/not/a/browser")
            .build()
            .unwrap();
        match start_engine(&config) {
            Err(e) => assert!(e.is_engine_missing(), "got: {e}"),
            Ok(_) => panic!("expected an error"),
        }
    }

    #[test]
    fn describe_explicit_browser() {
        let config = RenderConfig::builder()
            .chrome_path("/opt/chrome/chrome")
            .build()
            .unwrap();
        assert_eq!(describe_engine(&config), "explicit (/opt/chrome/chrome)");
    }
}
