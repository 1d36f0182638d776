//! # chrome-auto
//!
//! Locate an installed Chromium-family browser, or auto-download and cache a
//! pinned [Chrome for Testing](https://googlechromelabs.github.io/chrome-for-testing/)
//! `chrome-headless-shell` build, so that users of `headless_chrome` do not
//! have to install a browser before the first render.
//!
//! ## How it works
//!
//! [`find_installed_chrome`] never touches the network:
//!
//! 1. `CHROME_PATH`, when set and pointing at an existing file, wins.
//! 2. Otherwise a system Chrome / Chromium / Edge is looked up the way
//!    `headless_chrome` itself does it.
//! 3. Otherwise `~/.cache/resume2pdf/chrome-headless-shell-{VERSION}/` is
//!    checked for a previous download.
//!
//! [`download_chrome`] fetches the platform `.zip`, extracts it into a
//! staging directory and renames that into the cache. Callers use it when
//! nothing is installed, or to replace an installed browser that refused
//! to launch.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrome_auto::{download_chrome, find_installed_chrome, launch_chrome, LaunchSettings};
//!
//! let path = match find_installed_chrome() {
//!     Some(found) => found.path,
//!     None => download_chrome(Some(&|downloaded: u64, total: Option<u64>| {
//!         if let Some(t) = total {
//!             eprint!("\rDownloading Chrome: {}/{} bytes", downloaded, t);
//!         }
//!     }))
//!     .expect("download failed"),
//! };
//! let browser = launch_chrome(&path, &LaunchSettings::default()).expect("launch failed");
//! ```
//!
//! ## Platform support
//!
//! | OS      | Arch    | Archive                               |
//! |---------|---------|---------------------------------------|
//! | macOS   | arm64   | `chrome-headless-shell-mac-arm64.zip` |
//! | macOS   | x86_64  | `chrome-headless-shell-mac-x64.zip`   |
//! | Linux   | x86_64  | `chrome-headless-shell-linux64.zip`   |
//! | Windows | x86_64  | `chrome-headless-shell-win64.zip`     |
//! | Windows | x86     | `chrome-headless-shell-win32.zip`     |
//!
//! Linux on arm64 has no Chrome for Testing build; install `chromium` from
//! the distribution and it is picked up in step 2.
//!
//! ## Environment variable overrides
//!
//! - `CHROME_PATH` — path to an existing browser executable; skips download.
//! - `CHROME_AUTO_CACHE_DIR` — override the default cache directory.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Public constants ─────────────────────────────────────────────────────────

/// The Chrome for Testing version used for downloads.
pub const CHROME_VERSION: &str = "131.0.6778.85";

/// Chrome for Testing download bucket.
const BASE_URL: &str = "https://storage.googleapis.com/chrome-for-testing-public";

// ── Error type ───────────────────────────────────────────────────────────────

/// Errors returned by chrome-auto operations.
#[derive(Error, Debug)]
pub enum ChromeAutoError {
    /// The current OS/architecture combination has no downloadable build.
    #[error("Unsupported platform for automatic download: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// Could not create or navigate the local cache directory.
    #[error("Cache directory error: {0}")]
    CacheDir(#[source] std::io::Error),

    /// Network download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// zip extraction failed.
    #[error("Archive extraction failed: {0}")]
    Extract(String),

    /// `headless_chrome` could not start the browser process.
    #[error("Failed to launch browser '{path}': {reason}")]
    Launch { path: PathBuf, reason: String },
}

// ── Resolution result ────────────────────────────────────────────────────────

/// Where a browser executable was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromeSource {
    /// `CHROME_PATH` environment variable.
    EnvOverride,
    /// A browser installed on the system.
    System,
    /// A previous download in the cache directory.
    Cached,
}

/// A browser executable together with how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChrome {
    pub path: PathBuf,
    pub source: ChromeSource,
}

// ── Internal: platform metadata ──────────────────────────────────────────────

struct PlatformInfo {
    /// Chrome for Testing platform key, e.g. `linux64`.
    platform: &'static str,
    /// Executable path relative to the extracted archive root.
    exe_path_in_archive: &'static str,
}

fn detect_platform() -> Result<PlatformInfo, ChromeAutoError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match (os, arch) {
        ("macos", "aarch64") => Ok(PlatformInfo {
            platform: "mac-arm64",
            exe_path_in_archive: "chrome-headless-shell-mac-arm64/chrome-headless-shell",
        }),
        ("macos", "x86_64") => Ok(PlatformInfo {
            platform: "mac-x64",
            exe_path_in_archive: "chrome-headless-shell-mac-x64/chrome-headless-shell",
        }),
        ("linux", "x86_64") => Ok(PlatformInfo {
            platform: "linux64",
            exe_path_in_archive: "chrome-headless-shell-linux64/chrome-headless-shell",
        }),
        ("windows", "x86_64") => Ok(PlatformInfo {
            platform: "win64",
            exe_path_in_archive: "chrome-headless-shell-win64/chrome-headless-shell.exe",
        }),
        ("windows", "x86") => Ok(PlatformInfo {
            platform: "win32",
            exe_path_in_archive: "chrome-headless-shell-win32/chrome-headless-shell.exe",
        }),
        (os, arch) => Err(ChromeAutoError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        }),
    }
}

fn download_url(info: &PlatformInfo) -> String {
    format!(
        "{BASE_URL}/{CHROME_VERSION}/{p}/chrome-headless-shell-{p}.zip",
        p = info.platform
    )
}

// ── Cache directory resolution ───────────────────────────────────────────────

/// Returns the per-version cache directory for the downloaded browser.
///
/// Default locations:
/// - **macOS**: `~/Library/Caches/resume2pdf/chrome-headless-shell-{VERSION}/`
/// - **Linux**: `~/.cache/resume2pdf/chrome-headless-shell-{VERSION}/`
/// - **Windows**: `%LOCALAPPDATA%\resume2pdf\chrome-headless-shell-{VERSION}\`
///
/// Override by setting `CHROME_AUTO_CACHE_DIR`.
pub fn chrome_cache_dir() -> PathBuf {
    let leaf = format!("chrome-headless-shell-{CHROME_VERSION}");
    if let Ok(override_dir) = std::env::var("CHROME_AUTO_CACHE_DIR") {
        return PathBuf::from(override_dir).join(leaf);
    }

    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir);

    base.join("resume2pdf").join(leaf)
}

// ── Public API ───────────────────────────────────────────────────────────────

/// Returns the on-disk path to a previously downloaded browser, if any.
pub fn cached_chrome_path() -> Option<PathBuf> {
    let info = detect_platform().ok()?;
    let exe = chrome_cache_dir().join(info.exe_path_in_archive);
    exe.exists().then_some(exe)
}

/// Finds a usable browser without touching the network.
pub fn find_installed_chrome() -> Option<ResolvedChrome> {
    if let Ok(p) = std::env::var("CHROME_PATH") {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(ResolvedChrome {
                path,
                source: ChromeSource::EnvOverride,
            });
        }
        warn!(
            "CHROME_PATH '{}' does not exist; looking elsewhere",
            path.display()
        );
    }

    if let Ok(path) = headless_chrome::browser::default_executable() {
        return Some(ResolvedChrome {
            path,
            source: ChromeSource::System,
        });
    }

    cached_chrome_path().map(|path| ResolvedChrome {
        path,
        source: ChromeSource::Cached,
    })
}

/// Downloads the pinned headless shell into the cache, returning the
/// executable path. A complete cached copy is reused as-is.
pub fn download_chrome(
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<PathBuf, ChromeAutoError> {
    let info = detect_platform()?;
    let cache_dir = chrome_cache_dir();
    let exe = cache_dir.join(info.exe_path_in_archive);

    if exe.exists() {
        debug!("Using cached browser at {}", exe.display());
        return Ok(exe);
    }

    let url = download_url(&info);
    info!("Downloading headless Chrome {} from {}", CHROME_VERSION, url);

    let parent = cache_dir
        .parent()
        .ok_or_else(|| ChromeAutoError::Extract("cache dir has no parent".into()))?;
    std::fs::create_dir_all(parent).map_err(ChromeAutoError::CacheDir)?;

    let archive_bytes = download_bytes(&url, on_progress)?;

    let staging = parent.join(format!(
        "chrome-headless-shell-{CHROME_VERSION}.partial-{}",
        std::process::id()
    ));
    let exe = install_archive(&archive_bytes, &staging, &cache_dir, info.exe_path_in_archive)?;

    info!("Headless Chrome installed at {}", exe.display());
    Ok(exe)
}

/// Unpacks `archive_bytes` into `staging`, then renames it to `cache_dir`.
/// `staging` never outlives the call, whether it succeeds or not.
fn install_archive(
    archive_bytes: &[u8],
    staging: &Path,
    cache_dir: &Path,
    exe_in_archive: &str,
) -> Result<PathBuf, ChromeAutoError> {
    if staging.exists() {
        std::fs::remove_dir_all(staging).map_err(ChromeAutoError::CacheDir)?;
    }
    if let Err(e) = stage_archive(archive_bytes, staging, exe_in_archive) {
        let _ = std::fs::remove_dir_all(staging);
        return Err(e);
    }

    let exe = cache_dir.join(exe_in_archive);
    // Another process may have finished first; keep its copy.
    if let Err(e) = std::fs::rename(staging, cache_dir) {
        let _ = std::fs::remove_dir_all(staging);
        if !exe.exists() {
            return Err(ChromeAutoError::CacheDir(e));
        }
    }
    Ok(exe)
}

fn stage_archive(
    archive_bytes: &[u8],
    staging: &Path,
    exe_in_archive: &str,
) -> Result<(), ChromeAutoError> {
    extract_archive(archive_bytes, staging)?;

    let staged_exe = staging.join(exe_in_archive);
    if !staged_exe.exists() {
        return Err(ChromeAutoError::Extract(format!(
            "'{exe_in_archive}' not found in archive"
        )));
    }
    mark_executable(&staged_exe)
}

/// Options for [`launch_chrome`].
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    /// Run with the Chromium sandbox. Containers running as root need `false`.
    pub sandbox: bool,
    /// Kill the browser after this long without DevTools traffic.
    pub idle_timeout: Duration,
}

impl Default for LaunchSettings {
    fn default() -> Self {
        Self {
            sandbox: true,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

/// Launches a headless browser from an explicit executable `path`.
pub fn launch_chrome(path: &Path, settings: &LaunchSettings) -> Result<Browser, ChromeAutoError> {
    let launch_err = |reason: String| ChromeAutoError::Launch {
        path: path.to_path_buf(),
        reason,
    };

    let options = LaunchOptions::default_builder()
        .path(Some(path.to_path_buf()))
        .headless(true)
        .sandbox(settings.sandbox)
        .idle_browser_timeout(settings.idle_timeout)
        .build()
        .map_err(|e| launch_err(e.to_string()))?;

    debug!(path = %path.display(), sandbox = settings.sandbox, "launching browser");
    Browser::new(options).map_err(|e| launch_err(e.to_string()))
}

// ── Internal helpers ─────────────────────────────────────────────────────────

/// Largest up-front allocation for a download, whatever Content-Length says.
const MAX_PREALLOC: u64 = 256 * 1024 * 1024;

/// In-memory download sink that reports the running byte count.
struct ProgressSink<'a> {
    buf: Vec<u8>,
    total: Option<u64>,
    on_progress: Option<&'a dyn Fn(u64, Option<u64>)>,
}

impl<'a> ProgressSink<'a> {
    fn new(total: Option<u64>, on_progress: Option<&'a dyn Fn(u64, Option<u64>)>) -> Self {
        let capacity = total.unwrap_or(0).min(MAX_PREALLOC) as usize;
        Self {
            buf: Vec::with_capacity(capacity),
            total,
            on_progress,
        }
    }
}

impl Write for ProgressSink<'_> {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        if let Some(cb) = self.on_progress {
            cb(self.buf.len() as u64, self.total);
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn download_bytes(
    url: &str,
    on_progress: Option<&dyn Fn(u64, Option<u64>)>,
) -> Result<Vec<u8>, ChromeAutoError> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("chrome-auto/", env!("CARGO_PKG_VERSION")))
        .timeout(None)
        .build()
        .map_err(|e| ChromeAutoError::Download(e.to_string()))?;

    let mut response = client
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| ChromeAutoError::Download(format!("GET {url}: {e}")))?;

    let mut sink = ProgressSink::new(response.content_length(), on_progress);
    std::io::copy(&mut response, &mut sink)
        .map_err(|e| ChromeAutoError::Download(format!("reading {url}: {e}")))?;
    Ok(sink.buf)
}

/// Extracts a whole zip archive into `dest`.
fn extract_archive(archive_bytes: &[u8], dest: &Path) -> Result<(), ChromeAutoError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(archive_bytes))
        .map_err(|e| ChromeAutoError::Extract(e.to_string()))?;
    archive
        .extract(dest)
        .map_err(|e| ChromeAutoError::Extract(format!("Unpack failed: {e}")))
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<(), ChromeAutoError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = std::fs::metadata(path)
        .map_err(ChromeAutoError::CacheDir)?
        .permissions();
    perms.set_mode(perms.mode() | 0o755);
    std::fs::set_permissions(path, perms).map_err(ChromeAutoError::CacheDir)
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<(), ChromeAutoError> {
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn zip_with(name: &str, body: &[u8]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default().unix_permissions(0o644);
            writer.start_file(name, opts).unwrap();
            writer.write_all(body).unwrap();
            writer.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn cache_dir_is_versioned_and_overridable() {
        // One test so the env var is never observed by a parallel test.
        let d1 = chrome_cache_dir();
        assert_eq!(d1, chrome_cache_dir());
        assert!(d1.to_str().unwrap().contains(CHROME_VERSION));

        std::env::set_var("CHROME_AUTO_CACHE_DIR", "/tmp/test_resume2pdf_override");
        let d = chrome_cache_dir();
        std::env::remove_var("CHROME_AUTO_CACHE_DIR");
        assert!(d.starts_with("/tmp/test_resume2pdf_override"));
        assert!(d.ends_with(format!("chrome-headless-shell-{CHROME_VERSION}")));
    }

    #[test]
    fn download_url_targets_pinned_version() {
        let info = PlatformInfo {
            platform: "linux64",
            exe_path_in_archive: "chrome-headless-shell-linux64/chrome-headless-shell",
        };
        assert_eq!(
            download_url(&info),
            format!(
                "{BASE_URL}/{CHROME_VERSION}/linux64/chrome-headless-shell-linux64.zip"
            )
        );
    }

    #[test]
    fn supported_platforms_name_their_executable() {
        if let Ok(info) = detect_platform() {
            assert!(info.exe_path_in_archive.starts_with("chrome-headless-shell-"));
            assert!(info.exe_path_in_archive.contains(info.platform));
        }
    }

    #[test]
    fn extract_archive_unpacks_nested_files() {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buf);
            let opts = zip::write::SimpleFileOptions::default().unix_permissions(0o755);
            writer.start_file("shell/bin", opts).unwrap();
            writer.write_all(b"#!/bin/sh\n").unwrap();
            writer.finish().unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out");
        extract_archive(buf.get_ref(), &dest).unwrap();

        let extracted = std::fs::read(dest.join("shell/bin")).unwrap();
        assert_eq!(extracted, b"#!/bin/sh\n");
    }

    #[test]
    fn extract_archive_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_archive(b"definitely not a zip", dir.path()).unwrap_err();
        assert!(matches!(err, ChromeAutoError::Extract(_)));
    }

    #[test]
    fn launch_reports_missing_executable() {
        let err = launch_chrome(
            Path::new("/definitely/not/a/browser"),
            &LaunchSettings::default(),
        )
        .err().unwrap();
        match err {
            ChromeAutoError::Launch { path, .. } => {
                assert_eq!(path, PathBuf::from("/definitely/not/a/browser"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn install_archive_moves_staging_into_cache() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("shell.partial-1");
        let cache = dir.path().join("shell");
        let archive = zip_with("pkg/chrome-headless-shell", b"#!/bin/sh\n");

        let exe = install_archive(&archive, &staging, &cache, "pkg/chrome-headless-shell").unwrap();

        assert_eq!(exe, cache.join("pkg/chrome-headless-shell"));
        assert!(exe.exists());
        assert!(!staging.exists());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&exe).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn install_archive_cleans_staging_on_corrupt_zip() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("shell.partial-2");
        std::fs::create_dir_all(staging.join("leftover")).unwrap();
        let cache = dir.path().join("shell");

        let err = install_archive(b"definitely not a zip", &staging, &cache, "pkg/exe").unwrap_err();

        assert!(matches!(err, ChromeAutoError::Extract(_)));
        assert!(!staging.exists());
        assert!(!cache.exists());
    }

    #[test]
    fn install_archive_cleans_staging_when_executable_missing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("shell.partial-3");
        let cache = dir.path().join("shell");
        let archive = zip_with("pkg/README", b"no browser here");

        let err = install_archive(&archive, &staging, &cache, "pkg/chrome-headless-shell").unwrap_err();

        match err {
            ChromeAutoError::Extract(msg) => assert!(msg.contains("not found in archive")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!staging.exists());
        assert!(!cache.exists());
    }

    #[test]
    fn progress_sink_reports_running_total() {
        let seen = std::cell::RefCell::new(Vec::new());
        let record = |done: u64, total: Option<u64>| seen.borrow_mut().push((done, total));

        let mut sink = ProgressSink::new(Some(10), Some(&record));
        std::io::copy(&mut Cursor::new(b"0123456789".to_vec()), &mut sink).unwrap();

        assert_eq!(sink.buf, b"0123456789");
        assert_eq!(seen.borrow().last(), Some(&(10, Some(10))));
    }

    #[test]
    fn progress_sink_caps_preallocation() {
        let sink = ProgressSink::new(Some(u64::MAX), None);
        assert!(sink.buf.capacity() as u64 <= MAX_PREALLOC);
        assert_eq!(ProgressSink::new(None, None).buf.capacity(), 0);
    }
}
