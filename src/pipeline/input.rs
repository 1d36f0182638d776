//! Input resolution: normalise a user-supplied path or URL to something the
//! browser can navigate to.
//!
//! Local files become absolute `file://` URLs so that relative stylesheet
//! and image references inside the HTML resolve against the file's own
//! directory, whatever the process working directory is. We sniff the file
//! before launching a browser so that a typo costs milliseconds, not a
//! browser start-up.

use crate::error::Html2PdfError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// The resolved input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedInput {
    /// A local HTML file, canonicalised.
    Local { path: PathBuf, url: Url },
    /// An HTTP(S) URL the browser fetches itself.
    Remote { url: Url },
}

impl ResolvedInput {
    /// The URL handed to the browser.
    pub fn url(&self) -> &Url {
        match self {
            ResolvedInput::Local { url, .. } => url,
            ResolvedInput::Remote { url } => url,
        }
    }

    /// The local file, when there is one.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            ResolvedInput::Local { path, .. } => Some(path),
            ResolvedInput::Remote { .. } => None,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a navigable document.
pub fn resolve_input(input: &str) -> Result<ResolvedInput, Html2PdfError> {
    if is_url(input) {
        let url = Url::parse(input).map_err(|e| Html2PdfError::InvalidInput {
            input: input.to_string(),
            reason: e.to_string(),
        })?;
        debug!("Resolved remote document: {}", url);
        Ok(ResolvedInput::Remote { url })
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and that it looks like HTML.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, Html2PdfError> {
    if path_str.trim().is_empty() {
        return Err(Html2PdfError::InvalidInput {
            input: path_str.to_string(),
            reason: "empty path".into(),
        });
    }

    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(Html2PdfError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(Html2PdfError::InvalidInput {
            input: path_str.to_string(),
            reason: "is a directory".into(),
        });
    }

    let mut head = [0u8; 512];
    let read = match std::fs::File::open(&path) {
        Ok(mut f) => f.read(&mut head).map_err(|e| read_error(&path, e))?,
        Err(e) => return Err(read_error(&path, e)),
    };

    if !has_html_extension(&path) && !looks_like_markup(&head[..read]) {
        return Err(Html2PdfError::NotHtml { path });
    }

    let canonical = path
        .canonicalize()
        .map_err(|e| Html2PdfError::Internal(format!("canonicalize {}: {e}", path.display())))?;
    let url = Url::from_file_path(&canonical).map_err(|_| Html2PdfError::InvalidInput {
        input: path_str.to_string(),
        reason: "cannot be expressed as a file:// URL".into(),
    })?;

    debug!("Resolved local document: {}", canonical.display());
    Ok(ResolvedInput::Local {
        path: canonical,
        url,
    })
}

fn read_error(path: &Path, e: std::io::Error) -> Html2PdfError {
    match e.kind() {
        std::io::ErrorKind::NotFound => Html2PdfError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Html2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Html2PdfError::Internal(format!("read {}: {e}", path.display())),
    }
}

fn has_html_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "html" | "htm" | "xhtml"))
        .unwrap_or(false)
}

/// First non-whitespace byte (after an optional UTF-8 BOM) is `<`.
fn looks_like_markup(head: &[u8]) -> bool {
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    head.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'<')
}

/// Where the PDF goes when the caller names no output.
///
/// Local inputs get a sibling file with the same stem; remote inputs use
/// the last URL path segment's stem in the current directory, falling back
/// to `document.pdf`. A local input that already ends in `.pdf` gets
/// `<stem>.rendered.pdf` so the source is never overwritten.
pub fn default_output_path(input: &ResolvedInput) -> PathBuf {
    match input {
        ResolvedInput::Local { path, .. } => {
            let is_pdf = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
            if is_pdf {
                path.with_extension("rendered.pdf")
            } else {
                path.with_extension("pdf")
            }
        }
        ResolvedInput::Remote { url } => {
            let stem = url
                .path_segments()
                .and_then(|mut s| s.next_back())
                .and_then(|last| Path::new(last).file_stem().and_then(|s| s.to_str()))
                .filter(|s| !s.is_empty())
                .unwrap_or("document");
            PathBuf::from(format!("{stem}.pdf"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/cv.html"));
        assert!(is_url("http://example.com/cv.html"));
        assert!(!is_url("/tmp/resume.html"));
        assert!(!is_url("resume.html"));
        assert!(!is_url(""));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = resolve_input("/definitely/not/here/resume.html").unwrap_err();
        assert!(matches!(err, Html2PdfError::FileNotFound { .. }));
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(
            resolve_input("  ").unwrap_err(),
            Html2PdfError::InvalidInput { .. }
        ));
    }

    #[test]
    fn directory_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_input(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Html2PdfError::InvalidInput { .. }));
    }

    #[test]
    fn local_html_becomes_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.html");
        std::fs::write(&path, "<!doctype html><title>CV</title>").unwrap();

        let resolved = resolve_input(path.to_str().unwrap()).unwrap();
        assert_eq!(resolved.url().scheme(), "file");
        assert!(resolved.url().path().ends_with("/resume.html"));
        assert!(resolved.local_path().unwrap().is_absolute());
    }

    #[test]
    fn markup_without_extension_is_accepted() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\xEF\xBB\xBF\n  <html><body>hi</body></html>")
            .unwrap();
        assert!(resolve_input(tmp.path().to_str().unwrap()).is_ok());
    }

    #[test]
    fn non_markup_without_extension_is_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.7 not html").unwrap();
        let err = resolve_input(tmp.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Html2PdfError::NotHtml { .. }));
    }

    #[test]
    fn default_output_for_local_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.html");
        std::fs::write(&path, "<html></html>").unwrap();

        let resolved = resolve_input(path.to_str().unwrap()).unwrap();
        let out = default_output_path(&resolved);
        assert_eq!(out.file_name().unwrap(), "resume.pdf");
        assert_eq!(out.parent(), resolved.local_path().unwrap().parent());
    }

    #[test]
    fn default_output_for_remote_input() {
        let with_name = resolve_input("https://example.com/people/jane-cv.html").unwrap();
        assert_eq!(default_output_path(&with_name), PathBuf::from("jane-cv.pdf"));

        let bare = resolve_input("https://example.com/").unwrap();
        assert_eq!(default_output_path(&bare), PathBuf::from("document.pdf"));
    }

    #[test]
    fn default_output_never_overwrites_a_pdf_named_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.pdf");
        std::fs::write(&path, "<html><body>Jane</body></html>").unwrap();

        let resolved = resolve_input(path.to_str().unwrap()).unwrap();
        let out = default_output_path(&resolved);
        assert_ne!(out, resolved.local_path().unwrap());
        assert_eq!(out.file_name().unwrap(), "cv.rendered.pdf");

        let upper = dir.path().join("Resume.PDF");
        std::fs::write(&upper, "<html></html>").unwrap();
        let resolved = resolve_input(upper.to_str().unwrap()).unwrap();
        assert_eq!(
            default_output_path(&resolved).file_name().unwrap(),
            "Resume.rendered.pdf"
        );
    }

    #[test]
    fn read_errors_keep_their_kind() {
        let path = Path::new("/srv/cv.html");
        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            read_error(path, denied),
            Html2PdfError::PermissionDenied { .. }
        ));

        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(matches!(
            read_error(path, missing),
            Html2PdfError::FileNotFound { .. }
        ));

        let other = std::io::Error::new(std::io::ErrorKind::Other, "I/O error");
        match read_error(path, other) {
            Html2PdfError::Internal(msg) => assert!(msg.contains("/srv/cv.html")),
            e => panic!("unexpected: {e}"),
        }
    }
}
