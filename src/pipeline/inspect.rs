//! Static HTML inspection: facts about a document that predict how it
//! will print, read straight from the markup without starting a browser.
//!
//! Pattern matching only; no DOM is built.

use crate::error::Html2PdfError;
use crate::output::DocumentInfo;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static RE_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").unwrap());

static RE_LANG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<html\b[^>]*?\blang\s*=\s*["']?([A-Za-z0-9-]+)"#).unwrap()
});

static RE_LINK_STYLESHEET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<link\b[^>]*\brel\s*=\s*["']?stylesheet\b"#).unwrap()
});

static RE_STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<style\b").unwrap());

static RE_IMG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<img\b").unwrap());

static RE_PRINT_STYLES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)@media\s+(?:only\s+)?print\b|\bmedia\s*=\s*["']?print\b"#).unwrap()
});

static RE_PAGE_RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)@page\b").unwrap());

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static RE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

/// Inspect HTML source text.
pub fn inspect_html(html: &str) -> DocumentInfo {
    let html = RE_COMMENT.replace_all(html, "");

    let title = RE_TITLE
        .captures(&html)
        .map(|c| RE_WHITESPACE.replace_all(c[1].trim(), " ").into_owned())
        .filter(|t| !t.is_empty());

    let lang = RE_LANG.captures(&html).map(|c| c[1].to_string());

    DocumentInfo {
        title,
        lang,
        byte_size: 0,
        stylesheet_count: RE_LINK_STYLESHEET.find_iter(&html).count()
            + RE_STYLE_BLOCK.find_iter(&html).count(),
        image_count: RE_IMG.find_iter(&html).count(),
        has_print_styles: RE_PRINT_STYLES.is_match(&html),
        has_page_rule: RE_PAGE_RULE.is_match(&html),
    }
}

/// Inspect an HTML file on disk. Non-UTF-8 bytes are replaced, not rejected.
pub async fn inspect_file(path: &Path) -> Result<DocumentInfo, Html2PdfError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Html2PdfError::FileNotFound {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Html2PdfError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => Html2PdfError::Internal(format!("read {}: {e}", path.display())),
    })?;

    let mut info = inspect_html(&String::from_utf8_lossy(&bytes));
    info.byte_size = bytes.len() as u64;
    Ok(info)
}
