//! Pipeline stages for HTML-to-PDF rendering.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the browser-dependent parts stay isolated.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ engine ──▶ render ──▶ (convert writes the file)
//! (path/URL) (chrome)  (print)
//! ```
//!
//! 1. [`input`]   — canonicalise the user-supplied path or URL; sniff HTML
//! 2. [`engine`]  — find, install, or retry the headless browser
//! 3. [`render`]  — load, settle and print; runs in `spawn_blocking`
//!    because `headless_chrome` is synchronous
//! 4. [`inspect`] — browser-free static facts about the HTML

pub mod engine;
pub mod input;
pub mod inspect;
pub mod render;
