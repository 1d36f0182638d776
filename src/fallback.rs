//! Manual print-to-PDF instructions, shown when automatic rendering fails.
//!
//! Every desktop browser can already do what this crate does. When the
//! headless engine cannot be installed or the render fails, the most useful
//! thing left is to tell the user exactly how to do it by hand.

use std::fmt;
use std::path::Path;

/// Step-by-step instructions for printing `input` to `output_name` from a
/// regular browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualFallback {
    input: String,
    output_name: String,
}

impl ManualFallback {
    /// `input` is shown as given (path or URL); only the file name of
    /// `output` is shown, since the browser's save dialog picks the folder.
    pub fn new(input: impl Into<String>, output: &Path) -> Self {
        let output_name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| output.display().to_string());
        Self {
            input: input.into(),
            output_name,
        }
    }

    /// The numbered steps, without numbering.
    pub fn steps(&self) -> Vec<String> {
        vec![
            format!("Open {} in your browser", self.input),
            "Press Ctrl+P (or Cmd+P on Mac)".to_string(),
            "Select 'Save as PDF' as the destination".to_string(),
            "Enable 'Background graphics' under More settings".to_string(),
            format!("Save as '{}'", self.output_name),
        ]
    }
}

impl fmt::Display for ManualFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Alternative: open {} in a browser and use 'Print to PDF'",
            self.input
        )?;
        for (i, step) in self.steps().iter().enumerate() {
            writeln!(f, "   {}. {}", i + 1, step)?;
        }
        Ok(())
    }
}
