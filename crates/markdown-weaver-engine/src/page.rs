use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{EngineError, Result};

/// Everything after this marker is left out of the conversion.
pub const BREAK_MARKER: &str = "<!-- break -->";

const BOM: char = '\u{feff}';

/// Host-facing markup gathered from the renderers of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMeta {
    pub extra_html: String,
}

/// Cached conversion of one source file.
#[derive(Debug, Clone)]
pub struct Page {
    path: PathBuf,
    source: String,
    output: String,
    parsers: Vec<String>,
    converted_time: SystemTime,
    pub meta: PageMeta,
}

impl Page {
    pub(crate) fn new(
        path: PathBuf,
        source: String,
        output: String,
        parsers: Vec<String>,
        meta: PageMeta,
    ) -> Self {
        Self {
            path,
            source,
            output,
            parsers,
            converted_time: SystemTime::now(),
            meta,
        }
    }

    /// Get the source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the source text the output was converted from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Get the converted output
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Get the names of the parsers the source went through, in order
    pub fn parsers(&self) -> &[String] {
        &self.parsers
    }

    /// Get the time of the last actual conversion
    pub fn converted_time(&self) -> SystemTime {
        self.converted_time
    }

    pub(crate) fn set_output(&mut self, output: String, meta: PageMeta) {
        self.output = output;
        self.meta = meta;
        self.converted_time = SystemTime::now();
    }
}

/// Read a source file for conversion: drop a leading BOM and everything
/// from the first break marker on.
pub fn read_source(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(EngineError::PageNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    Ok(prepare_source(&text).to_string())
}

fn prepare_source(text: &str) -> &str {
    let text = text.strip_prefix(BOM).unwrap_or(text);
    match text.find(BREAK_MARKER) {
        Some(index) => &text[..index],
        None => text,
    }
}
