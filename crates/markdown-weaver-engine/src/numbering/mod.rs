//! Hierarchical numbering of headers, figures, tables and code blocks.

mod counter;
mod label;
mod mode;

pub use counter::{Counters, LEVELS, format_number};
pub use label::{
    DEFAULT_LABEL_PATTERN, Label, LabelMap, SharedLabels, split_label, split_label_with,
};
pub use mode::NumberingMode;

use serde::Serialize;

pub const HEADER: &str = "header";

/// Kinds numbered when nothing else is configured.
pub const DEFAULT_KINDS: [&str; 4] = [HEADER, "figure", "table", "code"];

/// Maps header markers to content kinds.
///
/// A bare `#` marks a header; any other marker selects the kind sharing its
/// first three letters, ignoring case (`#Fig`, `#FIGURE.` and `#fig` all
/// mark figures).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable {
    kinds: Vec<String>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self::new(DEFAULT_KINDS)
    }
}

impl KindTable {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn classify(&self, marker: &str) -> Option<&str> {
        if marker.is_empty() {
            return self
                .kinds
                .iter()
                .find(|kind| *kind == HEADER)
                .map(String::as_str);
        }
        let abbreviation = abbreviate(marker);
        self.kinds
            .iter()
            .filter(|kind| *kind != HEADER)
            .find(|kind| abbreviate(kind) == abbreviation)
            .map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(String::as_str)
    }
}

/// Display prefix of a kind when none is configured: `figure` → `Figure `.
pub fn kind_prefix(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => format!("{}{} ", first.to_uppercase(), chars.as_str()),
        None => String::new(),
    }
}

fn abbreviate(text: &str) -> String {
    text.chars().take(3).collect::<String>().to_lowercase()
}

/// One numbered block, ready for templating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub kind: String,
    pub title: String,
    pub label: String,
    pub id: Option<String>,
    pub number_list: Vec<u32>,
    /// Markdown heading marker for headers, display prefix otherwise.
    pub prefix: String,
    pub class: String,
    /// Rendered content of non-header blocks.
    pub content: Option<String>,
}

impl Record {
    pub fn is_header(&self) -> bool {
        self.kind == HEADER
    }

    pub fn number(&self) -> String {
        format_number(&self.number_list)
    }
}
