//! Numbering of headers and captioned blocks.
//!
//! `# Title` lines are numbered per level (`1.`, `1.1.`, ...). A marker
//! naming another kind, like `#Fig Caption` or `#Table Caption`, numbers
//! the block that follows: either an explicit `#begin` ... `#end` range or
//! everything up to the next blank line.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use markdown_weaver_config::Settings;
use regex::Regex;
use toml::Value;

use crate::cell::Cell;
use crate::error::{EngineError, Result};
use crate::numbering::{
    Counters, DEFAULT_KINDS, DEFAULT_LABEL_PATTERN, HEADER, KindTable, Label, LabelMap,
    NumberingMode, Record, SharedLabels, kind_prefix, split_label_with,
};
use crate::parser::Parser;
use crate::renderer::{
    ContentRenderer, Fragments, MarkdownRenderer, RenderPattern, Renderer, render_inline,
};
use crate::splitter::{Segment, Splitter};

pub const HEADER_PATTERN: &str = r"(?m)^(?P<marker>#+)(?P<kind>\S*?) (?P<title>.+?)$";

/// Fenced ranges never contain numbered headers. Matched ranges are
/// passed through untouched.
pub const ESCAPE_PATTERN: &str = r"(?s)```.*?```|~~~.*?~~~";

const BEGIN: &str = "#begin\n";
const END: &str = "#end";

pub struct Number {
    name: String,
    settings: Settings,
    content: Box<dyn ContentRenderer>,
    counters: Counters,
    labels: SharedLabels,
    kinds: KindTable,
    mode: NumberingMode,
    label_pattern: Regex,
}

impl Default for Number {
    fn default() -> Self {
        Self::new()
    }
}

impl Number {
    pub fn new() -> Self {
        Self::with_content(Box::new(MarkdownRenderer))
    }

    pub fn with_content(content: Box<dyn ContentRenderer>) -> Self {
        let mut settings = Settings::new();
        settings.set(
            "kinds",
            Value::from(DEFAULT_KINDS.iter().map(|k| k.to_string()).collect::<Vec<_>>()),
        );
        settings.set("label_pattern", DEFAULT_LABEL_PATTERN);
        settings.set("class", "weaver-number-{kind}");
        settings.set("id", "weaver-number-{label}");
        settings.set("markdown_extensions", Value::Array(Vec::new()));
        settings.set("kind_prefix", Value::Table(toml::Table::new()));

        Self {
            name: "number".to_string(),
            settings,
            content,
            counters: Counters::new(),
            labels: Rc::new(RefCell::new(LabelMap::new())),
            kinds: KindTable::default(),
            mode: NumberingMode::default(),
            label_pattern: Regex::new(DEFAULT_LABEL_PATTERN).expect("static pattern"),
        }
    }

    /// Rename this instance, e.g. to register a second numbering scheme.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_mode(mut self, mode: NumberingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> &NumberingMode {
        &self.mode
    }

    /// Handle on the labels defined by the current document.
    pub fn labels(&self) -> SharedLabels {
        Rc::clone(&self.labels)
    }

    fn extensions(&self) -> Vec<String> {
        let mut extensions = vec!["tables".to_string()];
        extensions.extend(self.settings.get_strings("markdown_extensions"));
        extensions
    }

    fn template(&self, key: &str, placeholder: &str, value: &str) -> String {
        self.settings
            .get_str(key)
            .unwrap_or_default()
            .replace(placeholder, value)
    }

    fn prefix(&self, kind: &str) -> String {
        if let Some(prefix) = self
            .settings
            .get_table("kind_prefix")
            .and_then(|table| table.get(kind))
            .and_then(Value::as_str)
        {
            return prefix.to_string();
        }
        kind_prefix(kind)
    }

    /// Count a matched marker and build its record. `None` when the marker
    /// does not name a known kind.
    fn record(&mut self, marker: &str, kind: &str, title: &str) -> Option<Record> {
        let kind = self.kinds.classify(kind)?.to_string();
        let depth = marker.len() - 1;
        let local = self.counters.step(&kind, depth);
        let number_list = self.mode.normalize(&kind, &local);
        let (title, label) = split_label_with(&self.label_pattern, title);

        let prefix = if kind == HEADER {
            marker.to_string()
        } else {
            self.prefix(&kind)
        };

        let id = if label.is_empty() {
            None
        } else {
            let id = self.template("id", "{label}", &label);
            self.labels.borrow_mut().insert(
                &label,
                Label {
                    kind: kind.clone(),
                    number_list: number_list.clone(),
                    id: id.clone(),
                },
            );
            Some(id)
        };

        Some(Record {
            class: self.template("class", "{kind}", &kind),
            kind,
            title,
            label,
            id,
            number_list,
            prefix,
            content: None,
        })
    }

    fn invalid(&self, key: &str, reason: &str) -> EngineError {
        EngineError::InvalidSetting {
            renderer: self.name.clone(),
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }

    fn start_level(&self) -> Result<Option<usize>> {
        let Some(value) = self.settings.get("start_level") else {
            return Ok(None);
        };
        value
            .as_integer()
            .filter(|level| *level >= 1)
            .map(|level| Some(level as usize))
            .ok_or_else(|| self.invalid("start_level", "expected an integer of at least 1"))
    }

    fn parent(&self) -> Result<Option<Vec<u32>>> {
        let Some(value) = self.settings.get("parent") else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.invalid("parent", "expected an array of integers"))?;
        items
            .iter()
            .map(|item| {
                item.as_integer()
                    .and_then(|n| u32::try_from(n).ok())
                    .ok_or_else(|| self.invalid("parent", "expected non-negative integers"))
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn render_header<'s>(
        &mut self,
        cell: &Cell<'_, 's>,
        splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments> {
        let marker = cell.context.get("marker").unwrap_or_default();
        let kind = cell.context.get("kind").unwrap_or_default();
        let title = cell.context.get("title").unwrap_or_default();

        let Some(mut record) = self.record(marker, kind, title) else {
            return Ok(vec![cell.source.to_string()]);
        };

        if record.is_header() {
            return Ok(vec![header_line(&record)]);
        }

        let extensions = self.extensions();
        let (content, rest) = match splitter.next_text() {
            Some(text) => split_extent(text),
            None => (Cow::Borrowed(""), None),
        };
        record.content = Some(self.content.render(&content, &extensions)?);
        record.title = render_inline(self.content.as_ref(), &record.title, &extensions)?;

        let mut fragments = vec![block_html(&record)];
        match rest {
            Some(rest) => {
                fragments.push("\n\n".to_string());
                splitter.push_back(Segment::Text(rest));
            }
            None => fragments.push("\n".to_string()),
        }
        Ok(fragments)
    }
}

impl Renderer for Number {
    fn type_name(&self) -> &'static str {
        "number"
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn patterns(&self) -> Vec<RenderPattern> {
        vec![
            RenderPattern::new("render_header", HEADER_PATTERN),
            RenderPattern::new("render_escape", ESCAPE_PATTERN),
        ]
    }

    fn render<'s>(
        &mut self,
        function: &str,
        cell: &Cell<'_, 's>,
        splitter: &mut Splitter<'_, 's>,
    ) -> Result<Fragments> {
        match function {
            "render_header" => self.render_header(cell, splitter),
            "render_escape" => Ok(vec![cell.source.to_string()]),
            _ => Ok(vec![cell.source.to_string()]),
        }
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    fn configure(&mut self, update: &toml::Table) -> Result<()> {
        self.settings.merge(update);

        let pattern = self
            .settings
            .get_str("label_pattern")
            .unwrap_or(DEFAULT_LABEL_PATTERN);
        self.label_pattern = Regex::new(pattern).map_err(|source| EngineError::Pattern {
            namespace: self.name.clone(),
            source,
        })?;

        let kinds = self.settings.get_strings("kinds");
        if !kinds.is_empty() {
            self.kinds = KindTable::new(kinds);
        }

        let start_level = self.start_level()?;
        let parent = self.parent()?;
        if start_level.is_some() || parent.is_some() {
            self.mode = NumberingMode::from_options(start_level, parent)?;
        }
        Ok(())
    }

    fn begin(&mut self) {
        self.counters.reset();
        self.labels.borrow_mut().clear();
    }

    fn reset(&mut self) {
        self.begin();
    }
}

/// Split the text following a block marker into the block's extent and the
/// remainder that continues as ordinary text.
fn split_extent(text: Cow<'_, str>) -> (Cow<'_, str>, Option<Cow<'_, str>>) {
    let offset = text.len() - text.trim_start_matches(['\n', '\r']).len();

    let (start, end, resume) = {
        let body = &text[offset..];
        if let Some(inner) = body.strip_prefix(BEGIN) {
            let start = offset + BEGIN.len();
            match inner.find(END) {
                Some(index) => (start, start + index, Some(start + index + END.len())),
                None => (start, text.len(), None),
            }
        } else {
            match body.find("\n\n") {
                Some(index) => (offset, offset + index, Some(offset + index + 2)),
                None => (offset, text.len(), None),
            }
        }
    };

    let rest = resume
        .map(|at| slice(&text, at..text.len()))
        .filter(|rest| !rest.is_empty());
    (slice(&text, start..end), rest)
}

fn slice<'a>(text: &Cow<'a, str>, range: std::ops::Range<usize>) -> Cow<'a, str> {
    match text {
        Cow::Borrowed(s) => Cow::Borrowed(&s[range]),
        Cow::Owned(s) => Cow::Owned(s[range].to_string()),
    }
}

fn header_line(record: &Record) -> String {
    if record.number_list.is_empty() {
        return format!("{} {}", record.prefix, record.title);
    }
    let id = record
        .id
        .as_ref()
        .map(|id| format!(" id=\"{id}\""))
        .unwrap_or_default();
    format!(
        "{} <span class=\"{}\"{id}>{}.</span> {}",
        record.prefix,
        record.class,
        record.number(),
        record.title
    )
}

fn block_html(record: &Record) -> String {
    let id = record
        .id
        .as_ref()
        .map(|id| format!(" id=\"{id}\""))
        .unwrap_or_default();
    format!(
        "<div class=\"weaver-number {class}\"{id}>\n\
         <p class=\"weaver-number-title\"><span class=\"weaver-number-label\">{prefix}{number}</span> {title}</p>\n\
         <div class=\"weaver-number-content\">\n{content}</div>\n\
         </div>",
        class = record.class,
        prefix = record.prefix,
        number = record.number(),
        title = record.title,
        content = record.content.as_deref().unwrap_or_default(),
    )
}

/// Number a whole document on its own.
///
/// Headers inside fenced ranges are left alone. Returns the converted text
/// and the labels it defines.
pub fn convert(source: &str, mode: NumberingMode) -> Result<(String, LabelMap)> {
    let number = Number::new().with_mode(mode);
    let labels = number.labels();
    let mut parser =
        Parser::new("number", vec![Box::new(number)])?.with_escape(ESCAPE_PATTERN)?;
    let output = parser.parse(source)?;
    let labels = labels.borrow().clone();
    Ok((output, labels))
}
